//! Pattern registry: identifier grammars and relation keyword vocabulary
//!
//! The registry is an immutable value built once per run and handed to the
//! scanner and link extractor. Nothing in here is global, so several graphs
//! can be built side by side.

use regex::Regex;

use crate::core::identity::{ArtifactPrefix, NUMBER_WIDTH};
use crate::core::links::RelationType;

/// One relation phrase, matched case-insensitively.
///
/// Spaces inside a phrase also accept hyphens and underscores (`traces-to`,
/// `traces_to`).
#[derive(Debug, Clone, Copy)]
struct Keyword {
    phrase: &'static str,
    relation: RelationType,
    /// The phrase names the relation from the target's side
    /// (`A refines B` is `B --refined_by--> A`)
    reversed: bool,
    /// Only a label: must be followed by a colon or wrapped in bold
    label_only: bool,
}

impl Keyword {
    const fn forward(phrase: &'static str, relation: RelationType) -> Self {
        Self { phrase, relation, reversed: false, label_only: false }
    }

    const fn reversed(phrase: &'static str, relation: RelationType) -> Self {
        Self { phrase, relation, reversed: true, label_only: false }
    }

    const fn label(phrase: &'static str, relation: RelationType) -> Self {
        Self { phrase, relation, reversed: false, label_only: true }
    }
}

// `verifies` keeps the forward relation: test coverage reads verified_by
// edges in both directions.
const RELATION_KEYWORDS: &[Keyword] = &[
    Keyword::forward("traces to", RelationType::TracesTo),
    Keyword::forward("trace to", RelationType::TracesTo),
    Keyword::label("parent", RelationType::TracesTo),
    Keyword::forward("depends on", RelationType::DependsOn),
    Keyword::forward("depend on", RelationType::DependsOn),
    Keyword::forward("verified by", RelationType::VerifiedBy),
    Keyword::forward("verifies", RelationType::VerifiedBy),
    Keyword::forward("validated by", RelationType::VerifiedBy),
    Keyword::forward("implements", RelationType::Implements),
    Keyword::reversed("implemented by", RelationType::Implements),
    Keyword::forward("satisfies", RelationType::Satisfies),
    Keyword::reversed("satisfied by", RelationType::Satisfies),
    Keyword::label("addresses", RelationType::Satisfies),
    Keyword::forward("refined by", RelationType::RefinedBy),
    Keyword::reversed("refines", RelationType::RefinedBy),
];

/// Identifier bodies without word boundaries, shared by every regex below
const CATEGORIZED_BODY: &str = r"(?:StR|REQ-F|REQ-NF|ADR|ARC-C|QA-SC)(?:-[A-Z]{4})?-[0-9]{3}";
const TEST_BODY: &str = r"TEST(?:-[A-Z0-9]+)?-[0-9]{3}";
const LOOSE_TEST_BODY: &str = r"TEST-[A-Z0-9]+(?:-[A-Z0-9]+)*";

/// A relation keyword found in a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordMatch {
    pub relation: RelationType,
    /// Edge runs from the target back to the current artifact
    pub reversed: bool,
    /// Byte offset where the keyword (including markup) starts
    pub start: usize,
    /// Byte offset just past the keyword, markup and colon
    pub end: usize,
}

/// Compiled identifier and keyword patterns
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    exact: Vec<(ArtifactPrefix, Regex)>,
    identifier: Regex,
    identifier_loose: Regex,
    issue_ref: Regex,
    keyword: Regex,
    heading: Regex,
    front_matter: Regex,
}

impl PatternRegistry {
    /// Build the registry with the standard grammar and vocabulary
    pub fn new() -> Self {
        let exact = ArtifactPrefix::all()
            .iter()
            .map(|prefix| (*prefix, compile(&exact_pattern(*prefix))))
            .collect();

        Self {
            exact,
            identifier: compile(&format!(r"\b(?:{CATEGORIZED_BODY}|{TEST_BODY})\b")),
            identifier_loose: compile(&format!(
                r"\b(?:{CATEGORIZED_BODY}|{LOOSE_TEST_BODY})\b"
            )),
            issue_ref: compile(r"(?:^|[^\w&/])#([0-9]+)\b"),
            keyword: compile(&keyword_pattern()),
            heading: compile(r"^\s{0,3}#{1,6}\s+(.*?)(?:\s+#+)?\s*$"),
            front_matter: compile(r"(?s)\A\x{FEFF}?---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)"),
        }
    }

    /// Anchored exact grammar for one artifact type
    pub fn pattern_for(&self, prefix: ArtifactPrefix) -> &Regex {
        // every prefix is compiled in `new`
        &self
            .exact
            .iter()
            .find(|(p, _)| *p == prefix)
            .unwrap_or(&self.exact[0])
            .1
    }

    /// Synonym phrases recognised for a relation
    pub fn relation_keywords_for(&self, relation: RelationType) -> Vec<&'static str> {
        RELATION_KEYWORDS
            .iter()
            .filter(|k| k.relation == relation)
            .map(|k| k.phrase)
            .collect()
    }

    /// Width of the numeric suffix every identifier carries
    pub fn number_width(&self) -> usize {
        NUMBER_WIDTH
    }

    /// True when `s` is a complete identifier of the given type
    pub fn is_valid(&self, prefix: ArtifactPrefix, s: &str) -> bool {
        self.pattern_for(prefix).is_match(s)
    }

    /// Regex for identifiers embedded in text.
    ///
    /// `loose_tests` also accepts `TEST-[A-Z0-9-]+`, used for source files.
    pub fn identifier(&self, loose_tests: bool) -> &Regex {
        if loose_tests {
            &self.identifier_loose
        } else {
            &self.identifier
        }
    }

    /// Identifiers in `text`, in order of appearance, with byte offsets
    pub fn identifiers_in<'t>(&self, text: &'t str, loose_tests: bool) -> Vec<(usize, &'t str)> {
        self.identifier(loose_tests)
            .find_iter(text)
            .map(|m| (m.start(), m.as_str()))
            .collect()
    }

    /// Issue cross references (`#42`) in `text`, returned as `#42`
    pub fn issue_refs_in(&self, text: &str) -> Vec<(usize, String)> {
        self.issue_ref
            .captures_iter(text)
            .filter_map(|caps| {
                caps.get(1)
                    .map(|num| (num.start() - 1, format!("#{}", num.as_str())))
            })
            .collect()
    }

    /// Relation keywords in one line, in order of appearance
    pub fn keywords_in(&self, line: &str) -> Vec<KeywordMatch> {
        self.keyword
            .captures_iter(line)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                // group i + 1 holds phrase i
                let keyword = caps
                    .iter()
                    .skip(1)
                    .position(|group| group.is_some())
                    .and_then(|i| RELATION_KEYWORDS.get(i))?;
                if keyword.label_only && !is_label(whole.as_str()) {
                    return None;
                }
                Some(KeywordMatch {
                    relation: keyword.relation,
                    reversed: keyword.reversed,
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect()
    }

    /// Text of a markdown heading line, without the `#` markers
    pub fn heading_text<'t>(&self, line: &'t str) -> Option<&'t str> {
        self.heading
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Raw front matter block (without the `---` fences) and the number of
    /// lines it occupies including both fences
    pub fn front_matter<'t>(&self, text: &'t str) -> Option<(&'t str, usize)> {
        let caps = self.front_matter.captures(text)?;
        let whole = caps.get(0)?;
        let body = caps.get(1)?;
        let lines = text[..whole.end()].trim_end_matches(['\r', '\n']).lines().count();
        Some((body.as_str(), lines))
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn exact_pattern(prefix: ArtifactPrefix) -> String {
    match prefix {
        ArtifactPrefix::Test => format!("^{TEST_BODY}$"),
        other => format!(
            "^{}(?:-[A-Z]{{4}})?-[0-9]{{{}}}$",
            regex::escape(other.as_str()),
            NUMBER_WIDTH
        ),
    }
}

/// One capture group per phrase, in table order, so a match can be mapped
/// back to its entry
fn keyword_pattern() -> String {
    let groups: Vec<String> = RELATION_KEYWORDS
        .iter()
        .map(|keyword| {
            let phrase = keyword
                .phrase
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"[\s_-]+");
            format!("({})", phrase)
        })
        .collect();

    format!(
        r"(?i)(?:\*\*|__)?\b(?:{})\b(?:\s+requirements?)?\s*:?\s*(?:\*\*|__)?\s*:?",
        groups.join("|")
    )
}

/// A matched keyword used as a label: `Parent:` or `**Parent**`
fn is_label(matched: &str) -> bool {
    if matched.contains(':') {
        return true;
    }
    let text = matched.trim();
    ["**", "__"]
        .iter()
        .any(|m| text.len() > 2 * m.len() && text.starts_with(*m) && text.ends_with(*m))
}

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        // patterns are compile-time constants; a failure here is a programming error
        Err(e) => panic!("invalid built-in pattern {pattern:?}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(registry: &PatternRegistry, text: &str, loose: bool) -> Vec<String> {
        registry
            .identifiers_in(text, loose)
            .into_iter()
            .map(|(_, id)| id.to_string())
            .collect()
    }

    #[test]
    fn test_exact_grammar_per_type() {
        let reg = PatternRegistry::new();
        assert!(reg.is_valid(ArtifactPrefix::ReqF, "REQ-F-001"));
        assert!(reg.is_valid(ArtifactPrefix::ReqF, "REQ-F-AUTH-001"));
        assert!(!reg.is_valid(ArtifactPrefix::ReqF, "REQ-NF-001"));
        assert!(reg.is_valid(ArtifactPrefix::Adr, "ADR-INFR-002"));
        assert!(!reg.is_valid(ArtifactPrefix::Adr, "ADR-INFRA-002"));
        assert!(reg.is_valid(ArtifactPrefix::Test, "TEST-LOGIN2-010"));
        assert!(!reg.is_valid(ArtifactPrefix::Test, "TEST-A-B-010"));
        assert!(!reg.is_valid(ArtifactPrefix::StR, "StR-01"));
    }

    #[test]
    fn test_number_width_is_three() {
        assert_eq!(PatternRegistry::new().number_width(), 3);
    }

    #[test]
    fn test_identifiers_in_text() {
        let reg = PatternRegistry::new();
        let text = "See REQ-F-001, REQ-NF-PERF-002 and ARC-C-010 (not REQ-F-0001 or XADR-001).";
        assert_eq!(ids(&reg, text, false), vec!["REQ-F-001", "REQ-NF-PERF-002", "ARC-C-010"]);
    }

    #[test]
    fn test_loose_test_identifiers() {
        let reg = PatternRegistry::new();
        let text = "// TEST-AUTH-FLOW-001 covers REQ-F-002";
        assert_eq!(ids(&reg, text, false), vec!["REQ-F-002"]);
        assert_eq!(ids(&reg, text, true), vec!["TEST-AUTH-FLOW-001", "REQ-F-002"]);
    }

    #[test]
    fn test_issue_refs() {
        let reg = PatternRegistry::new();
        let refs: Vec<String> = reg
            .issue_refs_in("Traces to: #5, #12 and &#38; or a/#7")
            .into_iter()
            .map(|(_, r)| r)
            .collect();
        assert_eq!(refs, vec!["#5", "#12"]);
    }

    #[test]
    fn test_keywords_tolerate_bold_and_colon() {
        let reg = PatternRegistry::new();
        for line in [
            "**Traces to**: #1",
            "**Traces to:** #1",
            "Traces to: #1",
            "traces-to #1",
            "traces_to: #1",
            "TRACES TO #1",
        ] {
            let found = reg.keywords_in(line);
            assert_eq!(found.len(), 1, "{line}");
            assert_eq!(found[0].relation, RelationType::TracesTo, "{line}");
            assert_eq!(line[found[0].end..].trim(), "#1", "{line}");
        }
    }

    #[test]
    fn test_keywords_multiple_per_line() {
        let reg = PatternRegistry::new();
        let found = reg.keywords_in("Verified by: TEST-001; Depends on: REQ-F-002");
        let relations: Vec<_> = found.iter().map(|k| k.relation).collect();
        assert_eq!(relations, vec![RelationType::VerifiedBy, RelationType::DependsOn]);
    }

    #[test]
    fn test_keyword_requires_word_boundary() {
        let reg = PatternRegistry::new();
        assert!(reg.keywords_in("parentheses REQ-F-001").is_empty());
    }

    #[test]
    fn test_reversed_phrases() {
        let reg = PatternRegistry::new();
        for (line, relation, reversed) in [
            ("Refines: REQ-F-001", RelationType::RefinedBy, true),
            ("Refined by: REQ-F-003", RelationType::RefinedBy, false),
            ("Implemented by: ARC-C-003", RelationType::Implements, true),
            ("Satisfied by: QA-SC-001", RelationType::Satisfies, true),
            ("Verifies: REQ-F-001", RelationType::VerifiedBy, false),
        ] {
            let found = reg.keywords_in(line);
            assert_eq!(found.len(), 1, "{line}");
            assert_eq!((found[0].relation, found[0].reversed), (relation, reversed), "{line}");
        }
    }

    #[test]
    fn test_label_phrases_need_colon_or_bold() {
        let reg = PatternRegistry::new();
        assert!(reg
            .keywords_in("The parent process spawns workers; see ARC-C-002")
            .is_empty());
        assert!(reg.keywords_in("This addresses ADR-001 indirectly").is_empty());
        for line in ["Parent: #12", "**Parent**: #12", "**Parent:** #12", "Addresses: REQ-F-001"] {
            assert_eq!(reg.keywords_in(line).len(), 1, "{line}");
        }
    }

    #[test]
    fn test_canonical_relation_names_are_keywords() {
        let reg = PatternRegistry::new();
        for relation in RelationType::all() {
            let line = format!("{}: X", relation.as_str());
            let found = reg.keywords_in(&line);
            assert_eq!(found.len(), 1, "{line}");
            assert_eq!(found[0].relation, *relation, "{line}");
        }
    }

    #[test]
    fn test_relation_keywords_for() {
        let reg = PatternRegistry::new();
        assert!(reg
            .relation_keywords_for(RelationType::VerifiedBy)
            .contains(&"verified by"));
        for relation in RelationType::all() {
            assert!(!reg.relation_keywords_for(*relation).is_empty());
        }
    }

    #[test]
    fn test_heading_text() {
        let reg = PatternRegistry::new();
        assert_eq!(reg.heading_text("## REQ-F-001: Login"), Some("REQ-F-001: Login"));
        assert_eq!(reg.heading_text("# Title #"), Some("Title"));
        assert_eq!(reg.heading_text("#5 is an issue"), None);
        assert_eq!(reg.heading_text("plain"), None);
    }

    #[test]
    fn test_front_matter_block() {
        let reg = PatternRegistry::new();
        let text = "---\nid: REQ-F-001\ntitle: Login\n---\n# Body\n";
        let (body, lines) = reg.front_matter(text).unwrap();
        assert_eq!(body, "id: REQ-F-001\ntitle: Login");
        assert_eq!(lines, 4);
        assert!(reg.front_matter("# No front matter\n").is_none());

        let (body, _) = reg.front_matter("\u{feff}---\nid: ADR-001\n---\n").unwrap();
        assert_eq!(body, "id: ADR-001");
    }
}
