//! Document scanner: identifier occurrences and their classification
//!
//! A blob is scanned in two steps. Definition positions (front matter `id`,
//! identifier headings, TEST ids in source files) are collected up front so
//! that precedence is decided per identifier; references are then produced
//! lazily, one line at a time.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::iter::Enumerate;
use std::str::Lines;
use tracing::{debug, warn};

use crate::core::identity::{ArtifactId, ArtifactPrefix};
use crate::core::patterns::PatternRegistry;
use crate::yaml::{self, FrontMatter, FrontMatterError};

/// Characters stripped between an identifier and the title that follows it
const TITLE_PUNCTUATION: &[char] = &[' ', '\t', '-', ':', ',', '.', '|', '*', '_', '`', '–', '—'];

/// Markup that may precede the first token of a line
const LEADING_MARKUP: &[char] = &['#', '-', '*', '+', '>', '|', '/', '!', '_', '`', '[', '('];

/// Where a blob came from; decides which scanning rules apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginKind {
    /// Markdown document opening with a `---` front matter block
    MarkdownFrontMatter,
    /// Markdown document whose definitions are identifier headings
    MarkdownHeadingBody,
    /// Source or test file; identifiers live in comments
    SourceText,
    /// Issue tracker body (title rendered as the first heading)
    IssueBody,
}

/// Rule switches derived from an [`OriginKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRules {
    /// Honour a front matter `id` field
    pub front_matter: bool,
    /// Treat identifier headings as definitions
    pub headings: bool,
    /// Every TEST identifier is a definition
    pub tests_define: bool,
    /// Accept the loose `TEST-[A-Z0-9-]+` form
    pub loose_tests: bool,
    /// Every `#N` token is a `traces_to` link
    pub issue_links: bool,
}

impl OriginKind {
    /// The single dispatch point deciding which rules a blob is scanned with
    pub fn rules(self) -> ScanRules {
        match self {
            OriginKind::MarkdownFrontMatter | OriginKind::MarkdownHeadingBody => ScanRules {
                front_matter: true,
                headings: true,
                tests_define: false,
                loose_tests: false,
                issue_links: false,
            },
            OriginKind::SourceText => ScanRules {
                front_matter: false,
                headings: false,
                tests_define: true,
                loose_tests: true,
                issue_links: false,
            },
            OriginKind::IssueBody => ScanRules {
                front_matter: true,
                headings: true,
                tests_define: false,
                loose_tests: false,
                issue_links: true,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OriginKind::MarkdownFrontMatter => "markdown-front-matter",
            OriginKind::MarkdownHeadingBody => "markdown-heading-body",
            OriginKind::SourceText => "source-text",
            OriginKind::IssueBody => "issue-body",
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw text blob supplied by the source feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// File path (relative to the scan root) or issue URL
    pub source: String,
    pub kind: OriginKind,
    pub text: String,
}

impl Blob {
    /// A leading UTF-8 byte order mark is dropped from `text`
    pub fn new(source: impl Into<String>, kind: OriginKind, text: impl Into<String>) -> Self {
        let mut text = text.into();
        if text.starts_with('\u{feff}') {
            text.drain(..'\u{feff}'.len_utf8());
        }
        Self {
            source: source.into(),
            kind,
            text,
        }
    }

    /// File stem of the source path, or the last URL segment for issues
    pub fn base_name(&self) -> &str {
        let last = self
            .source
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source);
        match last.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => last,
        }
    }

    /// Issue number when the source is an issue URL (`.../issues/42`)
    pub fn issue_number(&self) -> Option<u64> {
        let (head, number) = self.source.trim_end_matches('/').rsplit_once('/')?;
        if !(head.ends_with("/issues") || head.ends_with("/pull")) {
            return None;
        }
        number.parse().ok()
    }

    /// Truncated SHA-256 of the blob content
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }
}

/// Whether an occurrence establishes an artifact or merely cites it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Definition,
    Reference,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Definition => write!(f, "definition"),
            Classification::Reference => write!(f, "reference"),
        }
    }
}

/// An identifier found in a blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOccurrence {
    pub id: String,
    pub classification: Classification,
    pub title_hint: String,
    /// The full line the identifier was found on
    pub line_context: String,
    /// 1-based line number within the blob
    pub line: usize,
}

impl RawOccurrence {
    pub fn is_definition(&self) -> bool {
        self.classification == Classification::Definition
    }
}

/// Scans blobs for identifier occurrences
#[derive(Debug, Clone, Copy)]
pub struct Scanner<'r> {
    registry: &'r PatternRegistry,
}

impl<'r> Scanner<'r> {
    pub fn new(registry: &'r PatternRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r PatternRegistry {
        self.registry
    }

    /// Scan one blob. Each identifier is reported once per blob, with the
    /// classification of the highest-precedence rule that matched it.
    pub fn scan<'b>(&self, blob: &'b Blob) -> Occurrences<'b>
    where
        'r: 'b,
    {
        self.scan_from(blob, self.definitions(blob))
    }

    /// [`Self::scan`] seeded with definitions the caller already computed
    /// with [`Self::definitions`]
    pub fn scan_from<'b>(&self, blob: &'b Blob, definitions: Vec<RawOccurrence>) -> Occurrences<'b>
    where
        'r: 'b,
    {
        let rules = blob.kind.rules();
        let seen = definitions.iter().map(|d| d.id.clone()).collect();

        Occurrences {
            registry: self.registry,
            blob,
            rules,
            definitions: definitions.into_iter(),
            seen,
            lines: blob.text.lines().enumerate(),
            pending: VecDeque::new(),
        }
    }

    /// Definition occurrences of a blob, in precedence order
    /// (front matter, headings, source-level tests)
    pub fn definitions(&self, blob: &Blob) -> Vec<RawOccurrence> {
        let rules = blob.kind.rules();
        let mut found: Vec<RawOccurrence> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut body_start = 0;
        if rules.front_matter {
            match self.front_matter(blob) {
                Ok(Some((fm, lines))) => {
                    body_start = lines;
                    if let Some(def) = self.front_matter_definition(blob, &fm) {
                        seen.insert(def.id.clone());
                        found.push(def);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(source = %blob.source, "ignoring malformed front matter: {}", err);
                    if let Some((_, lines)) = self.registry.front_matter(&blob.text) {
                        body_start = lines;
                    }
                }
            }
        }

        if rules.headings {
            let mut in_fence = false;
            for (idx, line) in blob.text.lines().enumerate().skip(body_start) {
                if is_fence(line) {
                    in_fence = !in_fence;
                    continue;
                }
                if in_fence {
                    continue;
                }
                let Some(text) = self.registry.heading_text(line) else {
                    continue;
                };
                let text = text.trim_start_matches(['*', '_', '`']);
                let Some(&(0, id)) = self.registry.identifiers_in(text, false).first() else {
                    continue;
                };
                if !seen.insert(id.to_string()) {
                    continue;
                }
                found.push(RawOccurrence {
                    id: id.to_string(),
                    classification: Classification::Definition,
                    title_hint: title_after(text, id).unwrap_or_else(|| blob.base_name().to_string()),
                    line_context: line.to_string(),
                    line: idx + 1,
                });
            }
        }

        if rules.tests_define {
            for (idx, line) in blob.text.lines().enumerate() {
                for (_, id) in self.registry.identifiers_in(line, rules.loose_tests) {
                    if !id.starts_with(ArtifactPrefix::Test.as_str()) || !seen.insert(id.to_string()) {
                        continue;
                    }
                    found.push(RawOccurrence {
                        id: id.to_string(),
                        classification: Classification::Definition,
                        title_hint: blob.base_name().to_string(),
                        line_context: line.to_string(),
                        line: idx + 1,
                    });
                }
            }
        }

        debug!(source = %blob.source, kind = %blob.kind, definitions = found.len(), "scanned definitions");
        found
    }

    /// Parse the blob's front matter block, if it has one.
    ///
    /// Returns the parsed fields together with the number of lines the
    /// block occupies.
    pub fn front_matter(&self, blob: &Blob) -> Result<Option<(FrontMatter, usize)>, FrontMatterError> {
        let Some((block, lines)) = self.registry.front_matter(&blob.text) else {
            return Ok(None);
        };
        let fm = yaml::parse_front_matter(block, &blob.text, &blob.source)?;
        Ok(Some((fm, lines)))
    }

    fn front_matter_definition(&self, blob: &Blob, fm: &FrontMatter) -> Option<RawOccurrence> {
        let id = fm.id.as_deref()?.trim();
        if let Err(err) = ArtifactId::parse(id) {
            warn!(source = %blob.source, "front matter id not recognised: {}", err);
            return None;
        }

        // the `id:` line, counting the opening fence as line 1
        let line = blob
            .text
            .lines()
            .position(|l| l.trim_start().starts_with("id:"))
            .map_or(1, |idx| idx + 1);

        Some(RawOccurrence {
            id: id.to_string(),
            classification: Classification::Definition,
            title_hint: fm
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| blob.base_name().to_string()),
            line_context: format!("id: {}", id),
            line,
        })
    }
}

/// Lazy, single-pass sequence of occurrences for one blob
#[derive(Debug)]
pub struct Occurrences<'b> {
    registry: &'b PatternRegistry,
    blob: &'b Blob,
    rules: ScanRules,
    definitions: std::vec::IntoIter<RawOccurrence>,
    seen: HashSet<String>,
    lines: Enumerate<Lines<'b>>,
    pending: VecDeque<RawOccurrence>,
}

impl Iterator for Occurrences<'_> {
    type Item = RawOccurrence;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(def) = self.definitions.next() {
            return Some(def);
        }

        loop {
            if let Some(occurrence) = self.pending.pop_front() {
                return Some(occurrence);
            }

            let (idx, line) = self.lines.next()?;
            let first_token = line.trim_start_matches(|c: char| c.is_whitespace() || LEADING_MARKUP.contains(&c));
            let first_offset = line.len() - first_token.len();

            for (offset, id) in self.registry.identifiers_in(line, self.rules.loose_tests) {
                if !self.seen.insert(id.to_string()) {
                    continue;
                }
                let title_hint = if offset == first_offset {
                    title_after(first_token, id)
                } else {
                    None
                };
                self.pending.push_back(RawOccurrence {
                    id: id.to_string(),
                    classification: Classification::Reference,
                    title_hint: title_hint.unwrap_or_else(|| self.blob.base_name().to_string()),
                    line_context: line.to_string(),
                    line: idx + 1,
                });
            }
        }
    }
}

/// Remainder of `text` after a leading identifier, stripped of punctuation
fn title_after(text: &str, id: &str) -> Option<String> {
    let rest = text.strip_prefix(id)?;
    let title = rest
        .trim_start_matches(TITLE_PUNCTUATION)
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '|' | '*' | '_' | '`'));
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}
