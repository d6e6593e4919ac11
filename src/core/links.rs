//! Relation types and link extraction
//!
//! Links are read from relation keywords (`**Traces to**: StR-001`) in
//! markdown and source text. Issue bodies additionally turn every `#N`
//! cross reference into a `traces_to` link, since the tracker already
//! curates those.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::core::patterns::PatternRegistry;
use crate::core::scanner::{Blob, RawOccurrence, ScanRules, Scanner};

/// Typed relation between two identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    TracesTo,
    DependsOn,
    VerifiedBy,
    Implements,
    Satisfies,
    RefinedBy,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::TracesTo => "traces_to",
            RelationType::DependsOn => "depends_on",
            RelationType::VerifiedBy => "verified_by",
            RelationType::Implements => "implements",
            RelationType::Satisfies => "satisfies",
            RelationType::RefinedBy => "refined_by",
        }
    }

    pub fn all() -> &'static [RelationType] {
        &[
            RelationType::TracesTo,
            RelationType::DependsOn,
            RelationType::VerifiedBy,
            RelationType::Implements,
            RelationType::Satisfies,
            RelationType::RefinedBy,
        ]
    }

    /// How the relation reads from the target's side.
    ///
    /// When A `verified_by` B, B `verifies` A.
    pub fn reverse_label(&self) -> &'static str {
        match self {
            RelationType::TracesTo => "traced_from",
            RelationType::DependsOn => "required_by",
            RelationType::VerifiedBy => "verifies",
            RelationType::Implements => "implemented_by",
            RelationType::Satisfies => "satisfied_by",
            RelationType::RefinedBy => "refines",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::all()
            .iter()
            .find(|r| r.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("Unknown relation: {}", s))
    }
}

/// A directed, typed link. `to` may name an identifier that is never defined.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub relation: RelationType,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, relation: RelationType, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            relation,
            to: to.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.from, self.relation, self.to)
    }
}

/// Extracts typed links from blobs
#[derive(Debug, Clone, Copy)]
pub struct LinkExtractor<'r> {
    registry: &'r PatternRegistry,
    scanner: Scanner<'r>,
}

impl<'r> LinkExtractor<'r> {
    pub fn new(registry: &'r PatternRegistry) -> Self {
        Self {
            registry,
            scanner: Scanner::new(registry),
        }
    }

    /// Extract the links of one blob, deduplicated, in order of appearance.
    ///
    /// The source of each link is the nearest definition above it, or the
    /// blob's only definition. Links with no attributable source are dropped.
    pub fn extract_links(&self, blob: &Blob) -> Vec<Edge> {
        let definitions = self.scanner.definitions(blob);
        self.extract_links_from(blob, &definitions)
    }

    /// [`Self::extract_links`] over definitions the caller already scanned
    pub fn extract_links_from(&self, blob: &Blob, definitions: &[RawOccurrence]) -> Vec<Edge> {
        let rules = blob.kind.rules();
        let mut definitions = definitions.to_vec();
        definitions.sort_by_key(|d| d.line);
        let sources = SourceResolver { definitions: &definitions };

        let mut edges: IndexSet<Edge> = IndexSet::new();
        let mut unattributed = 0usize;
        let mut open_list: Option<(RelationType, bool)> = None;

        for (idx, line) in blob.text.lines().enumerate() {
            let line_no = idx + 1;
            // (relation, reversed, target)
            let mut found: Vec<(RelationType, bool, String)> = Vec::new();

            let keywords = self.registry.keywords_in(line);
            if !keywords.is_empty() {
                open_list = None;
                for (i, kw) in keywords.iter().enumerate() {
                    let end = keywords.get(i + 1).map_or(line.len(), |next| next.start);
                    let segment = &line[kw.end..end];
                    let targets = self.targets(segment, rules);
                    if targets.is_empty() && i + 1 == keywords.len() && opens_list(segment) {
                        open_list = Some((kw.relation, kw.reversed));
                    }
                    found.extend(targets.into_iter().map(|t| (kw.relation, kw.reversed, t)));
                }
            } else if let Some((relation, reversed)) = open_list {
                if is_bullet(line) {
                    found.extend(
                        self.targets(line, rules)
                            .into_iter()
                            .map(|t| (relation, reversed, t)),
                    );
                } else if !line.trim().is_empty() {
                    open_list = None;
                }
            }

            if rules.issue_links {
                found.extend(
                    self.registry
                        .issue_refs_in(line)
                        .into_iter()
                        .map(|(_, r)| (RelationType::TracesTo, false, r)),
                );
            }

            if found.is_empty() {
                continue;
            }
            let Some(from) = sources.source_for(line_no) else {
                unattributed += found.len();
                continue;
            };
            for (relation, reversed, to) in found {
                if to == from {
                    continue;
                }
                let edge = if reversed {
                    Edge::new(to, relation, from)
                } else {
                    Edge::new(from, relation, to)
                };
                edges.insert(edge);
            }
        }

        if unattributed > 0 {
            warn!(
                source = %blob.source,
                dropped = unattributed,
                "links without a preceding definition were dropped"
            );
        }
        debug!(source = %blob.source, edges = edges.len(), "extracted links");
        edges.into_iter().collect()
    }

    /// Link targets in a keyword segment, in order of appearance.
    ///
    /// Issue blobs take `#N` targets from the keyword-free rule instead.
    fn targets(&self, segment: &str, rules: ScanRules) -> Vec<String> {
        let mut targets: Vec<(usize, String)> = self
            .registry
            .identifiers_in(segment, rules.loose_tests)
            .into_iter()
            .map(|(offset, id)| (offset, id.to_string()))
            .collect();
        if !rules.issue_links {
            targets.extend(self.registry.issue_refs_in(segment));
        }
        targets.sort_by_key(|(offset, _)| *offset);
        targets.into_iter().map(|(_, t)| t).collect()
    }
}

/// Picks the source identifier for a link on a given line
struct SourceResolver<'a> {
    definitions: &'a [RawOccurrence],
}

impl<'a> SourceResolver<'a> {
    fn source_for(&self, line: usize) -> Option<&'a str> {
        if let [only] = self.definitions {
            return Some(only.id.as_str());
        }
        self.definitions
            .iter()
            .take_while(|d| d.line <= line)
            .last()
            .map(|d| d.id.as_str())
    }
}

/// A keyword followed only by punctuation starts a bullet list of targets
fn opens_list(segment: &str) -> bool {
    segment
        .trim()
        .chars()
        .all(|c| matches!(c, ':' | '*' | '_'))
}

fn is_bullet(line: &str) -> bool {
    let trimmed = line.trim_start();
    ["- ", "* ", "+ "].iter().any(|b| trimmed.starts_with(b))
}
