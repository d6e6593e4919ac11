//! Artifact identity: type prefixes and structured identifiers
//!
//! Identifiers follow `<Prefix>[-<Category>]-<NNN>`, e.g. `REQ-F-001` or
//! `ADR-INFR-002`. Tests use `TEST[-<Suffix>]-<NNN>` and, inside source files,
//! the looser `TEST-[A-Z0-9-]+`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of the numeric suffix of every identifier
pub const NUMBER_WIDTH: usize = 3;

/// Width of the optional category segment
pub const CATEGORY_WIDTH: usize = 4;

/// Artifact type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArtifactPrefix {
    /// Stakeholder requirement (root of the trace)
    #[serde(rename = "StR")]
    StR,
    /// Functional requirement
    #[serde(rename = "REQ-F")]
    ReqF,
    /// Non-functional requirement
    #[serde(rename = "REQ-NF")]
    ReqNf,
    /// Architecture decision record
    #[serde(rename = "ADR")]
    Adr,
    /// Architecture component
    #[serde(rename = "ARC-C")]
    ArcC,
    /// Quality attribute scenario
    #[serde(rename = "QA-SC")]
    QaSc,
    /// Test case
    #[serde(rename = "TEST")]
    Test,
}

impl ArtifactPrefix {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactPrefix::StR => "StR",
            ArtifactPrefix::ReqF => "REQ-F",
            ArtifactPrefix::ReqNf => "REQ-NF",
            ArtifactPrefix::Adr => "ADR",
            ArtifactPrefix::ArcC => "ARC-C",
            ArtifactPrefix::QaSc => "QA-SC",
            ArtifactPrefix::Test => "TEST",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [ArtifactPrefix] {
        &[
            ArtifactPrefix::StR,
            ArtifactPrefix::ReqF,
            ArtifactPrefix::ReqNf,
            ArtifactPrefix::Adr,
            ArtifactPrefix::ArcC,
            ArtifactPrefix::QaSc,
            ArtifactPrefix::Test,
        ]
    }

    /// Requirement types counted by the coverage metrics by default
    pub fn requirements() -> &'static [ArtifactPrefix] {
        &[ArtifactPrefix::ReqF, ArtifactPrefix::ReqNf]
    }

    /// Stakeholder requirements are trace roots and never orphans
    pub fn is_root(&self) -> bool {
        matches!(self, ArtifactPrefix::StR)
    }

    /// Architecture artifacts (decisions and components)
    pub fn is_architecture(&self) -> bool {
        matches!(self, ArtifactPrefix::Adr | ArtifactPrefix::ArcC)
    }

    /// Human-readable plural label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactPrefix::StR => "stakeholder requirements",
            ArtifactPrefix::ReqF => "functional requirements",
            ArtifactPrefix::ReqNf => "non-functional requirements",
            ArtifactPrefix::Adr => "architecture decisions",
            ArtifactPrefix::ArcC => "architecture components",
            ArtifactPrefix::QaSc => "quality scenarios",
            ArtifactPrefix::Test => "test cases",
        }
    }

    /// Split a leading prefix off an identifier string.
    ///
    /// Longer prefixes are tried first so `REQ-NF` never matches as `REQ-F`.
    fn split(s: &str) -> Option<(ArtifactPrefix, &str)> {
        const ORDER: [ArtifactPrefix; 7] = [
            ArtifactPrefix::ReqNf,
            ArtifactPrefix::ReqF,
            ArtifactPrefix::ArcC,
            ArtifactPrefix::QaSc,
            ArtifactPrefix::Test,
            ArtifactPrefix::Adr,
            ArtifactPrefix::StR,
        ];
        ORDER
            .iter()
            .find_map(|p| s.strip_prefix(p.as_str()).map(|rest| (*p, rest)))
    }
}

impl fmt::Display for ArtifactPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArtifactPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| IdParseError::InvalidPrefix(s.to_string()))
    }
}

/// A parsed artifact identifier
///
/// The original spelling is kept verbatim; graph maps are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactId {
    raw: String,
    prefix: ArtifactPrefix,
    category: Option<String>,
    number: Option<u16>,
}

impl ArtifactId {
    /// Parse an identifier from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }

    /// Get the artifact prefix
    pub fn prefix(&self) -> ArtifactPrefix {
        self.prefix
    }

    /// Category (or TEST suffix), if any
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Numeric suffix; `None` only for loose TEST identifiers
    pub fn number(&self) -> Option<u16> {
        self.number
    }

    /// The identifier exactly as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the identifier matches the strict grammar
    /// (`TEST-A-B-001` and `TEST-LOGIN` are accepted, but only as loose forms)
    pub fn is_canonical(&self) -> bool {
        self.number.is_some()
            && self
                .category
                .as_deref()
                .map_or(true, |c| !c.contains('-'))
    }

    /// Numbering series this identifier belongs to, e.g. `REQ-F` or `ADR-INFR`
    pub fn series(&self) -> String {
        match &self.category {
            Some(category) => format!("{}-{}", self.prefix, category),
            None => self.prefix.to_string(),
        }
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ArtifactId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, rest) =
            ArtifactPrefix::split(s).ok_or_else(|| IdParseError::InvalidPrefix(s.to_string()))?;
        let rest = rest
            .strip_prefix('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let (category, number) = if prefix == ArtifactPrefix::Test {
            parse_test_tail(s, rest)?
        } else {
            parse_tail(s, rest)?
        };

        Ok(Self {
            raw: s.to_string(),
            prefix,
            category,
            number,
        })
    }
}

impl Serialize for ArtifactId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ArtifactId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `CCCC-NNN` or `NNN`
fn parse_tail(full: &str, rest: &str) -> Result<(Option<String>, Option<u16>), IdParseError> {
    let (category, digits) = match rest.split_once('-') {
        Some((category, digits)) => {
            let valid = category.len() == CATEGORY_WIDTH
                && category.chars().all(|c| c.is_ascii_uppercase());
            if !valid {
                return Err(IdParseError::InvalidCategory(full.to_string()));
            }
            (Some(category.to_string()), digits)
        }
        None => (None, rest),
    };
    Ok((category, Some(parse_number(full, digits)?)))
}

/// `NNN`, `SUFFIX-NNN`, or any loose `[A-Z0-9-]+` tail
fn parse_test_tail(full: &str, rest: &str) -> Result<(Option<String>, Option<u16>), IdParseError> {
    let valid_segments = !rest.is_empty()
        && rest.split('-').all(|seg| {
            !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        });
    if !valid_segments {
        return Err(IdParseError::InvalidSuffix(full.to_string()));
    }

    if is_number(rest) {
        return Ok((None, Some(parse_number(full, rest)?)));
    }
    match rest.rsplit_once('-') {
        Some((suffix, digits)) if is_number(digits) => {
            Ok((Some(suffix.to_string()), Some(parse_number(full, digits)?)))
        }
        _ => Ok((Some(rest.to_string()), None)),
    }
}

fn is_number(s: &str) -> bool {
    s.len() == NUMBER_WIDTH && s.chars().all(|c| c.is_ascii_digit())
}

fn parse_number(full: &str, digits: &str) -> Result<u16, IdParseError> {
    if !is_number(digits) {
        return Err(IdParseError::InvalidNumber(full.to_string()));
    }
    digits
        .parse()
        .map_err(|_| IdParseError::InvalidNumber(full.to_string()))
}

/// True for issue cross references such as `#42`
pub fn is_issue_ref(s: &str) -> bool {
    s.strip_prefix('#')
        .map_or(false, |n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Errors that can occur when parsing artifact identifiers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("invalid artifact prefix in '{0}' (valid: StR, REQ-F, REQ-NF, ADR, ARC-C, QA-SC, TEST)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter after prefix in '{0}'")]
    MissingDelimiter(String),

    #[error("category in '{0}' must be exactly four uppercase letters")]
    InvalidCategory(String),

    #[error("number in '{0}' must be exactly three digits")]
    InvalidNumber(String),

    #[error("invalid test suffix in '{0}'")]
    InvalidSuffix(String),
}
