//! Front matter error diagnostics with source spans

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Front matter that could not be parsed as YAML
///
/// Never fatal: the scanner ignores the block and falls back to headings.
/// `reqtrace check` renders these through miette.
#[derive(Debug, Error, Diagnostic)]
#[error("malformed front matter in {origin}: {message}")]
#[diagnostic(
    code(reqtrace::front_matter::syntax),
    severity(Warning),
    url("https://yaml.org/spec/1.2.2/")
)]
pub struct FrontMatterError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// Path or URL of the offending blob
    origin: String,

    /// The underlying parser message
    message: String,
}

impl FrontMatterError {
    /// Create an error from a serde_yml error.
    ///
    /// `line_offset` is the number of document lines preceding the parsed
    /// block (the opening fence).
    pub fn from_serde_error(
        err: &serde_yml::Error,
        document: &str,
        origin: &str,
        line_offset: usize,
    ) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(document, line + line_offset, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(origin, document.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1).min(document.len().max(1))),
            help,
            origin: origin.to_string(),
            message,
        }
    }

    /// Path or URL of the blob the error came from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Parser message without location decoration
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convert 1-based line/column to a byte offset, clamped to the document
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut current_line = 1;
    let mut line_start = 0;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            break;
        }
        if ch == '\n' {
            current_line += 1;
            line_start = i + 1;
        }
    }

    if current_line < line {
        return source.len().saturating_sub(1);
    }

    let line_len = source[line_start..].find('\n').unwrap_or(source.len() - line_start);
    line_start + column.saturating_sub(1).min(line_len)
}

/// Generate helpful suggestions based on error message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("tab") {
        return Some(
            "YAML requires spaces for indentation, not tabs. Replace tabs with spaces.".to_string(),
        );
    }

    if msg_lower.contains("duplicate key") {
        return Some("Each key can only appear once. Remove or rename the duplicate key.".to_string());
    }

    if msg_lower.contains("mapping values are not allowed") {
        return Some("You may be missing a space after ':' or have incorrect indentation.".to_string());
    }

    if msg_lower.contains("did not find expected") || msg_lower.contains("unexpected end") {
        return Some("Check for an unclosed '[' or '{' or a missing quote.".to_string());
    }

    if msg_lower.contains("found unexpected ':'") {
        return Some("Colons in values need to be quoted: \"value:with:colons\"".to_string());
    }

    None
}
