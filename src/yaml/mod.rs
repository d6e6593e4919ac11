//! Front matter parsing for markdown artifacts

pub mod diagnostics;

pub use diagnostics::FrontMatterError;

use serde_yml::Value;

/// Fields of a front matter block the scanner cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub id: Option<String>,
    pub title: Option<String>,
}

/// Parse a front matter block.
///
/// `block` is the text between the `---` fences; `full_text` and `origin`
/// are only used to point diagnostics at the right place in the document.
pub fn parse_front_matter(
    block: &str,
    full_text: &str,
    origin: &str,
) -> Result<FrontMatter, FrontMatterError> {
    let value: Value = serde_yml::from_str(block)
        // +1 line for the opening fence
        .map_err(|e| FrontMatterError::from_serde_error(&e, full_text, origin, 1))?;

    if value.as_mapping().is_none() {
        return Ok(FrontMatter::default());
    }

    Ok(FrontMatter {
        id: value.get("id").and_then(scalar),
        title: value.get("title").and_then(scalar),
    })
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
