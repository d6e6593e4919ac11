//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::{style, StyledObject};

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Color a coverage percentage: green at 100%, yellow at or above the
/// threshold (80% when none is set), red below it
pub fn style_percentage(pct: f64, threshold: Option<f64>) -> StyledObject<String> {
    let text = format!("{:.2}%", pct);
    if pct >= 100.0 {
        style(text).green().bold()
    } else if pct >= threshold.unwrap_or(80.0) {
        style(text).yellow()
    } else {
        style(text).red()
    }
}

/// Singular or plural noun for a count
pub fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}
