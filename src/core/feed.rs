//! Artifact source feed: turns a project tree and issue exports into blobs
//!
//! Files that cannot be read are skipped with a warning; a truncated feed
//! still produces a (smaller) graph.

use miette::Diagnostic;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::core::config::Config;
use crate::core::project::Project;
use crate::core::scanner::{Blob, OriginKind};

/// Errors that stop the feed altogether
#[derive(Debug, Error, Diagnostic)]
pub enum FeedError {
    #[error("cannot read issue export {path:?}: {message}")]
    #[diagnostic(code(reqtrace::feed::issue_export_read))]
    IssueExportRead { path: PathBuf, message: String },

    #[error("invalid issue export {path:?}: {message}")]
    #[diagnostic(
        code(reqtrace::feed::issue_export_parse),
        help("expected a JSON array such as the output of `gh issue list --json number,title,body,url`")
    )]
    IssueExportParse { path: PathBuf, message: String },
}

/// Load every specification and source blob under the project root.
///
/// Blobs are keyed by relative path, so overlapping directories never yield
/// the same file twice. The result is sorted by source.
pub fn load_blobs(project: &Project, config: &Config) -> Vec<Blob> {
    let mut blobs: BTreeMap<String, Blob> = BTreeMap::new();

    for dir in &config.spec_dirs {
        for path in walk(project, config, dir) {
            if !is_markdown(&path) {
                continue;
            }
            if let Some((relative, text)) = read(project, &path) {
                let kind = markdown_kind(&text);
                blobs
                    .entry(relative.clone())
                    .or_insert_with(|| Blob::new(relative, kind, text));
            }
        }
    }

    for dir in &config.source_dirs {
        for path in walk(project, config, dir) {
            if !config.is_source_extension(&path) {
                continue;
            }
            if let Some((relative, text)) = read(project, &path) {
                blobs
                    .entry(relative.clone())
                    .or_insert_with(|| Blob::new(relative, OriginKind::SourceText, text));
            }
        }
    }

    debug!(blobs = blobs.len(), root = %project.root().display(), "loaded project files");
    blobs.into_values().collect()
}

/// Markdown documents opening with `---` carry front matter
pub fn markdown_kind(text: &str) -> OriginKind {
    if text.trim_start_matches('\u{feff}').starts_with("---") {
        OriginKind::MarkdownFrontMatter
    } else {
        OriginKind::MarkdownHeadingBody
    }
}

/// Files below `root/dir`, skipping hidden directories, READMEs and ignored
/// fragments. A missing directory yields nothing.
fn walk<'a>(project: &'a Project, config: &'a Config, dir: &str) -> impl Iterator<Item = PathBuf> + 'a {
    let base = project.root().join(dir);
    if !base.exists() {
        debug!(dir = %base.display(), "skipping missing directory");
    }

    WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_readme(e))
        .map(|e| e.into_path())
        .filter(move |path| !config.is_ignored(&project.relative(path)))
}

fn read(project: &Project, path: &Path) -> Option<(String, String)> {
    match fs::read(path) {
        Ok(bytes) => Some((
            project.relative(path),
            String::from_utf8_lossy(&bytes).into_owned(),
        )),
        Err(e) => {
            warn!(path = %path.display(), "skipping unreadable file: {}", e);
            None
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.'))
}

fn is_readme(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.to_ascii_uppercase().starts_with("README"))
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

/// One issue of an offline export (`gh issue list --json` or the REST API)
#[derive(Debug, Clone, Deserialize)]
pub struct ExportedIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(alias = "url")]
    pub html_url: String,
}

impl ExportedIssue {
    /// The issue as a blob; the title is rendered as the first heading
    pub fn into_blob(self) -> Blob {
        let body = self.body.unwrap_or_default();
        let text = format!("# {}\n\n{}", self.title.trim(), body);
        Blob::new(self.html_url, OriginKind::IssueBody, text)
    }
}

/// Read an issue export: a JSON array of `{number, title, body, html_url}`
pub fn load_issue_export(path: &Path) -> Result<Vec<Blob>, FeedError> {
    let json = fs::read_to_string(path).map_err(|e| FeedError::IssueExportRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_issue_export(&json).map_err(|e| FeedError::IssueExportParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read several issue exports, keeping the first issue seen for each URL
pub fn load_issue_exports(paths: &[PathBuf]) -> Result<Vec<Blob>, FeedError> {
    let mut blobs: BTreeMap<String, Blob> = BTreeMap::new();
    for path in paths {
        for blob in load_issue_export(path)? {
            if blobs.contains_key(&blob.source) {
                warn!(url = %blob.source, path = %path.display(), "ignoring repeated issue");
                continue;
            }
            blobs.insert(blob.source.clone(), blob);
        }
    }
    Ok(blobs.into_values().collect())
}

pub fn parse_issue_export(json: &str) -> Result<Vec<Blob>, serde_json::Error> {
    let issues: Vec<ExportedIssue> = serde_json::from_str(json)?;
    debug!(issues = issues.len(), "parsed issue export");
    Ok(issues.into_iter().map(ExportedIssue::into_blob).collect())
}
