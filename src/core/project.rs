//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::PROJECT_CONFIG_FILE;

/// Markers that identify a project root, checked in order
const ROOT_MARKERS: &[&str] = &[PROJECT_CONFIG_FILE, ".git"];

/// Represents the tree being traced
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory; every reported path is relative to it
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory.
    ///
    /// The nearest directory holding `.reqtrace.yaml` or `.git` wins; when
    /// neither exists the start directory itself is the root.
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let start = start.canonicalize().map_err(|e| ProjectError::NotFound {
            path: start.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !start.is_dir() {
            return Err(ProjectError::NotADirectory(start));
        }

        let mut current = start.clone();
        loop {
            if ROOT_MARKERS.iter().any(|m| current.join(m).exists()) {
                return Ok(Self { root: current });
            }
            if !current.pop() {
                return Ok(Self { root: start });
            }
        }
    }

    /// Use `root` as is, without walking up
    pub fn at(root: &Path) -> Result<Self, ProjectError> {
        let root = root.canonicalize().map_err(|e| ProjectError::NotFound {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !root.is_dir() {
            return Err(ProjectError::NotADirectory(root));
        }
        Ok(Self { root })
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the project configuration file (may not exist)
    pub fn config_path(&self) -> PathBuf {
        self.root.join(PROJECT_CONFIG_FILE)
    }

    /// Path relative to the root with forward slashes, as reported
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("cannot open {path:?}: {reason}")]
    NotFound { path: PathBuf, reason: String },

    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
