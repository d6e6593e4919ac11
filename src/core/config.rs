//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::identity::ArtifactPrefix;
use crate::core::metrics::MetricName;
use crate::core::project::Project;

/// Project configuration file name, looked up at the scan root
pub const PROJECT_CONFIG_FILE: &str = ".reqtrace.yaml";

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Directories walked for `*.md` specification documents
    pub spec_dirs: Vec<String>,

    /// Directories walked for source and test files
    pub source_dirs: Vec<String>,

    /// File extensions (without dot) treated as source files
    pub source_extensions: Vec<String>,

    /// Path fragments; any file whose relative path contains one is skipped
    pub ignore: Vec<String>,

    /// Artifact types counted as requirements by the coverage metrics
    pub requirement_prefixes: Vec<ArtifactPrefix>,

    /// Minimum coverage percentage per metric
    pub min_coverage: BTreeMap<MetricName, f64>,

    /// Treat numbering gaps as errors in `reqtrace check`
    pub strict_gaps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec_dirs: strings(&[
                "01-stakeholder-requirements",
                "02-requirements",
                "03-architecture",
                "04-design",
            ]),
            source_dirs: strings(&["05-implementation", "tests", "test"]),
            source_extensions: strings(&["c", "cc", "cpp", "h", "hpp", "py", "rs"]),
            ignore: strings(&[
                ".github/",
                "-template.md",
                "_template.md",
                "spec-kit-templates/",
                "templates/",
            ]),
            requirement_prefixes: ArtifactPrefix::requirements().to_vec(),
            min_coverage: BTreeMap::new(),
            strict_gaps: false,
        }
    }
}

/// One configuration layer as written on disk; absent keys leave the
/// lower layer untouched
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub spec_dirs: Option<Vec<String>>,
    pub source_dirs: Option<Vec<String>>,
    pub source_extensions: Option<Vec<String>>,
    pub ignore: Option<Vec<String>>,
    pub requirement_prefixes: Option<Vec<ArtifactPrefix>>,
    pub min_coverage: Option<CoverageThreshold>,
    pub strict_gaps: Option<bool>,
}

/// Either one threshold for every metric or a per-metric table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CoverageThreshold {
    All(f64),
    PerMetric(BTreeMap<MetricName, f64>),
}

impl CoverageThreshold {
    fn expand(self) -> BTreeMap<MetricName, f64> {
        match self {
            CoverageThreshold::All(pct) => MetricName::all().iter().map(|m| (*m, pct)).collect(),
            CoverageThreshold::PerMetric(map) => map,
        }
    }

    /// Parse `80` or `requirement=90,requirement_to_test=50`
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if let Ok(pct) = s.parse::<f64>() {
            return Ok(CoverageThreshold::All(pct));
        }
        let mut map = BTreeMap::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, pct) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected <metric>=<percent>, got '{}'", pair))?;
            let name: MetricName = name.trim().parse()?;
            let pct: f64 = pct
                .trim()
                .parse()
                .map_err(|_| format!("invalid percentage '{}' for {}", pct.trim(), name))?;
            map.insert(name, pct);
        }
        Ok(CoverageThreshold::PerMetric(map))
    }
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: &Project) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/reqtrace/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(layer) = read_layer(&global_path) {
                config.merge(layer);
            }
        }

        // 3. Project config (.reqtrace.yaml at the root)
        if let Some(layer) = read_layer(&project.config_path()) {
            config.merge(layer);
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "reqtrace")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another layer into this one (other takes precedence)
    pub fn merge(&mut self, other: ConfigLayer) {
        if let Some(dirs) = other.spec_dirs {
            self.spec_dirs = dirs;
        }
        if let Some(dirs) = other.source_dirs {
            self.source_dirs = dirs;
        }
        if let Some(exts) = other.source_extensions {
            self.source_extensions = exts
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect();
        }
        if let Some(ignore) = other.ignore {
            self.ignore = ignore;
        }
        if let Some(prefixes) = other.requirement_prefixes {
            self.requirement_prefixes = prefixes;
        }
        if let Some(threshold) = other.min_coverage {
            self.min_coverage.extend(threshold.expand());
        }
        if let Some(strict) = other.strict_gaps {
            self.strict_gaps = strict;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(value) = var("REQTRACE_MIN_COVERAGE") {
            match CoverageThreshold::parse(&value) {
                Ok(threshold) => self.min_coverage.extend(threshold.expand()),
                Err(e) => warn!("ignoring REQTRACE_MIN_COVERAGE: {}", e),
            }
        }
        if let Some(value) = var("REQTRACE_STRICT") {
            self.strict_gaps = matches!(
                value.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Apply a command-line threshold on top of the configured ones
    pub fn with_min_coverage(mut self, threshold: Option<CoverageThreshold>) -> Self {
        if let Some(threshold) = threshold {
            self.min_coverage.extend(threshold.expand());
        }
        self
    }

    /// True when a path relative to the root matches an ignore fragment
    pub fn is_ignored(&self, relative: &str) -> bool {
        self.ignore.iter().any(|fragment| relative.contains(fragment.as_str()))
    }

    pub fn is_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.source_extensions
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(ext))
            })
    }
}

fn read_layer(path: &Path) -> Option<ConfigLayer> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %path.display(), "cannot read config: {}", e);
            return None;
        }
    };
    if contents.trim().is_empty() {
        return None;
    }
    match serde_yml::from_str::<ConfigLayer>(&contents) {
        Ok(layer) => {
            debug!(path = %path.display(), "loaded config layer");
            Some(layer)
        }
        Err(e) => {
            warn!(path = %path.display(), "ignoring invalid config: {}", e);
            None
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.requirement_prefixes, vec![ArtifactPrefix::ReqF, ArtifactPrefix::ReqNf]);
        assert!(config.min_coverage.is_empty());
        assert!(config.is_ignored("03-architecture/templates/ADR-template.md"));
        assert!(!config.is_ignored("03-architecture/decisions/ADR-001.md"));
        assert!(config.is_source_extension(Path::new("tests/login_test.CPP")));
        assert!(!config.is_source_extension(Path::new("README")));
    }

    #[test]
    fn test_project_layer_overrides() {
        let layer: ConfigLayer = serde_yml::from_str(
            "spec_dirs: [docs]\nsource_extensions: ['.ts']\nrequirement_prefixes: [REQ-F]\nmin_coverage: 75\n",
        )
        .unwrap();
        let mut config = Config::default();
        config.merge(layer);
        assert_eq!(config.spec_dirs, vec!["docs"]);
        assert_eq!(config.source_extensions, vec!["ts"]);
        assert_eq!(config.requirement_prefixes, vec![ArtifactPrefix::ReqF]);
        assert_eq!(config.min_coverage.len(), 4);
        assert_eq!(config.min_coverage[&MetricName::RequirementToTest], 75.0);
        // untouched keys keep their defaults
        assert_eq!(config.source_dirs, Config::default().source_dirs);
    }

    #[test]
    fn test_per_metric_thresholds() {
        let layer: ConfigLayer =
            serde_yml::from_str("min_coverage:\n  requirement: 90\n  requirement_to_ADR: 50.5\n").unwrap();
        let mut config = Config::default();
        config.merge(layer);
        assert_eq!(config.min_coverage[&MetricName::Requirement], 90.0);
        assert_eq!(config.min_coverage[&MetricName::RequirementToAdr], 50.5);
        assert!(!config.min_coverage.contains_key(&MetricName::RequirementToTest));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(serde_yml::from_str::<ConfigLayer>("spec_dir: [docs]\n").is_err());
    }

    #[test]
    fn test_threshold_parse() {
        assert_eq!(CoverageThreshold::parse("80").unwrap(), CoverageThreshold::All(80.0));
        let CoverageThreshold::PerMetric(map) =
            CoverageThreshold::parse("requirement=90, requirement_to_test=50").unwrap()
        else {
            panic!("expected per-metric thresholds");
        };
        assert_eq!(map[&MetricName::RequirementToTest], 50.0);
        assert!(CoverageThreshold::parse("requirement").is_err());
        assert!(CoverageThreshold::parse("bogus=10").is_err());
    }

    #[test]
    fn test_env_layer() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "REQTRACE_MIN_COVERAGE" => Some("requirement_to_test=60".to_string()),
            "REQTRACE_STRICT" => Some("true".to_string()),
            _ => None,
        });
        assert!(config.strict_gaps);
        assert_eq!(config.min_coverage[&MetricName::RequirementToTest], 60.0);
    }

    #[test]
    fn test_load_reads_project_file() {
        let tmp = tempdir().unwrap();
        std::fs::write(
            tmp.path().join(PROJECT_CONFIG_FILE),
            "spec_dirs: [specs]\nstrict_gaps: true\n",
        )
        .unwrap();
        let project = Project::discover_from(tmp.path()).unwrap();
        let config = Config::load(&project);
        assert_eq!(config.spec_dirs, vec!["specs"]);
    }

    #[test]
    fn test_invalid_project_file_ignored() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join(PROJECT_CONFIG_FILE), "spec_dirs: [unclosed\n").unwrap();
        assert!(read_layer(&tmp.path().join(PROJECT_CONFIG_FILE)).is_none());
    }
}
