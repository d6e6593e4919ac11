//! Core module - identifiers, scanning, graph assembly and metrics

pub mod config;
pub mod feed;
pub mod graph;
pub mod identity;
pub mod links;
pub mod metrics;
pub mod patterns;
pub mod project;
pub mod scanner;

pub use config::{Config, CoverageThreshold};
pub use feed::{load_blobs, load_issue_export, FeedError};
pub use graph::{build_graph, Artifact, Graph};
pub use identity::{ArtifactId, ArtifactPrefix, IdParseError};
pub use links::{Edge, LinkExtractor, RelationType};
pub use metrics::{compute_metrics, CoverageMetric, MetricName};
pub use patterns::PatternRegistry;
pub use project::{Project, ProjectError};
pub use scanner::{Blob, OriginKind, Scanner};
