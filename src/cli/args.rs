//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    build::BuildArgs, check::CheckArgs, completions::CompletionsArgs, coverage::CoverageArgs,
    links::LinksArgs, orphans::OrphansArgs,
};

#[derive(Parser)]
#[command(name = "reqtrace")]
#[command(author, version, about = "Requirements traceability graph builder")]
#[command(long_about = "Recovers traceability links between stakeholder needs, requirements, architecture decisions, quality scenarios and tests scattered across markdown, issues and source comments, then reports coverage and anomalies.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output (errors only)
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: nearest directory with .reqtrace.yaml or .git)
    #[arg(long, global = true, alias = "project")]
    pub root: Option<PathBuf>,
}

/// Where blobs come from, shared by every graph command
#[derive(clap::Args, Clone, Debug, Default)]
pub struct SourceArgs {
    /// Offline issue export (JSON array of {number, title, body, html_url})
    #[arg(long, value_name = "FILE")]
    pub issues: Vec<PathBuf>,

    /// Specification directory to scan (replaces the configured list)
    #[arg(long = "spec-dir", value_name = "DIR")]
    pub spec_dirs: Vec<String>,

    /// Source directory to scan (replaces the configured list)
    #[arg(long = "source-dir", value_name = "DIR")]
    pub source_dirs: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the traceability graph and write the full report
    Build(BuildArgs),

    /// Check for duplicate definitions, numbering gaps and malformed files
    Check(CheckArgs),

    /// List artifacts without outgoing links
    Orphans(OrphansArgs),

    /// Show requirement coverage metrics
    Coverage(CoverageArgs),

    /// Show links of one artifact, or every link
    Links(LinksArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Styled terminal output
    #[default]
    Auto,
    /// JSON format (for programming)
    Json,
    /// Markdown tables
    Md,
    /// CSV format (for spreadsheets)
    Csv,
    /// Just IDs, one per line
    Id,
}
