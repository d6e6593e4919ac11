//! Shared utilities for CLI commands

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::cli::args::SourceArgs;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::feed::{load_blobs, load_issue_exports};
use crate::core::graph::{build_graph, Graph};
use crate::core::patterns::PatternRegistry;
use crate::core::project::Project;
use crate::core::scanner::Blob;

/// A loaded project: configuration, raw blobs and the assembled graph
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub registry: PatternRegistry,
    pub blobs: Vec<Blob>,
    pub graph: Graph,
}

/// Resolve the project, load configuration and blobs, build the graph
pub fn load_workspace(sources: &SourceArgs, global: &GlobalOpts) -> Result<Workspace> {
    let project = match &global.root {
        Some(root) => Project::at(root),
        None => Project::discover(),
    }
    .map_err(|e| miette::miette!("{}", e))?;

    let mut config = Config::load(&project);
    if !sources.spec_dirs.is_empty() {
        config.spec_dirs = sources.spec_dirs.clone();
    }
    if !sources.source_dirs.is_empty() {
        config.source_dirs = sources.source_dirs.clone();
    }

    let mut blobs = load_blobs(&project, &config);
    blobs.extend(load_issue_exports(&sources.issues)?);

    let registry = PatternRegistry::new();
    let graph = build_graph(&registry, &blobs);

    if !global.quiet && global.format == OutputFormat::Auto {
        eprintln!(
            "{} Scanned {} source(s) under {}: {} artifact(s), {} link(s)",
            style("→").blue(),
            style(graph.source_count()).cyan(),
            style(project.root().display()).dim(),
            style(graph.definitions().count()).cyan(),
            style(graph.edges().len()).cyan(),
        );
    }

    Ok(Workspace {
        project,
        config,
        registry,
        blobs,
        graph,
    })
}

/// Write to a file, or stdout when no path is given
pub fn write_output(content: &str, output_path: Option<PathBuf>, global: &GlobalOpts) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            if !global.quiet {
                eprintln!(
                    "{} Report written to {}",
                    style("✓").green(),
                    style(path.display()).cyan()
                );
            }
        }
        None => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
