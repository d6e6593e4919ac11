//! `reqtrace orphans` command - Artifacts that trace to nothing

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::args::SourceArgs;
use crate::cli::commands::utils::load_workspace;
use crate::cli::helpers::{plural, truncate_str};
use crate::cli::report::{orphans_csv, orphans_table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::ArtifactPrefix;
use crate::core::metrics::{find_orphans, Orphan};

#[derive(clap::Args, Debug)]
pub struct OrphansArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Only show one artifact type (REQ-F, ADR, TEST, ...)
    #[arg(long = "type", short = 't')]
    pub artifact_type: Option<ArtifactPrefix>,
}

pub fn run(args: OrphansArgs, global: &GlobalOpts) -> Result<()> {
    let ws = load_workspace(&args.sources, global)?;

    let orphans: Vec<Orphan> = find_orphans(&ws.graph)
        .into_iter()
        .filter(|o| args.artifact_type.map_or(true, |t| o.prefix == t))
        .collect();

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&orphans).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Id => {
            for orphan in &orphans {
                println!("{}", orphan.id);
            }
        }
        OutputFormat::Csv => {
            print!("{}", orphans_csv(&orphans).into_diagnostic()?);
        }
        OutputFormat::Md => {
            println!("{}", orphans_table(&orphans));
        }
        OutputFormat::Auto => {
            let type_label = args
                .artifact_type
                .map(|t| format!("{} ", t))
                .unwrap_or_default();
            println!("{}", style(format!("Orphaned {}Artifacts", type_label)).bold());
            println!("{}", style("─".repeat(60)).dim());

            for orphan in &orphans {
                println!(
                    "{} {} - {} ({})",
                    style("○").yellow(),
                    style(&orphan.id).cyan(),
                    truncate_str(&orphan.title, 40),
                    style(&orphan.source).dim()
                );
            }

            println!();
            if orphans.is_empty() {
                println!("{} No orphaned artifacts found!", style("✓").green().bold());
            } else {
                println!(
                    "Found {} orphaned {}",
                    style(orphans.len()).yellow(),
                    plural(orphans.len(), "artifact", "artifacts")
                );
            }
        }
    }

    Ok(())
}
