//! `reqtrace build` command - Full traceability report

use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::args::SourceArgs;
use crate::cli::commands::utils::{load_workspace, write_output};
use crate::cli::report::{edges_csv, markdown_report, Analysis, TraceabilityReport};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: BuildArgs, global: &GlobalOpts) -> Result<()> {
    let ws = load_workspace(&args.sources, global)?;
    let analysis = Analysis::new(&ws.graph, &ws.config);

    let content = match global.format {
        OutputFormat::Json => {
            let report = TraceabilityReport::new(&ws.graph, &analysis);
            serde_json::to_string_pretty(&report).into_diagnostic()?
        }
        OutputFormat::Csv => edges_csv(ws.graph.edges()).into_diagnostic()?,
        OutputFormat::Id => ws
            .graph
            .artifacts()
            .map(|a| a.id.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Auto | OutputFormat::Md => markdown_report(&ws.graph, &analysis),
    };

    write_output(&content, args.output, global)
}
