//! `reqtrace check` command - Compliance anomalies
//!
//! Duplicate definitions always fail the check. Numbering gaps fail it only
//! in strict mode.

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::cli::args::SourceArgs;
use crate::cli::commands::utils::load_workspace;
use crate::cli::helpers::plural;
use crate::cli::report::{dangling_table, duplicates_table, format_numbers, gaps_table, Analysis};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::graph::DuplicateDefinition;
use crate::core::metrics::Dangling;
use crate::core::scanner::Scanner;
use crate::yaml::FrontMatterError;

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Treat numbering gaps as errors
    #[arg(long)]
    pub strict: bool,
}

#[derive(Serialize)]
struct MalformedFile<'a> {
    origin: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    passed: bool,
    strict: bool,
    duplicates: &'a BTreeMap<String, DuplicateDefinition>,
    gaps: BTreeMap<String, Vec<u16>>,
    malformed: Vec<MalformedFile<'a>>,
    dangling: &'a [Dangling],
}

pub fn run(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let ws = load_workspace(&args.sources, global)?;
    let analysis = Analysis::new(&ws.graph, &ws.config);
    let strict = args.strict || ws.config.strict_gaps;

    let scanner = Scanner::new(&ws.registry);
    let malformed: Vec<FrontMatterError> = ws
        .blobs
        .iter()
        .filter(|b| b.kind.rules().front_matter)
        .filter_map(|b| scanner.front_matter(b).err())
        .collect();

    let duplicates = ws.graph.duplicates();
    let gaps = analysis.gaps();
    let gap_count: usize = gaps.values().map(Vec::len).sum();
    let passed = duplicates.is_empty() && (!strict || gaps.is_empty());

    match global.format {
        OutputFormat::Json => {
            let report = CheckReport {
                passed,
                strict,
                duplicates,
                gaps,
                malformed: malformed
                    .iter()
                    .map(|e| MalformedFile {
                        origin: e.origin(),
                        message: e.message(),
                    })
                    .collect(),
                dangling: &analysis.dangling,
            };
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Id | OutputFormat::Csv => {
            for id in duplicates.keys() {
                println!("{}", id);
            }
        }
        OutputFormat::Md => {
            println!("# Traceability Check\n");
            println!("## Duplicate Definitions\n");
            println!("{}\n", duplicates_table(&ws.graph));
            println!("## Numbering Gaps\n");
            println!("{}\n", gaps_table(&analysis.series));
            if !analysis.dangling.is_empty() {
                println!("## Undefined References\n");
                println!("{}\n", dangling_table(&analysis.dangling));
            }
        }
        OutputFormat::Auto => {
            for err in malformed {
                eprintln!("{:?}", miette::Report::new(err));
            }

            println!("{}", style("Duplicate Definitions").bold());
            println!("{}", style("─".repeat(60)).dim());
            if duplicates.is_empty() {
                println!("{} No duplicate definitions", style("✓").green().bold());
            }
            for (id, claims) in duplicates {
                println!(
                    "{} {} defined {} times: {}",
                    style("✗").red(),
                    style(id).cyan(),
                    claims.count,
                    claims.sources.join(", ")
                );
            }

            println!();
            println!("{}", style("Numbering Gaps").bold());
            println!("{}", style("─".repeat(60)).dim());
            if gaps.is_empty() {
                println!("{} No numbering gaps", style("✓").green().bold());
            }
            for (series, missing) in &gaps {
                let marker = if strict { style("✗").red() } else { style("○").yellow() };
                println!("{} {} missing {}", marker, style(series).cyan(), format_numbers(missing));
            }

            if !analysis.dangling.is_empty() && global.verbose {
                println!();
                println!("{}", style("Undefined References").bold());
                println!("{}", style("─".repeat(60)).dim());
                for d in &analysis.dangling {
                    println!("{} {} ({})", style("?").dim(), d.id, d.sources.join(", "));
                }
            }

            println!();
            if passed {
                println!("{} Traceability check passed", style("✓").green().bold());
            } else if !strict && !gaps.is_empty() {
                println!(
                    "Run with {} to treat gaps as errors",
                    style("reqtrace check --strict").yellow()
                );
            }
        }
    }

    if passed {
        return Ok(());
    }

    let mut problems = Vec::new();
    if !duplicates.is_empty() {
        problems.push(format!(
            "{} duplicate {}",
            duplicates.len(),
            plural(duplicates.len(), "definition", "definitions")
        ));
    }
    if strict && gap_count > 0 {
        problems.push(format!("{} numbering {}", gap_count, plural(gap_count, "gap", "gaps")));
    }
    Err(miette::miette!(
        code = "reqtrace::check::failed",
        "traceability check failed: {}",
        problems.join(", ")
    ))
}
