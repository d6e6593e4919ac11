//! `reqtrace coverage` command - Requirement coverage metrics and gating

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::cli::args::SourceArgs;
use crate::cli::commands::utils::load_workspace;
use crate::cli::helpers::{style_percentage, truncate_str};
use crate::cli::report::{metrics_table, Analysis, MetricSummary};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::CoverageThreshold;
use crate::core::metrics::{uncovered, MetricName};

#[derive(clap::Args, Debug)]
pub struct CoverageArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Minimum coverage: a percentage for every metric, or
    /// `requirement=90,requirement_to_test=50`
    #[arg(long, value_name = "THRESHOLD", value_parser = CoverageThreshold::parse)]
    pub min: Option<CoverageThreshold>,

    /// List requirements missing from a metric (default: requirement_to_test)
    #[arg(
        long,
        value_name = "METRIC",
        num_args = 0..=1,
        default_missing_value = "requirement_to_test"
    )]
    pub uncovered: Option<MetricName>,
}

#[derive(Serialize)]
struct Failure {
    metric: MetricName,
    coverage_pct: f64,
    minimum: f64,
}

#[derive(Serialize)]
struct CoverageReport<'a> {
    metrics: BTreeMap<MetricName, MetricSummary>,
    thresholds: &'a BTreeMap<MetricName, f64>,
    failures: &'a [Failure],
    #[serde(skip_serializing_if = "Option::is_none")]
    uncovered: Option<Vec<&'a str>>,
}

pub fn run(args: CoverageArgs, global: &GlobalOpts) -> Result<()> {
    let ws = load_workspace(&args.sources, global)?;
    let config = ws.config.clone().with_min_coverage(args.min);
    let analysis = Analysis::new(&ws.graph, &config);

    let failures: Vec<Failure> = analysis
        .below_threshold(&config.min_coverage)
        .map(|(metric, minimum)| Failure {
            metric: metric.name,
            coverage_pct: metric.rounded(),
            minimum,
        })
        .collect();

    let listed = args.uncovered.unwrap_or(MetricName::RequirementToTest);
    let missing = uncovered(&ws.graph, &config.requirement_prefixes, listed);

    match global.format {
        OutputFormat::Json => {
            let report = CoverageReport {
                metrics: analysis
                    .metrics
                    .iter()
                    .map(|(name, m)| {
                        (
                            *name,
                            MetricSummary {
                                coverage_pct: m.rounded(),
                                total: m.denominator,
                                linked: m.numerator,
                            },
                        )
                    })
                    .collect(),
                thresholds: &config.min_coverage,
                failures: &failures,
                uncovered: args
                    .uncovered
                    .map(|_| missing.iter().map(|a| a.id.as_str()).collect()),
            };
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for artifact in &missing {
                println!("{}", artifact.id);
            }
        }
        OutputFormat::Csv => {
            println!("metric,linked,total,coverage_pct");
            for m in analysis.metrics.values() {
                println!("{},{},{},{:.2}", m.name, m.numerator, m.denominator, m.rounded());
            }
        }
        OutputFormat::Md => {
            println!("{}", metrics_table(&analysis.metrics));
        }
        OutputFormat::Auto => {
            println!("{}", style("Traceability Coverage Report").bold());
            println!("{}", style("═".repeat(60)).dim());
            println!();

            for m in analysis.metrics.values() {
                let threshold = config.min_coverage.get(&m.name).copied();
                println!(
                    "{:<26} {:>4} / {:<4} {}",
                    m.name.as_str(),
                    style(m.numerator).cyan(),
                    m.denominator,
                    style_percentage(m.rounded(), threshold)
                );
            }

            if !missing.is_empty() && (args.uncovered.is_some() || missing.len() <= 10) {
                println!();
                println!(
                    "{}",
                    style(format!("Requirements without {}:", listed.as_str())).bold()
                );
                println!("{}", style("─".repeat(60)).dim());
                for artifact in &missing {
                    println!(
                        "  {} {} - {}",
                        style("○").red(),
                        style(&artifact.id).cyan(),
                        truncate_str(&artifact.title, 45)
                    );
                }
            } else if !missing.is_empty() {
                println!();
                println!(
                    "Use {} to see the full list",
                    style("reqtrace coverage --uncovered").yellow()
                );
            }

            if !failures.is_empty() {
                println!();
                for f in &failures {
                    println!(
                        "{} {} is {:.2}%, below the minimum of {:.2}%",
                        style("✗").red(),
                        style(f.metric.as_str()).cyan(),
                        f.coverage_pct,
                        f.minimum
                    );
                }
            }
        }
    }

    if failures.is_empty() {
        return Ok(());
    }

    let summary: Vec<String> = failures
        .iter()
        .map(|f| format!("{} {:.2}% < {:.2}%", f.metric, f.coverage_pct, f.minimum))
        .collect();
    Err(miette::miette!(
        code = "reqtrace::coverage::below_minimum",
        help = "add the missing links or lower the threshold in .reqtrace.yaml",
        "coverage below minimum: {}",
        summary.join(", ")
    ))
}
