//! Report rendering: JSON document, markdown tables and CSV edge export

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::truncate_str;
use crate::core::config::Config;
use crate::core::graph::{Artifact, Graph};
use crate::core::links::Edge;
use crate::core::metrics::{
    compute_metrics, find_dangling, find_orphans, numbering_series, CoverageMetric, Dangling,
    MetricName, NumberingSeries, Orphan,
};

/// Everything derived from a graph, computed once per run
#[derive(Debug, Clone)]
pub struct Analysis {
    pub metrics: BTreeMap<MetricName, CoverageMetric>,
    pub orphans: Vec<Orphan>,
    pub series: Vec<NumberingSeries>,
    pub dangling: Vec<Dangling>,
}

impl Analysis {
    pub fn new(graph: &Graph, config: &Config) -> Self {
        Self {
            metrics: compute_metrics(graph, &config.requirement_prefixes),
            orphans: find_orphans(graph),
            series: numbering_series(graph),
            dangling: find_dangling(graph),
        }
    }

    /// Series with at least one missing number
    pub fn gaps(&self) -> BTreeMap<String, Vec<u16>> {
        self.series
            .iter()
            .filter_map(|s| {
                let gaps = s.gaps();
                (!gaps.is_empty()).then(|| (s.series.clone(), gaps))
            })
            .collect()
    }

    /// Metrics below their configured threshold, with the threshold
    pub fn below_threshold<'a>(
        &'a self,
        thresholds: &'a BTreeMap<MetricName, f64>,
    ) -> impl Iterator<Item = (&'a CoverageMetric, f64)> + 'a {
        thresholds.iter().filter_map(move |(name, min)| {
            self.metrics
                .get(name)
                .filter(|m| m.rounded() < *min)
                .map(|m| (m, *min))
        })
    }
}

/// One entry of the `metrics` object
#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub coverage_pct: f64,
    pub total: usize,
    pub linked: usize,
}

/// The JSON report written by `reqtrace build`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceabilityReport<'g> {
    pub items: Vec<&'g Artifact>,
    pub duplicate_definition_ids: Vec<&'g str>,
    pub metrics: BTreeMap<MetricName, MetricSummary>,
    #[serde(rename = "forward_links")]
    pub forward_links: BTreeMap<&'g str, Vec<&'g str>>,
    #[serde(rename = "backward_links")]
    pub backward_links: BTreeMap<&'g str, Vec<&'g str>>,
    pub edges: &'g [Edge],
    pub gaps: BTreeMap<String, Vec<u16>>,
    pub orphans: Vec<&'g str>,
    pub dangling: Vec<&'g str>,
    #[serde(rename = "generated_at")]
    pub generated_at: DateTime<Utc>,
}

impl<'g> TraceabilityReport<'g> {
    pub fn new(graph: &'g Graph, analysis: &'g Analysis) -> Self {
        let forward_links = graph
            .forward_links()
            .iter()
            .map(|(id, edges)| {
                let targets: IndexSet<&str> = edges.iter().map(|e| e.to.as_str()).collect();
                (id.as_str(), targets.into_iter().collect())
            })
            .collect();
        let backward_links = graph
            .backward_links()
            .iter()
            .map(|(id, sources)| (id.as_str(), sources.iter().map(String::as_str).collect()))
            .collect();

        Self {
            items: graph.artifacts().collect(),
            duplicate_definition_ids: graph.duplicates().keys().map(String::as_str).collect(),
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
            forward_links,
            backward_links,
            edges: graph.edges(),
            gaps: analysis.gaps(),
            orphans: analysis.orphans.iter().map(|o| o.id.as_str()).collect(),
            dangling: analysis.dangling.iter().map(|d| d.id.as_str()).collect(),
            generated_at: Utc::now(),
        }
    }
}

/// Coverage metrics as a markdown table
pub fn metrics_table(metrics: &BTreeMap<MetricName, CoverageMetric>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Metric", "Linked", "Total", "Coverage"]);
    for metric in metrics.values() {
        builder.push_record([
            metric.name.to_string(),
            metric.numerator.to_string(),
            metric.denominator.to_string(),
            format!("{:.2}%", metric.rounded()),
        ]);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn duplicates_table(graph: &Graph) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Definitions", "Canonical", "Also defined in"]);
    for (id, claims) in graph.duplicates() {
        let canonical = claims.sources.first().cloned().unwrap_or_default();
        builder.push_record([
            id.clone(),
            claims.count.to_string(),
            canonical,
            claims.sources.iter().skip(1).cloned().collect::<Vec<_>>().join(", "),
        ]);
    }
    builder.build().with(Style::markdown()).to_string()
}

/// Numbering gaps grouped by series, with the observed range
pub fn gaps_table(series: &[NumberingSeries]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Series", "Observed", "Missing"]);
    for s in series {
        let gaps = s.gaps();
        if gaps.is_empty() {
            continue;
        }
        let (min, max) = (s.min().unwrap_or_default(), s.max().unwrap_or_default());
        builder.push_record([
            s.series.clone(),
            format!("{:03}..{:03} ({} ids)", min, max, s.numbers.len()),
            format_numbers(&gaps),
        ]);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn orphans_table(orphans: &[Orphan]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Type", "Title", "Origin"]);
    for orphan in orphans {
        builder.push_record([
            orphan.id.clone(),
            orphan.prefix.to_string(),
            truncate_str(&orphan.title, 40),
            orphan.source.clone(),
        ]);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn dangling_table(dangling: &[Dangling]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Linked from", "Mentioned in"]);
    for d in dangling {
        builder.push_record([
            d.id.clone(),
            d.linked_from.join(", "),
            d.sources.join(", "),
        ]);
    }
    builder.build().with(Style::markdown()).to_string()
}

/// Full human-readable report
pub fn markdown_report(graph: &Graph, analysis: &Analysis) -> String {
    let mut out = String::new();
    out.push_str("# Traceability Report\n\n");
    out.push_str(&format!(
        "- **Sources scanned:** {}\n- **Artifacts defined:** {}\n- **Links:** {}\n\n",
        graph.source_count(),
        graph.definitions().count(),
        graph.edges().len()
    ));

    out.push_str("## Coverage\n\n");
    out.push_str(&metrics_table(&analysis.metrics));
    out.push_str("\n\n");

    out.push_str("## Duplicate Definitions\n\n");
    if graph.duplicates().is_empty() {
        out.push_str("None.\n\n");
    } else {
        out.push_str(&duplicates_table(graph));
        out.push_str("\n\n");
    }

    out.push_str("## Numbering Gaps\n\n");
    if analysis.gaps().is_empty() {
        out.push_str("None.\n\n");
    } else {
        out.push_str(&gaps_table(&analysis.series));
        out.push_str("\n\n");
    }

    out.push_str("## Orphans\n\n");
    if analysis.orphans.is_empty() {
        out.push_str("None.\n\n");
    } else {
        out.push_str(&orphans_table(&analysis.orphans));
        out.push_str("\n\n");
    }

    if !analysis.dangling.is_empty() {
        out.push_str("## Undefined References\n\n");
        out.push_str(&dangling_table(&analysis.dangling));
        out.push('\n');
    }
    out
}

/// Edges as CSV with a `from,relation,to` header
pub fn edges_csv(edges: &[Edge]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["from", "relation", "to"])?;
    for edge in edges {
        writer.write_record([edge.from.as_str(), edge.relation.as_str(), edge.to.as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Orphans as CSV, one row per artifact
pub fn orphans_csv(orphans: &[Orphan]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for orphan in orphans {
        writer.serialize(orphan)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Compress sorted numbers into ranges: `3, 5-7`
pub fn format_numbers(numbers: &[u16]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut iter = numbers.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(format!("{:03}", start));
        } else {
            parts.push(format!("{:03}-{:03}", start, end));
        }
    }
    parts.join(", ")
}
