//! Coverage metrics and compliance anomalies over an assembled graph

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::core::graph::{Artifact, Graph};
use crate::core::identity::{is_issue_ref, ArtifactId, ArtifactPrefix};
use crate::core::links::{Edge, RelationType};

/// Coverage metrics reported for the requirement set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricName {
    /// Requirements with at least one outgoing link
    #[serde(rename = "requirement")]
    Requirement,
    /// Requirements linked to an ADR or architecture component
    #[serde(rename = "requirement_to_ADR")]
    RequirementToAdr,
    /// Requirements linked to a quality scenario
    #[serde(rename = "requirement_to_scenario")]
    RequirementToScenario,
    /// Requirements verified by a test, in either link direction
    #[serde(rename = "requirement_to_test")]
    RequirementToTest,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Requirement => "requirement",
            MetricName::RequirementToAdr => "requirement_to_ADR",
            MetricName::RequirementToScenario => "requirement_to_scenario",
            MetricName::RequirementToTest => "requirement_to_test",
        }
    }

    pub fn all() -> &'static [MetricName] {
        &[
            MetricName::Requirement,
            MetricName::RequirementToAdr,
            MetricName::RequirementToScenario,
            MetricName::RequirementToTest,
        ]
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown metric: {}. Use requirement, requirement_to_ADR, requirement_to_scenario or requirement_to_test",
                    s
                )
            })
    }
}

/// One coverage ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverageMetric {
    pub name: MetricName,
    pub numerator: usize,
    pub denominator: usize,
    /// In `[0, 100]`; 0.0 when the denominator is zero
    pub percentage: f64,
}

impl CoverageMetric {
    pub fn new(name: MetricName, numerator: usize, denominator: usize) -> Self {
        let percentage = if denominator == 0 {
            0.0
        } else {
            numerator as f64 / denominator as f64 * 100.0
        };
        Self {
            name,
            numerator,
            denominator,
            percentage,
        }
    }

    /// Percentage rounded to two decimals, as reported
    pub fn rounded(&self) -> f64 {
        (self.percentage * 100.0).round() / 100.0
    }
}

/// Type of an edge endpoint, read from the identifier itself so that links
/// to artifacts defined elsewhere (or nowhere) still count
fn endpoint_prefix(id: &str) -> Option<ArtifactPrefix> {
    if is_issue_ref(id) {
        return None;
    }
    ArtifactId::parse(id).ok().map(|id| id.prefix())
}

/// Defined requirements of the given types
fn requirements<'g>(graph: &'g Graph, prefixes: &[ArtifactPrefix]) -> Vec<&'g Artifact> {
    graph
        .definitions()
        .filter(|a| prefixes.contains(&a.prefix))
        .collect()
}

/// True when requirement `id` counts towards the numerator of `metric`
pub fn is_covered(graph: &Graph, id: &str, metric: MetricName) -> bool {
    let outgoing = graph.outgoing(id);
    match metric {
        MetricName::Requirement => !outgoing.is_empty(),
        MetricName::RequirementToAdr => outgoing
            .iter()
            .any(|e| endpoint_prefix(&e.to).is_some_and(|p| p.is_architecture())),
        MetricName::RequirementToScenario => outgoing
            .iter()
            .any(|e| endpoint_prefix(&e.to) == Some(ArtifactPrefix::QaSc)),
        MetricName::RequirementToTest => is_verified(graph, id),
    }
}

/// Compute the four coverage metrics over defined requirements of the given
/// types
pub fn compute_metrics(
    graph: &Graph,
    requirement_prefixes: &[ArtifactPrefix],
) -> BTreeMap<MetricName, CoverageMetric> {
    let requirements = requirements(graph, requirement_prefixes);
    let total = requirements.len();

    MetricName::all()
        .iter()
        .map(|name| {
            let covered = requirements
                .iter()
                .filter(|r| is_covered(graph, &r.id, *name))
                .count();
            (*name, CoverageMetric::new(*name, covered, total))
        })
        .collect()
}

/// Requirements missing from the numerator of `metric`
pub fn uncovered<'g>(
    graph: &'g Graph,
    requirement_prefixes: &[ArtifactPrefix],
    metric: MetricName,
) -> Vec<&'g Artifact> {
    requirements(graph, requirement_prefixes)
        .into_iter()
        .filter(|r| !is_covered(graph, &r.id, metric))
        .collect()
}

/// A requirement is verified when it is `verified_by` a test, or a test is
/// `verified_by` it (tests citing what they verify)
fn is_verified(graph: &Graph, id: &str) -> bool {
    let verified_by = |e: &&Edge| e.relation == RelationType::VerifiedBy;

    let forward = graph
        .outgoing(id)
        .iter()
        .filter(verified_by)
        .any(|e| endpoint_prefix(&e.to) == Some(ArtifactPrefix::Test));
    if forward {
        return true;
    }

    graph
        .incoming(id)
        .filter(|from| endpoint_prefix(from) == Some(ArtifactPrefix::Test))
        .any(|from| {
            graph
                .outgoing(from)
                .iter()
                .filter(verified_by)
                .any(|e| e.to == id)
        })
}

/// Orphan artifact: defined, not a stakeholder requirement, no outgoing links
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Orphan {
    pub id: String,
    #[serde(rename = "type")]
    pub prefix: ArtifactPrefix,
    pub title: String,
    pub source: String,
}

pub fn find_orphans(graph: &Graph) -> Vec<Orphan> {
    let mut orphans: Vec<Orphan> = graph
        .definitions()
        .filter(|a| !a.prefix.is_root() && graph.outgoing(&a.id).is_empty())
        .map(|a| Orphan {
            id: a.id.clone(),
            prefix: a.prefix,
            title: a.title.clone(),
            source: a.source_path.clone(),
        })
        .collect();
    orphans.sort_by(|a, b| a.id.cmp(&b.id));
    orphans
}

/// Identifier → number of definition claims (always at least 2)
pub fn find_duplicates(graph: &Graph) -> BTreeMap<String, usize> {
    graph
        .duplicates()
        .iter()
        .map(|(id, claims)| (id.clone(), claims.count))
        .collect()
}

/// Observed numbers of one series (`REQ-F`, `ADR-INFR`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberingSeries {
    pub series: String,
    pub numbers: BTreeSet<u16>,
}

impl NumberingSeries {
    pub fn min(&self) -> Option<u16> {
        self.numbers.first().copied()
    }

    pub fn max(&self) -> Option<u16> {
        self.numbers.last().copied()
    }

    /// Numbers missing from `[min, max]`
    pub fn gaps(&self) -> Vec<u16> {
        match (self.min(), self.max()) {
            (Some(min), Some(max)) => (min..=max).filter(|n| !self.numbers.contains(n)).collect(),
            _ => Vec::new(),
        }
    }
}

/// Group the numbers of defined, canonical identifiers by series
pub fn numbering_series(graph: &Graph) -> Vec<NumberingSeries> {
    let mut by_series: BTreeMap<String, BTreeSet<u16>> = BTreeMap::new();
    for artifact in graph.definitions() {
        let Ok(id) = ArtifactId::parse(&artifact.id) else {
            continue;
        };
        if !id.is_canonical() {
            continue;
        }
        if let Some(number) = id.number() {
            by_series.entry(id.series()).or_default().insert(number);
        }
    }
    by_series
        .into_iter()
        .map(|(series, numbers)| NumberingSeries { series, numbers })
        .collect()
}

/// Missing numbers within one series; a single artifact has no gaps
pub fn find_numbering_gaps(graph: &Graph, series: &str) -> Vec<u16> {
    numbering_series(graph)
        .into_iter()
        .find(|s| s.series == series)
        .map(|s| s.gaps())
        .unwrap_or_default()
}

/// Every series with at least one gap
pub fn all_numbering_gaps(graph: &Graph) -> BTreeMap<String, Vec<u16>> {
    numbering_series(graph)
        .into_iter()
        .filter_map(|s| {
            let gaps = s.gaps();
            (!gaps.is_empty()).then_some((s.series, gaps))
        })
        .collect()
}

/// An identifier that is linked to or mentioned but never defined
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dangling {
    pub id: String,
    /// Sources mentioning it, sorted
    pub sources: Vec<String>,
    /// Artifacts linking to it
    pub linked_from: Vec<String>,
}

/// Identifiers without a definition, issue references excluded
pub fn find_dangling(graph: &Graph) -> Vec<Dangling> {
    let mut ids: BTreeSet<&str> = graph.mentioned().collect();
    ids.extend(graph.edges().iter().map(|e| e.to.as_str()));

    ids.into_iter()
        .filter(|id| !is_issue_ref(id) && !graph.is_defined(id))
        .map(|id| {
            let sources: BTreeSet<&str> = graph
                .provenance(id)
                .iter()
                .map(|p| p.source.as_str())
                .collect();
            Dangling {
                id: id.to_string(),
                sources: sources.into_iter().map(String::from).collect(),
                linked_from: graph.incoming(id).map(String::from).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::build_graph;
    use crate::core::patterns::PatternRegistry;
    use crate::core::scanner::{Blob, OriginKind};

    fn graph(blobs: &[(&str, &str)]) -> Graph {
        let blobs: Vec<Blob> = blobs
            .iter()
            .map(|(source, text)| Blob::new(*source, OriginKind::MarkdownHeadingBody, *text))
            .collect();
        build_graph(&PatternRegistry::new(), &blobs)
    }

    fn pct(metrics: &BTreeMap<MetricName, CoverageMetric>, name: MetricName) -> f64 {
        metrics[&name].percentage
    }

    #[test]
    fn test_empty_requirement_set_is_zero() {
        let g = graph(&[("a.md", "## StR-001: Need\n")]);
        let metrics = compute_metrics(&g, ArtifactPrefix::requirements());
        assert_eq!(metrics.len(), 4);
        for metric in metrics.values() {
            assert_eq!(metric.percentage, 0.0);
            assert_eq!(metric.denominator, 0);
        }
    }

    #[test]
    fn test_coverage_by_target_type() {
        let g = graph(&[(
            "reqs.md",
            "## REQ-F-001: A\nTraces to: StR-001\nImplements: ADR-001\n\
             ## REQ-F-002: B\nSatisfies: QA-SC-001\nVerified by: TEST-LOGIN-001\n\
             ## REQ-NF-001: C\n\
             ## REQ-NF-002: D\nDepends on: ARC-C-004\n",
        )]);
        let m = compute_metrics(&g, ArtifactPrefix::requirements());
        assert_eq!(pct(&m, MetricName::Requirement), 75.0);
        assert_eq!(pct(&m, MetricName::RequirementToAdr), 50.0);
        assert_eq!(pct(&m, MetricName::RequirementToScenario), 25.0);
        assert_eq!(pct(&m, MetricName::RequirementToTest), 25.0);
        assert_eq!(m[&MetricName::Requirement].numerator, 3);
    }

    #[test]
    fn test_test_coverage_from_test_side() {
        let registry = PatternRegistry::new();
        let blobs = vec![
            Blob::new("reqs.md", OriginKind::MarkdownHeadingBody, "## REQ-F-001: Login\n## REQ-F-002: Logout\n"),
            Blob::new(
                "tests/login_test.cpp",
                OriginKind::SourceText,
                "// TEST-LOGIN-001\n// Verifies: REQ-F-001\n",
            ),
        ];
        let g = build_graph(&registry, &blobs);
        let m = compute_metrics(&g, ArtifactPrefix::requirements());
        assert_eq!(m[&MetricName::RequirementToTest].numerator, 1);
        assert_eq!(pct(&m, MetricName::RequirementToTest), 50.0);
        // the requirement itself has no outgoing links
        assert_eq!(m[&MetricName::Requirement].numerator, 0);
    }

    #[test]
    fn test_unlinked_requirement_not_test_covered() {
        let g = graph(&[("a.md", "## REQ-F-001: Login\nSee TEST-LOGIN-001.\n")]);
        let m = compute_metrics(&g, ArtifactPrefix::requirements());
        assert_eq!(m[&MetricName::RequirementToTest].numerator, 0);
    }

    #[test]
    fn test_requirement_prefixes_are_configurable() {
        let g = graph(&[("a.md", "## REQ-F-001: A\nTraces to: StR-001\n## REQ-NF-001: B\n")]);
        let m = compute_metrics(&g, &[ArtifactPrefix::ReqF]);
        assert_eq!(m[&MetricName::Requirement].denominator, 1);
        assert_eq!(pct(&m, MetricName::Requirement), 100.0);
    }

    #[test]
    fn test_uncovered_requirements() {
        let g = graph(&[(
            "a.md",
            "## REQ-F-001: A\nVerified by: TEST-001\n## REQ-F-002: B\n## StR-001: S\n",
        )]);
        let ids: Vec<&str> = uncovered(&g, ArtifactPrefix::requirements(), MetricName::RequirementToTest)
            .into_iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["REQ-F-002"]);
    }

    #[test]
    fn test_rounding() {
        let metric = CoverageMetric::new(MetricName::Requirement, 1, 3);
        assert_eq!(metric.rounded(), 33.33);
    }

    #[test]
    fn test_orphans_exclude_stakeholder_requirements() {
        let g = graph(&[(
            "a.md",
            "## StR-001: Need\n## REQ-F-001: Linked\nTraces to: StR-001\n## ADR-002: Lonely\n",
        )]);
        let orphans: Vec<String> = find_orphans(&g).into_iter().map(|o| o.id).collect();
        assert_eq!(orphans, vec!["ADR-002"]);
    }

    #[test]
    fn test_duplicates_counted() {
        let g = graph(&[
            ("docs/a.md", "## ADR-003: One\n"),
            ("docs/b.md", "## ADR-003: Two\n"),
            ("docs/c.md", "## ADR-004: Unique\n"),
        ]);
        let dups = find_duplicates(&g);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups["ADR-003"], 2);
    }

    #[test]
    fn test_numbering_gaps() {
        let g = graph(&[(
            "a.md",
            "## REQ-F-001: A\n## REQ-F-002: B\n## REQ-F-004: D\n## ADR-INFR-007: X\n",
        )]);
        assert_eq!(find_numbering_gaps(&g, "REQ-F"), vec![3]);
        assert!(find_numbering_gaps(&g, "ADR-INFR").is_empty());
        assert!(find_numbering_gaps(&g, "QA-SC").is_empty());

        let all = all_numbering_gaps(&g);
        assert_eq!(all.len(), 1);
        assert_eq!(all["REQ-F"], vec![3]);
    }

    #[test]
    fn test_numbering_series_ranges() {
        let g = graph(&[("a.md", "## REQ-F-003: A\n## REQ-F-010: B\n## ADR-INFR-002: X\n")]);
        let series = numbering_series(&g);
        let names: Vec<&str> = series.iter().map(|s| s.series.as_str()).collect();
        assert_eq!(names, vec!["ADR-INFR", "REQ-F"]);
        assert_eq!(series[1].min(), Some(3));
        assert_eq!(series[1].max(), Some(10));
        assert_eq!(series[1].gaps().len(), 6);
    }

    #[test]
    fn test_dangling_identifiers() {
        let g = graph(&[("a.md", "## REQ-F-001: A\nTraces to: StR-009, #4\nSee ADR-001.\n")]);
        let dangling = find_dangling(&g);
        let ids: Vec<&str> = dangling.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["ADR-001", "StR-009"]);
        assert_eq!(dangling[1].linked_from, vec!["REQ-F-001"]);
        assert_eq!(dangling[1].sources, vec!["a.md"]);
    }

    #[test]
    fn test_metric_name_parse() {
        assert_eq!(
            "requirement_to_adr".parse::<MetricName>().unwrap(),
            MetricName::RequirementToAdr
        );
        assert!("bogus".parse::<MetricName>().is_err());
    }
}
