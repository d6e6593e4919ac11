//! Property tests for graph assembly over generated document sets

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use reqtrace::core::graph::{build_graph, Graph};
use reqtrace::core::identity::ArtifactPrefix;
use reqtrace::core::links::LinkExtractor;
use reqtrace::core::metrics::compute_metrics;
use reqtrace::core::patterns::PatternRegistry;
use reqtrace::core::scanner::{Blob, OriginKind, Scanner};

const FRAGMENTS: [&str; 14] = [
    "## REQ-F-001: Login",
    "## REQ-F-002: Search",
    "## REQ-NF-004: Latency budget",
    "## StR-001: Secure access",
    "## ADR-001: Use Rust",
    "## QA-SC-001: Fast response",
    "Traces to: StR-001",
    "Verified by: TEST-001",
    "Depends on: REQ-F-002",
    "Satisfies: QA-SC-001",
    "Implements:",
    "- ADR-001",
    "",
    "See REQ-NF-003 for details",
];

fn documents() -> impl Strategy<Value = (Vec<String>, Vec<usize>)> {
    let doc = prop::collection::vec(prop::sample::select(FRAGMENTS.to_vec()), 1..12)
        .prop_map(|lines| lines.join("\n"));
    prop::collection::vec(doc, 1..6).prop_flat_map(|docs| {
        let order: Vec<usize> = (0..docs.len()).collect();
        (Just(docs), Just(order).prop_shuffle())
    })
}

fn blobs(docs: &[String], order: &[usize]) -> Vec<Blob> {
    order
        .iter()
        .map(|&i| {
            Blob::new(
                format!("02-requirements/doc{}.md", i),
                OriginKind::MarkdownHeadingBody,
                docs[i].clone(),
            )
        })
        .collect()
}

fn same_graph(a: &Graph, b: &Graph) -> bool {
    a.edges() == b.edges()
        && a.artifacts().eq(b.artifacts())
        && a.duplicates() == b.duplicates()
}

proptest! {
    #[test]
    fn prop_rescanning_is_stable((docs, _order) in documents()) {
        let registry = PatternRegistry::new();
        let scanner = Scanner::new(&registry);
        let extractor = LinkExtractor::new(&registry);
        for blob in blobs(&docs, &(0..docs.len()).collect::<Vec<_>>()) {
            let first: Vec<_> = scanner.scan(&blob).collect();
            let second: Vec<_> = scanner.scan(&blob).collect();
            prop_assert_eq!(first, second);
            prop_assert_eq!(extractor.extract_links(&blob), extractor.extract_links(&blob));
        }
    }

    #[test]
    fn prop_graph_independent_of_blob_order((docs, order) in documents()) {
        let registry = PatternRegistry::new();
        let natural: Vec<usize> = (0..docs.len()).collect();
        let expected = build_graph(&registry, &blobs(&docs, &natural));
        let shuffled = build_graph(&registry, &blobs(&docs, &order));
        if !same_graph(&expected, &shuffled) {
            return Err(TestCaseError::fail(format!("graph changed with order {:?}", order)));
        }
    }

    #[test]
    fn prop_backward_links_mirror_edges((docs, order) in documents()) {
        let registry = PatternRegistry::new();
        let graph = build_graph(&registry, &blobs(&docs, &order));
        for edge in graph.edges() {
            prop_assert_ne!(&edge.from, &edge.to);
            prop_assert!(graph.incoming(&edge.to).any(|from| from == edge.from));
            prop_assert!(graph.outgoing(&edge.from).contains(edge));
        }
    }

    #[test]
    fn prop_metrics_are_bounded((docs, order) in documents()) {
        let registry = PatternRegistry::new();
        let graph = build_graph(&registry, &blobs(&docs, &order));
        for metric in compute_metrics(&graph, ArtifactPrefix::requirements()).values() {
            prop_assert!(metric.numerator <= metric.denominator);
            prop_assert!((0.0..=100.0).contains(&metric.percentage));
        }
    }
}
