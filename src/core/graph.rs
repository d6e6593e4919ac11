//! Graph assembly: one canonical artifact per identifier plus link adjacency
//!
//! Blobs are scanned independently (in parallel) into [`BlobScan`]s, which
//! are then sorted by source path and merged in that order. The sort is what
//! makes first-definition-wins reproducible regardless of thread scheduling.
//! Scans sharing a source are ordered by content hash.

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::core::identity::{is_issue_ref, ArtifactId, ArtifactPrefix};
use crate::core::links::{Edge, LinkExtractor};
use crate::core::patterns::PatternRegistry;
use crate::core::scanner::{Blob, Classification, OriginKind, RawOccurrence, Scanner};

/// Everything learned from a single blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobScan {
    pub source: String,
    pub kind: OriginKind,
    pub hash: String,
    pub issue_number: Option<u64>,
    pub occurrences: Vec<RawOccurrence>,
    pub edges: Vec<Edge>,
}

impl BlobScan {
    fn definitions(&self) -> impl Iterator<Item = &RawOccurrence> {
        self.occurrences.iter().filter(|o| o.is_definition())
    }
}

/// Scan one blob for occurrences and links
pub fn scan_blob(registry: &PatternRegistry, blob: &Blob) -> BlobScan {
    let scanner = Scanner::new(registry);
    let definitions = scanner.definitions(blob);
    let edges = LinkExtractor::new(registry).extract_links_from(blob, &definitions);
    let occurrences = scanner.scan_from(blob, definitions).collect();
    BlobScan {
        source: blob.source.clone(),
        kind: blob.kind,
        hash: blob.content_hash(),
        issue_number: blob.issue_number(),
        occurrences,
        edges,
    }
}

/// Scan all blobs in parallel; the result is sorted by source
pub fn scan_all(registry: &PatternRegistry, blobs: &[Blob]) -> Vec<BlobScan> {
    let mut scans: Vec<BlobScan> = blobs.par_iter().map(|b| scan_blob(registry, b)).collect();
    scans.sort_by(scan_order);
    scans
}

/// Merge order: source, then content hash, then origin kind
pub fn scan_order(a: &BlobScan, b: &BlobScan) -> Ordering {
    a.source
        .cmp(&b.source)
        .then_with(|| a.hash.cmp(&b.hash))
        .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
}

/// Scan and assemble in one step
pub fn build_graph(registry: &PatternRegistry, blobs: &[Blob]) -> Graph {
    assemble(scan_all(registry, blobs))
}

/// Canonical record for one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    #[serde(rename = "type")]
    pub prefix: ArtifactPrefix,
    pub title: String,
    #[serde(rename = "path")]
    pub source_path: String,
    pub source_type: Classification,
    #[serde(rename = "hash")]
    pub content_hash: String,
    /// Other identifiers mentioned in the same blob
    pub references: Vec<String>,
}

impl Artifact {
    pub fn is_defined(&self) -> bool {
        self.source_type == Classification::Definition
    }

    fn from_occurrence(
        occurrence: &RawOccurrence,
        prefix: ArtifactPrefix,
        scan: &BlobScan,
    ) -> Self {
        let references: BTreeSet<&str> = scan
            .occurrences
            .iter()
            .map(|o| o.id.as_str())
            .filter(|id| *id != occurrence.id)
            .collect();
        Self {
            id: occurrence.id.clone(),
            prefix,
            title: occurrence.title_hint.clone(),
            source_path: scan.source.clone(),
            source_type: occurrence.classification,
            content_hash: scan.hash.clone(),
            references: references.into_iter().map(String::from).collect(),
        }
    }
}

/// Where an identifier was seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub source: String,
    pub line: usize,
    pub classification: Classification,
}

/// Every blob that claimed to define an identifier, the canonical one first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateDefinition {
    pub count: usize,
    pub sources: Vec<String>,
}

/// The assembled traceability graph
///
/// Identifiers that are only ever referenced still get an artifact entry
/// (classified as a reference) so reports can list them; a definition seen
/// later replaces such an entry.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    artifacts: IndexMap<String, Artifact>,
    duplicates: BTreeMap<String, DuplicateDefinition>,
    edges: Vec<Edge>,
    forward: BTreeMap<String, Vec<Edge>>,
    backward: BTreeMap<String, BTreeSet<String>>,
    provenance: BTreeMap<String, Vec<Provenance>>,
    aliases: BTreeMap<String, String>,
    sources: usize,
}

impl Graph {
    /// All artifacts, in scan order
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    /// Artifacts established by a definition
    pub fn definitions(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values().filter(|a| a.is_defined())
    }

    pub fn get(&self, id: &str) -> Option<&Artifact> {
        self.artifacts.get(id)
    }

    /// True when `id` has a canonical definition
    pub fn is_defined(&self, id: &str) -> bool {
        self.get(id).is_some_and(Artifact::is_defined)
    }

    /// Type of a defined artifact
    pub fn prefix_of(&self, id: &str) -> Option<ArtifactPrefix> {
        self.get(id).filter(|a| a.is_defined()).map(|a| a.prefix)
    }

    /// Deduplicated edges in first-occurrence order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn outgoing(&self, id: &str) -> &[Edge] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Identifiers with an edge into `id`
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &str> {
        self.backward.get(id).into_iter().flatten().map(String::as_str)
    }

    pub fn forward_links(&self) -> &BTreeMap<String, Vec<Edge>> {
        &self.forward
    }

    pub fn backward_links(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.backward
    }

    pub fn duplicates(&self) -> &BTreeMap<String, DuplicateDefinition> {
        &self.duplicates
    }

    pub fn provenance(&self, id: &str) -> &[Provenance] {
        self.provenance.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Identifiers mentioned anywhere, defined or not
    pub fn mentioned(&self) -> impl Iterator<Item = &str> {
        self.provenance.keys().map(String::as_str)
    }

    /// Issue references (`#N`) that resolved to an identifier
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Number of blobs the graph was assembled from
    pub fn source_count(&self) -> usize {
        self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.edges.is_empty()
    }
}

/// Merge per-blob scans into one graph.
///
/// Scans are re-sorted with [`scan_order`], so the input order does not matter.
pub fn assemble(mut scans: Vec<BlobScan>) -> Graph {
    scans.sort_by(scan_order);

    let mut graph = Graph {
        sources: scans.len(),
        ..Graph::default()
    };
    let mut claims: BTreeMap<String, DuplicateDefinition> = BTreeMap::new();

    for scan in &scans {
        for occurrence in &scan.occurrences {
            graph
                .provenance
                .entry(occurrence.id.clone())
                .or_default()
                .push(Provenance {
                    source: scan.source.clone(),
                    line: occurrence.line,
                    classification: occurrence.classification,
                });
            register(&mut graph.artifacts, &mut claims, occurrence, scan);
        }

        if let (Some(number), Some(first)) = (scan.issue_number, scan.definitions().next()) {
            graph
                .aliases
                .entry(format!("#{}", number))
                .or_insert_with(|| first.id.clone());
        }
    }
    graph.duplicates = claims.into_iter().filter(|(_, c)| c.count > 1).collect();

    let mut unique: IndexSet<Edge> = IndexSet::new();
    for edge in scans.iter().flat_map(|s| s.edges.iter()) {
        let from = resolve(&graph.aliases, &edge.from);
        let to = resolve(&graph.aliases, &edge.to);
        if from == to {
            continue;
        }
        unique.insert(Edge::new(from, edge.relation, to));
    }

    for edge in &unique {
        graph
            .forward
            .entry(edge.from.clone())
            .or_default()
            .push(edge.clone());
        graph
            .backward
            .entry(edge.to.clone())
            .or_default()
            .insert(edge.from.clone());
    }
    graph.edges = unique.into_iter().collect();

    info!(
        sources = graph.sources,
        artifacts = graph.artifacts.len(),
        edges = graph.edges.len(),
        duplicates = graph.duplicates.len(),
        "assembled traceability graph"
    );
    graph
}

/// Record one occurrence. The first definition wins; a reference only
/// creates a placeholder until a definition shows up.
fn register(
    artifacts: &mut IndexMap<String, Artifact>,
    claims: &mut BTreeMap<String, DuplicateDefinition>,
    occurrence: &RawOccurrence,
    scan: &BlobScan,
) {
    let Ok(id) = ArtifactId::parse(&occurrence.id) else {
        debug!(id = %occurrence.id, "skipping unparseable identifier");
        return;
    };

    if occurrence.is_definition() {
        let claim = claims
            .entry(occurrence.id.clone())
            .or_insert_with(|| DuplicateDefinition {
                count: 0,
                sources: Vec::new(),
            });
        claim.count += 1;
        claim.sources.push(scan.source.clone());
    }

    match artifacts.get_mut(&occurrence.id) {
        None => {
            artifacts.insert(
                occurrence.id.clone(),
                Artifact::from_occurrence(occurrence, id.prefix(), scan),
            );
        }
        Some(existing) if occurrence.is_definition() && !existing.is_defined() => {
            *existing = Artifact::from_occurrence(occurrence, id.prefix(), scan);
        }
        Some(_) => {}
    }
}

fn resolve(aliases: &BTreeMap<String, String>, endpoint: &str) -> String {
    if is_issue_ref(endpoint) {
        if let Some(id) = aliases.get(endpoint) {
            return id.clone();
        }
    }
    endpoint.to_string()
}
