//! Orchestrator: raw map document to parameterized network.

use tn_core::GeoPoint;
use tn_osm::{ingest, Extract, IngestResult, MetadataRepair, RawDocument};

use crate::graph::{BprCoefficients, GraphCounts, RoadGraph};
use crate::{
    annotate_lengths, build_graph, infer_attributes, parameterize, simplify, BuildError,
    InferenceReport, NetworkResult, ParameterReport, SimplifyReport,
};

/// Knobs for [`build_network`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Stamp applied when the document lacks edit metadata.  `None` turns
    /// the repair-and-retry path off.
    pub repair: Option<MetadataRepair>,
    pub bpr:    BprCoefficients,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { repair: Some(MetadataRepair::now()), bpr: BprCoefficients::DEFAULT }
    }
}

/// The finished network plus what happened on the way.
#[derive(Clone, Debug)]
pub struct NetworkSummary {
    pub graph:      RoadGraph,
    /// Counts right after the Graph Builder.
    pub original:   GraphCounts,
    /// Counts after parameterization.
    pub simplified: GraphCounts,
    /// Mean longitude/latitude of the surviving nodes.
    pub centroid:   GeoPoint,

    pub simplify:   SimplifyReport,
    pub inference:  InferenceReport,
    pub parameters: ParameterReport,
}

/// Run the whole pipeline on `doc`.
///
/// A document missing changeset/timestamp metadata is stamped with
/// `config.repair` and ingested once more.
///
/// # Errors
///
/// The first failing phase's error; no partial graph is returned.
pub fn build_network(mut doc: RawDocument, config: &PipelineConfig) -> NetworkResult<NetworkSummary> {
    let extract = ingest_with_repair(&mut doc, config.repair.as_ref())?;
    run_pipeline(&extract, config)
}

/// Ingest `doc`, repairing and retrying exactly once on missing metadata.
pub fn ingest_with_repair(doc: &mut RawDocument, repair: Option<&MetadataRepair>) -> IngestResult<Extract> {
    match (ingest(doc), repair) {
        (Err(e), Some(repair)) if e.is_missing_changeset() => {
            log::warn!("pipeline: {e}; repairing metadata and retrying");
            repair.apply(doc);
            ingest(doc)
        }
        (result, _) => result,
    }
}

/// Every phase after ingestion.
pub fn run_pipeline(extract: &Extract, config: &PipelineConfig) -> NetworkResult<NetworkSummary> {
    let mut graph = build_graph(extract)?;
    let original = graph.counts();

    annotate_lengths(&mut graph);
    let merges = simplify(&mut graph)?;
    let inference = infer_attributes(&mut graph);
    let parameters = parameterize(&mut graph, config.bpr);

    let simplified = graph.counts();
    let centroid = graph.centroid().ok_or(BuildError::EmptyGraph)?;
    log::info!(
        "pipeline: {} → {} nodes, {} → {} edges, centroid {centroid}",
        original.nodes,
        simplified.nodes,
        original.edges,
        simplified.edges
    );

    Ok(NetworkSummary {
        graph,
        original,
        simplified,
        centroid,
        simplify: merges,
        inference,
        parameters,
    })
}
