//! Network-subsystem error types.
//!
//! Every phase after ingestion is expected to succeed on a weakly connected,
//! well-tagged graph.  The build and simplify errors below therefore name the
//! phase and the offending element so a defect can be traced; they are never
//! part of normal operation.

use thiserror::Error;

use tn_core::{NodeHandle, OsmNodeId};
use tn_osm::IngestError;

use crate::simplify::Phase;

/// Graph Builder failures.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build: no drivable ways survived ingestion")]
    EmptyGraph,

    #[error("build: {ways} ways kept but none yields an edge")]
    NoEdgesAfterFiltering { ways: usize },
}

/// Topology Simplifier failures.  Both indicate a defect.
#[derive(Debug, Error)]
pub enum SimplifyError {
    #[error("simplify {phase}: invariant violated at node {node}: {detail}")]
    InvariantViolation {
        phase:  Phase,
        node:   NodeHandle,
        detail: String,
    },

    #[error("simplify {phase}: no fixed point after {scans} scans")]
    NoFixedPoint { phase: Phase, scans: usize },
}

/// Errors produced by `tn-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Simplify(#[from] SimplifyError),

    #[error("zones: zone id {0} collides with an existing node")]
    ZoneIdCollision(OsmNodeId),

    #[error("zones: zone {zone} has no member nodes")]
    EmptyZone { zone: usize },

    #[error("zones: node {0} not found in network")]
    UnknownNode(OsmNodeId),
}

pub type BuildResult<T> = Result<T, BuildError>;
pub type SimplifyResult<T> = Result<T, SimplifyError>;
pub type NetworkResult<T> = Result<T, NetworkError>;
