//! Error types for tn-io.

use thiserror::Error;

use tn_core::OsmNodeId;

/// Errors that can occur while exchanging a network with files and external
/// tools.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A feature that does not describe a node or an edge of a network.
    #[error("geojson: feature {id}: {reason}")]
    InvalidFeature { id: String, reason: String },

    #[error("trip table: {0}")]
    TripTable(String),

    #[error("assignment: solver id {0} was never exported")]
    UnknownSolverNode(u32),

    #[error("assignment: no edge {tail}→{head} in network")]
    UnknownEdge { tail: OsmNodeId, head: OsmNodeId },

    /// The solver cannot take an infinite free-flow time.
    #[error("assignment: edge {tail}→{head} has no free-flow time (speed limit unresolved)")]
    UnresolvedSpeed { tail: OsmNodeId, head: OsmNodeId },

    #[error("assignment: solver `{program}` failed: {status}")]
    Solver { program: String, status: String },
}

impl IoError {
    pub(crate) fn feature(id: impl Into<String>, reason: impl Into<String>) -> Self {
        IoError::InvalidFeature { id: id.into(), reason: reason.into() }
    }
}

/// Alias for `Result<T, IoError>`.
pub type IoResult<T> = Result<T, IoError>;
