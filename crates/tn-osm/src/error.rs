//! Ingestion error type.

use std::fmt;

use thiserror::Error;

use tn_core::WayId;

/// Which kind of map entity an error refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Way,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Node => "node",
            EntityKind::Way  => "way",
        })
    }
}

/// Errors produced while reading or ingesting a map document.
///
/// Only [`IngestError::MissingChangeset`] is recoverable: the caller may
/// stamp the document with [`crate::MetadataRepair`] and ingest once more.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("ingest: {kind} {id} has no changeset/timestamp metadata")]
    MissingChangeset { kind: EntityKind, id: i64 },

    #[error("ingest: malformed document: {0}")]
    MalformedDocument(String),

    #[error("ingest: way {way} has unsupported tag {key}={value:?}")]
    UnsupportedWayTag {
        way:   WayId,
        key:   &'static str,
        value: String,
    },

    #[error("ingest: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// `true` for the one failure that a metadata repair can fix.
    pub fn is_missing_changeset(&self) -> bool {
        matches!(self, IngestError::MissingChangeset { .. })
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
