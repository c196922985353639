//! Metadata repair for extracts that ship without edit metadata.
//!
//! Some extract services (bbbike among them) omit `changeset` and
//! `timestamp` on every entity.  [`MetadataRepair::apply`] overwrites both
//! fields on every node and way with a synthetic stamp so the document can be
//! ingested.

use chrono::Utc;

use crate::document::{EntityMeta, RawDocument};

/// The synthetic stamp written onto every entity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetadataRepair {
    pub changeset: i64,
    /// ISO-8601 UTC, e.g. `2024-05-01T12:00:00Z`.
    pub timestamp: String,
}

impl MetadataRepair {
    pub fn new(changeset: i64, timestamp: impl Into<String>) -> Self {
        Self { changeset, timestamp: timestamp.into() }
    }

    /// Changeset `1`, stamped with the current UTC time.
    pub fn now() -> Self {
        Self::new(1, Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    /// Stamp every entity of `doc`.  Returns the number of entities touched.
    pub fn apply(&self, doc: &mut RawDocument) -> usize {
        let stamp = EntityMeta {
            changeset: Some(self.changeset),
            timestamp: Some(self.timestamp.clone()),
        };
        for node in &mut doc.nodes {
            node.meta = stamp.clone();
        }
        for way in &mut doc.ways {
            way.meta = stamp.clone();
        }
        let touched = doc.nodes.len() + doc.ways.len();
        log::info!("repair: stamped {touched} entities with changeset {}", self.changeset);
        touched
    }
}

impl Default for MetadataRepair {
    fn default() -> Self {
        Self::now()
    }
}
