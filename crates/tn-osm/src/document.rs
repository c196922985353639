//! Raw map document, as handed over by a reader.
//!
//! Nothing here is filtered or normalized yet: tags are the verbatim
//! key/value strings from the source, and metadata may be missing.

use std::collections::HashMap;

use tn_core::{OsmNodeId, OwnerId, WayId};

/// Edit metadata carried by every map entity.
///
/// Some extract services strip these fields; ingestion refuses such
/// documents until they are repaired.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityMeta {
    pub changeset: Option<i64>,
    pub timestamp: Option<String>,
}

impl EntityMeta {
    pub fn is_complete(&self) -> bool {
        self.changeset.is_some() && self.timestamp.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawNode {
    pub id:   OsmNodeId,
    pub lon:  f64,
    pub lat:  f64,
    pub meta: EntityMeta,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawWay {
    pub id:    WayId,
    /// Last editor, when the source records one.
    pub owner: Option<OwnerId>,
    /// Ordered node references.
    pub refs:  Vec<OsmNodeId>,
    pub tags:  HashMap<String, String>,
    pub meta:  EntityMeta,
}

impl RawWay {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// All nodes and ways of one map extract.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawDocument {
    pub nodes: Vec<RawNode>,
    pub ways:  Vec<RawWay>,
}
