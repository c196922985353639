//! OSM PBF reader: enabled with the `pbf` Cargo feature.
//!
//! # Usage
//!
//! ```ignore
//! use std::path::Path;
//! use tn_osm::{ingest, read_osm_pbf};
//!
//! let doc = read_osm_pbf(Path::new("oakland.osm.pbf"))?;
//! let extract = ingest(&doc)?;
//! ```
//!
//! # Memory note
//!
//! Every node is buffered (ways reference nodes by id and the filter runs
//! later, in [`crate::ingest`]).  A metro-area extract is a few million
//! entries, i.e. a few hundred MB.  Relations are skipped.

use std::collections::HashMap;
use std::path::Path;

use chrono::DateTime;
use osmpbf::{Element, ElementReader, Info};

use tn_core::{OsmNodeId, OwnerId, WayId};

use crate::document::{EntityMeta, RawDocument, RawNode, RawWay};
use crate::{IngestError, IngestResult};

/// Read a PBF file into a [`RawDocument`].
///
/// # Errors
///
/// [`IngestError::MalformedDocument`] on any open or decode failure.
pub fn read_osm_pbf(path: &Path) -> IngestResult<RawDocument> {
    let reader = ElementReader::from_path(path)
        .map_err(|e| IngestError::MalformedDocument(e.to_string()))?;

    let mut doc = RawDocument::default();

    reader
        .for_each(|elem| match elem {
            Element::Node(n) => {
                doc.nodes.push(RawNode {
                    id:   OsmNodeId(n.id()),
                    lon:  n.lon(),
                    lat:  n.lat(),
                    meta: info_meta(&n.info()),
                });
            }
            Element::DenseNode(n) => {
                let meta = n
                    .info()
                    .map(|i| EntityMeta {
                        changeset: Some(i.changeset()),
                        timestamp: millis_to_iso(i.milli_timestamp()),
                    })
                    .unwrap_or_default();
                doc.nodes.push(RawNode {
                    id: OsmNodeId(n.id()),
                    lon: n.lon(),
                    lat: n.lat(),
                    meta,
                });
            }
            Element::Way(w) => {
                let info = w.info();
                // Collect tags eagerly so &str lifetimes don't escape the closure.
                let tags: HashMap<String, String> = w
                    .tags()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                doc.ways.push(RawWay {
                    id:    WayId(w.id()),
                    owner: info.uid().map(|uid| OwnerId(i64::from(uid))),
                    refs:  w.refs().map(OsmNodeId).collect(),
                    tags,
                    meta:  info_meta(&info),
                });
            }
            Element::Relation(_) => {}
        })
        .map_err(|e| IngestError::MalformedDocument(e.to_string()))?;

    log::debug!(
        "read OSM PBF: {} nodes, {} ways",
        doc.nodes.len(),
        doc.ways.len()
    );
    Ok(doc)
}

fn info_meta(info: &Info<'_>) -> EntityMeta {
    EntityMeta {
        changeset: info.changeset(),
        timestamp: info.milli_timestamp().and_then(millis_to_iso),
    }
}

fn millis_to_iso(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}
