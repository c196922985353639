//! Way filtering and tag normalization.
//!
//! # What is kept
//!
//! A way survives iff its `highway` tag is one of the arterial/collector
//! classes (see [`RoadClass::from_highway`]) and `access` is not `private`.
//! Everything else (residential streets, service roads, footways, private
//! driveways) is dropped here and never reaches the graph.
//!
//! # Normalization
//!
//! | Tag                                | Result                                         |
//! |------------------------------------|------------------------------------------------|
//! | `highway`                          | `RoadClass`, `_link` folded into the parent    |
//! | `maxspeed`                         | mph (km/h, knots converted), else `None`       |
//! | `lanes`                            | integer, `0` when absent or unparsable         |
//! | `lanes:psv/forward/backward`       | integer; present-but-unparsable is an error   |
//! | `oneway`                           | `true` only for `yes`                          |
//! | `name`                             | `None` when absent or empty                    |

use std::collections::HashMap;

use tn_core::{GeoPoint, OsmNodeId, OwnerId, RoadClass, WayId};

use crate::document::{RawDocument, RawWay};
use crate::{EntityKind, IngestError, IngestResult};

// ── Output types ──────────────────────────────────────────────────────────────

/// Normalized descriptive tags of a kept way.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WayTags {
    pub highway:        RoadClass,
    pub name:           Option<String>,
    pub oneway:         bool,
    /// Posted speed limit in mph.
    pub max_speed:      Option<f64>,
    /// Total lanes over both directions; `0` means unknown.
    pub lanes:          u32,
    pub lanes_forward:  Option<u32>,
    pub lanes_backward: Option<u32>,
    /// Lanes reserved for public-service vehicles.
    pub lanes_psv:      u32,
}

/// A kept way, ready for graph expansion.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WayRecord {
    pub id:    WayId,
    pub owner: Option<OwnerId>,
    pub refs:  Vec<OsmNodeId>,
    pub tags:  WayTags,
}

/// The result of ingestion: coordinates for every node plus the kept ways.
#[derive(Clone, Debug, Default)]
pub struct Extract {
    pub coords:       HashMap<OsmNodeId, GeoPoint>,
    pub ways:         Vec<WayRecord>,
    /// Ways rejected by the highway/access filter.
    pub dropped_ways: usize,
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Filter and normalize a raw document.
///
/// # Errors
///
/// - [`IngestError::MissingChangeset`] if any node or way lacks
///   changeset/timestamp metadata.  Checked before anything else so a
///   repaired document can be ingested from scratch.
/// - [`IngestError::UnsupportedWayTag`] if a kept way carries a non-integer
///   `lanes:psv`, `lanes:forward`, or `lanes:backward`.
/// - [`IngestError::MalformedDocument`] if a kept way references a node the
///   document does not contain.
pub fn ingest(doc: &RawDocument) -> IngestResult<Extract> {
    check_metadata(doc)?;

    let coords: HashMap<OsmNodeId, GeoPoint> = doc
        .nodes
        .iter()
        .map(|n| (n.id, GeoPoint::new(n.lon, n.lat)))
        .collect();

    let mut ways = Vec::new();
    let mut dropped_ways = 0usize;

    for way in &doc.ways {
        let Some(highway) = keep_way(way) else {
            dropped_ways += 1;
            continue;
        };

        if let Some(missing) = way.refs.iter().find(|r| !coords.contains_key(*r)) {
            return Err(IngestError::MalformedDocument(format!(
                "way {} references unknown node {missing}",
                way.id
            )));
        }

        ways.push(WayRecord {
            id:    way.id,
            owner: way.owner,
            refs:  way.refs.clone(),
            tags:  normalize_tags(way, highway)?,
        });
    }

    log::info!(
        "ingest: {} nodes, {} ways kept, {} ways dropped",
        coords.len(),
        ways.len(),
        dropped_ways
    );

    Ok(Extract { coords, ways, dropped_ways })
}

// ── Filtering ─────────────────────────────────────────────────────────────────

fn check_metadata(doc: &RawDocument) -> IngestResult<()> {
    if let Some(n) = doc.nodes.iter().find(|n| !n.meta.is_complete()) {
        return Err(IngestError::MissingChangeset { kind: EntityKind::Node, id: n.id.0 });
    }
    if let Some(w) = doc.ways.iter().find(|w| !w.meta.is_complete()) {
        return Err(IngestError::MissingChangeset { kind: EntityKind::Way, id: w.id.0 });
    }
    Ok(())
}

/// Return the way's road class if it passes the highway/access filter.
fn keep_way(way: &RawWay) -> Option<RoadClass> {
    if way.tag("access") == Some("private") {
        return None;
    }
    way.tag("highway").and_then(RoadClass::from_highway)
}

// ── Tag normalization ─────────────────────────────────────────────────────────

fn normalize_tags(way: &RawWay, highway: RoadClass) -> IngestResult<WayTags> {
    Ok(WayTags {
        highway,
        name:           way.tag("name").filter(|n| !n.trim().is_empty()).map(str::to_string),
        oneway:         way.tag("oneway") == Some("yes"),
        max_speed:      way.tag("maxspeed").and_then(parse_maxspeed),
        lanes:          way.tag("lanes").and_then(|v| v.trim().parse().ok()).unwrap_or(0),
        lanes_forward:  strict_count(way, "lanes:forward")?,
        lanes_backward: strict_count(way, "lanes:backward")?,
        lanes_psv:      strict_count(way, "lanes:psv")?.unwrap_or(0),
    })
}

/// Parse a `maxspeed` value in mph.
///
/// A bare number is already mph (`"35"`).  A unit suffix, with or without a
/// space, is converted: `mph`, `km/h` (also `kmh`, `kph`) and `knots`.
/// Anything else (`"signals"`, `""`, `"50 furlongs"`) yields `None` rather
/// than a zero speed.
pub fn parse_maxspeed(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let value = number.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let factor = match unit.trim() {
        "" | "mph" => 1.0,
        "km/h" | "kmh" | "kph" => MPH_PER_KMH,
        "knots" => MPH_PER_KNOT,
        _ => return None,
    };
    Some(value * factor)
}

const MPH_PER_KMH: f64 = 0.621_371;
const MPH_PER_KNOT: f64 = 1.150_779;

/// Integer lane-count tag that must parse when present.
///
/// An empty value counts as absent.
fn strict_count(way: &RawWay, key: &'static str) -> IngestResult<Option<u32>> {
    match way.tag(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse::<u32>().map(Some).map_err(|_| IngestError::UnsupportedWayTag {
            way:   way.id,
            key,
            value: v.to_string(),
        }),
    }
}
