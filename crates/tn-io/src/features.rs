//! GeoJSON encoding of a network.
//!
//! # Layout
//!
//! One `LineString` feature per edge, id `"tail,head"` (map ids), geometry
//! `[[tail lon, tail lat], [head lon, head lat]]`.  One `Point` feature per
//! node, numeric id, properties `{ "taz": bool }`.
//!
//! # Edge properties
//!
//! | Key          | Value                                                  |
//! |--------------|--------------------------------------------------------|
//! | `way`        | source way id (`0` for zone connectors)                |
//! | `highway`    | road class, `null` for connectors                      |
//! | `name`       | street name, `""` when absent                          |
//! | `maxspeed`   | mph, `null` while unresolved                           |
//! | `lanes`      | lanes in this direction                                |
//! | `length`     | miles                                                  |
//! | `capacity`   | vehicles per hour                                      |
//! | `fftime`     | free-flow hours, `null` when infinite                  |
//! | `b`, `power` | BPR coefficients                                       |
//!
//! Observed travel times add `ff_best_guess`, `am_best_guess` and
//! `api_ratio`; assignment results add `proj_ttime`, `new_flow`,
//! `fixed_flow`, `flow`, `fw_ratio` and `delta`.

use std::fs;
use std::path::Path;

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue, Value};
use serde_json::json;

use tn_core::{GeoPoint, OsmNodeId, RoadClass, WayId};
use tn_network::{BprCoefficients, Edge, LinkFlow, Node, ObservedTimes, RoadGraph};

use crate::{IoError, IoResult};

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Edge features (in [`RoadGraph::edges`] order) followed by node features.
pub fn to_feature_collection(graph: &RoadGraph) -> IoResult<FeatureCollection> {
    let mut features = Vec::with_capacity(graph.edge_count() + graph.node_count());
    for (_, edge) in graph.edges() {
        features.push(edge_feature(graph, edge)?);
    }
    for (_, node) in graph.nodes() {
        features.push(node_feature(node)?);
    }
    Ok(FeatureCollection { bbox: None, features, foreign_members: None })
}

pub fn to_geojson_string(graph: &RoadGraph) -> IoResult<String> {
    Ok(serde_json::to_string(&to_feature_collection(graph)?)?)
}

pub fn write_geojson(graph: &RoadGraph, path: &Path) -> IoResult<()> {
    fs::write(path, to_geojson_string(graph)?)?;
    Ok(())
}

fn edge_feature(graph: &RoadGraph, edge: &Edge) -> IoResult<Feature> {
    let endpoint = |h| {
        graph
            .node(h)
            .ok_or_else(|| IoError::feature(format!("{h}"), "edge endpoint is not a live node"))
    };
    let (tail, head) = (endpoint(edge.tail)?, endpoint(edge.head)?);

    let mut props = JsonObject::new();
    props.insert("way".into(), json!(edge.way.0));
    props.insert("highway".into(), json!(edge.road_class.map(RoadClass::as_str)));
    props.insert("name".into(), json!(edge.name.as_deref().unwrap_or("")));
    props.insert("maxspeed".into(), json!(edge.max_speed));
    props.insert("lanes".into(), json!(edge.lanes));
    props.insert("length".into(), json!(edge.length));
    props.insert("capacity".into(), json!(edge.capacity));
    props.insert("fftime".into(), finite_or_null(edge.free_flow_time));
    props.insert("b".into(), json!(edge.bpr.b));
    props.insert("power".into(), json!(edge.bpr.power));

    if let Some(obs) = edge.observed {
        props.insert("ff_best_guess".into(), json!(obs.free_flow));
        props.insert("am_best_guess".into(), json!(obs.congested));
        props.insert("api_ratio".into(), json!(obs.ratio));
    }
    if let Some(flow) = edge.flow {
        props.insert("proj_ttime".into(), json!(flow.proj_ttime));
        props.insert("new_flow".into(), json!(flow.new_flow));
        props.insert("fixed_flow".into(), json!(flow.fixed_flow));
        props.insert("flow".into(), json!(flow.flow));
        props.insert("fw_ratio".into(), json!(flow.fw_ratio));
        props.insert("delta".into(), finite_or_null(flow.delta));
    }

    let value = json!({
        "type": "Feature",
        "id": format!("{},{}", tail.id, head.id),
        "geometry": {
            "type": "LineString",
            "coordinates": [[tail.pos.lon, tail.pos.lat], [head.pos.lon, head.pos.lat]],
        },
        "properties": props,
    });
    Ok(Feature::from_json_value(value)?)
}

fn node_feature(node: &Node) -> IoResult<Feature> {
    let value = json!({
        "type": "Feature",
        "id": node.id.0,
        "geometry": { "type": "Point", "coordinates": [node.pos.lon, node.pos.lat] },
        "properties": { "taz": node.zone },
    });
    Ok(Feature::from_json_value(value)?)
}

fn finite_or_null(v: f64) -> JsonValue {
    if v.is_finite() { json!(v) } else { JsonValue::Null }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Rebuild a graph from [`to_feature_collection`] output.
///
/// Node features may come before or after the edges that use them.
/// Features with other geometries are skipped.
///
/// # Errors
///
/// [`IoError::InvalidFeature`] for a bad id, malformed coordinates, or an
/// edge whose endpoint has no node feature.
pub fn from_feature_collection(fc: &FeatureCollection) -> IoResult<RoadGraph> {
    let mut graph = RoadGraph::with_capacity(fc.features.len() / 3, fc.features.len());

    for f in &fc.features {
        if let Some(Value::Point(coords)) = f.geometry.as_ref().map(|g| &g.value) {
            decode_node(&mut graph, f, coords)?;
        }
    }
    let mut skipped = 0usize;
    for f in &fc.features {
        match f.geometry.as_ref().map(|g| &g.value) {
            Some(Value::LineString(_)) => decode_edge(&mut graph, f)?,
            Some(Value::Point(_)) => {}
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!("geojson: skipped {skipped} features that are neither nodes nor edges");
    }

    log::debug!(
        "geojson: decoded {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

pub fn from_geojson_str(s: &str) -> IoResult<RoadGraph> {
    match s.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => from_feature_collection(&fc),
        _ => Err(IoError::feature("document", "expected a FeatureCollection")),
    }
}

pub fn read_geojson(path: &Path) -> IoResult<RoadGraph> {
    from_geojson_str(&fs::read_to_string(path)?)
}

fn decode_node(graph: &mut RoadGraph, f: &Feature, coords: &[f64]) -> IoResult<()> {
    let id = match &f.id {
        Some(Id::Number(n)) => n
            .as_i64()
            .map(OsmNodeId)
            .ok_or_else(|| IoError::feature(n.to_string(), "node id is not an integer"))?,
        Some(Id::String(s)) => s
            .parse::<OsmNodeId>()
            .map_err(|e| IoError::feature(s.clone(), e.to_string()))?,
        None => return Err(IoError::feature("?", "node feature has no id")),
    };
    let [lon, lat] = coords else {
        return Err(IoError::feature(id.to_string(), "point must have two coordinates"));
    };

    let h = graph.add_node(id, GeoPoint::new(*lon, *lat));
    if let Some(node) = graph.node_mut(h) {
        node.zone = f.property("taz").and_then(JsonValue::as_bool).unwrap_or(false);
    }
    Ok(())
}

fn decode_edge(graph: &mut RoadGraph, f: &Feature) -> IoResult<()> {
    let Some(Id::String(id)) = &f.id else {
        return Err(IoError::feature("?", "edge feature needs a \"tail,head\" id"));
    };
    let (tail, head) = id
        .split_once(',')
        .ok_or_else(|| IoError::feature(id.clone(), "edge id is not \"tail,head\""))?;
    let endpoint = |s: &str| -> IoResult<_> {
        let node = s.parse::<OsmNodeId>().map_err(|e| IoError::feature(id.clone(), e.to_string()))?;
        graph
            .handle_of(node)
            .ok_or_else(|| IoError::feature(id.clone(), format!("no node feature for {node}")))
    };
    let (tail, head) = (endpoint(tail)?, endpoint(head)?);

    let num = |key: &str| f.property(key).and_then(JsonValue::as_f64);

    let observed = match (num("ff_best_guess"), num("am_best_guess")) {
        (Some(ff), Some(am)) => {
            let mut obs = ObservedTimes::new(ff, am);
            if let Some(ratio) = num("api_ratio") {
                obs.ratio = ratio;
            }
            Some(obs)
        }
        _ => None,
    };
    let flow = num("flow").map(|total| LinkFlow {
        proj_ttime: num("proj_ttime").unwrap_or(0.0),
        new_flow:   num("new_flow").unwrap_or(0.0),
        fixed_flow: num("fixed_flow").unwrap_or(0.0),
        flow:       total,
        fw_ratio:   num("fw_ratio").unwrap_or(1.0),
        delta:      num("delta").unwrap_or(f64::INFINITY),
    });

    let lanes = match f.property("lanes") {
        None | Some(JsonValue::Null) => 0,
        Some(v) => v
            .as_u64()
            .and_then(|l| u32::try_from(l).ok())
            .ok_or_else(|| IoError::feature(id.clone(), format!("lanes {v} is not a lane count")))?,
    };

    let edge = Edge {
        road_class:     f.property("highway").and_then(JsonValue::as_str).and_then(RoadClass::from_highway),
        name:           f
            .property("name")
            .and_then(JsonValue::as_str)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        max_speed:      num("maxspeed"),
        lanes,
        length:         num("length").unwrap_or(0.0),
        capacity:       num("capacity").unwrap_or(0.0),
        free_flow_time: num("fftime").unwrap_or(f64::INFINITY),
        bpr:            BprCoefficients {
            b:     num("b").unwrap_or(BprCoefficients::DEFAULT.b),
            power: num("power").unwrap_or(BprCoefficients::DEFAULT.power),
        },
        observed,
        flow,
        ..Edge::new(tail, head, WayId(f.property("way").and_then(JsonValue::as_i64).unwrap_or(0)))
    };
    graph.upsert_edge(edge);
    Ok(())
}
