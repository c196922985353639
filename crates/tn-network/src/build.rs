//! Graph Builder: expand kept ways into directed edges, then keep only the
//! largest weakly connected component.
//!
//! # Lane split
//!
//! Reserved public-service lanes are taken off the total first.
//!
//! | Way          | Forward                              | Backward                              |
//! |--------------|--------------------------------------|---------------------------------------|
//! | one-way      | `lanes - psv`                        | (none)                                |
//! | two-way      | `(lanes - psv) / 2`                  | `(lanes - psv) / 2`                   |
//! | with tags    | `lanes:forward - psv / 2`            | `lanes:backward - psv / 2`            |
//!
//! All subtractions saturate at zero; a zero lane count is later treated as
//! unknown by the inferencer.

use std::collections::VecDeque;

use tn_core::{NodeHandle, OsmNodeId};
use tn_osm::{Extract, WayRecord};

use crate::graph::{Edge, EdgeTags, RoadGraph};
use crate::{BuildError, BuildResult};

/// Build the directed road graph for `extract`.
///
/// Consecutive repeated references (`… 7, 7 …`) are skipped instead of
/// producing self-loops.  When two ways write the same `(tail, head)` pair the
/// later way wins.
///
/// # Errors
///
/// - [`BuildError::EmptyGraph`] if the extract has no kept ways.
/// - [`BuildError::NoEdgesAfterFiltering`] if no kept way yields an edge.
pub fn build_graph(extract: &Extract) -> BuildResult<RoadGraph> {
    if extract.ways.is_empty() {
        return Err(BuildError::EmptyGraph);
    }

    let edge_hint: usize = extract.ways.iter().map(|w| 2 * w.refs.len()).sum();
    let mut graph = RoadGraph::with_capacity(extract.coords.len().min(edge_hint), edge_hint);

    for way in &extract.ways {
        add_way(&mut graph, extract, way);
    }

    if graph.edge_count() == 0 {
        return Err(BuildError::NoEdgesAfterFiltering { ways: extract.ways.len() });
    }

    let before = graph.counts();
    let pruned = keep_largest_component(&mut graph);
    log::info!(
        "build: {} nodes, {} edges ({} of {} nodes outside the largest component pruned)",
        graph.node_count(),
        graph.edge_count(),
        pruned,
        before.nodes
    );

    Ok(graph)
}

/// Lane counts for the forward and backward directions of a way.
///
/// The backward value is meaningless for one-way ways.
pub fn split_lanes(way: &WayRecord) -> (u32, u32) {
    let t = &way.tags;
    let total = t.lanes.saturating_sub(t.lanes_psv);
    if t.oneway {
        return (total, 0);
    }
    let half_psv = t.lanes_psv / 2;
    let forward = t.lanes_forward.map_or(total / 2, |f| f.saturating_sub(half_psv));
    let backward = t.lanes_backward.map_or(total / 2, |b| b.saturating_sub(half_psv));
    (forward, backward)
}

fn add_way(graph: &mut RoadGraph, extract: &Extract, way: &WayRecord) {
    let (forward, backward) = split_lanes(way);
    let raw = EdgeTags {
        oneway:         way.tags.oneway,
        lanes_forward:  way.tags.lanes_forward,
        lanes_backward: way.tags.lanes_backward,
        lanes_psv:      way.tags.lanes_psv,
    };

    for pair in way.refs.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a == b {
            continue;
        }
        let (Some(ta), Some(tb)) = (node_for(graph, extract, a), node_for(graph, extract, b)) else {
            log::warn!("build: way {} skips segment {a}→{b} without coordinates", way.id);
            continue;
        };

        graph.upsert_edge(way_edge(way, raw, ta, tb, forward));
        if !way.tags.oneway {
            graph.upsert_edge(way_edge(way, raw, tb, ta, backward));
        }
    }
}

fn node_for(graph: &mut RoadGraph, extract: &Extract, id: OsmNodeId) -> Option<NodeHandle> {
    extract.coords.get(&id).map(|&pos| graph.add_node(id, pos))
}

fn way_edge(way: &WayRecord, raw: EdgeTags, tail: NodeHandle, head: NodeHandle, lanes: u32) -> Edge {
    Edge {
        owner:      way.owner,
        road_class: Some(way.tags.highway),
        name:       way.tags.name.clone(),
        raw:        Some(raw),
        max_speed:  way.tags.max_speed,
        lanes,
        ..Edge::new(tail, head, way.id)
    }
}

// ── Connectivity ──────────────────────────────────────────────────────────────

/// Weakly connected components, each listed in discovery order.
///
/// Components are ordered by their lowest node slot, so the result is
/// deterministic for a given graph.
pub fn weak_components(graph: &RoadGraph) -> Vec<Vec<NodeHandle>> {
    let slots = graph.node_handles().last().map_or(0, |h| h.index() + 1);
    let mut seen = vec![false; slots];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for start in graph.node_handles() {
        if seen[start.index()] {
            continue;
        }
        seen[start.index()] = true;
        queue.push_back(start);
        let mut members = Vec::new();

        while let Some(n) = queue.pop_front() {
            members.push(n);
            let outs = graph.out_edges(n).iter().filter_map(|&e| graph.edge(e)).map(|e| e.head);
            let ins = graph.in_edges(n).iter().filter_map(|&e| graph.edge(e)).map(|e| e.tail);
            for m in outs.chain(ins) {
                if !seen[m.index()] {
                    seen[m.index()] = true;
                    queue.push_back(m);
                }
            }
        }
        components.push(members);
    }
    components
}

/// `true` if every live node is reachable from every other, ignoring
/// direction.  An empty graph counts as connected.
pub fn is_weakly_connected(graph: &RoadGraph) -> bool {
    weak_components(graph).len() <= 1
}

/// Remove every node outside the largest weakly connected component.  Ties
/// go to the component found first.  Returns the number of nodes removed.
fn keep_largest_component(graph: &mut RoadGraph) -> usize {
    let mut components = weak_components(graph);
    if components.len() <= 1 {
        return 0;
    }

    let mut largest = 0;
    for (i, c) in components.iter().enumerate() {
        if c.len() > components[largest].len() {
            largest = i;
        }
    }
    components.swap_remove(largest);

    let mut removed = 0;
    for n in components.into_iter().flatten() {
        if graph.remove_node(n).is_some() {
            removed += 1;
        }
    }
    log::debug!("build: pruned {removed} nodes outside the largest component");
    removed
}
