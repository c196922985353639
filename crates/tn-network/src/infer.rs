//! Attribute Inferencer: fill missing speed limits and lane counts from
//! neighbouring edges.
//!
//! Both passes share [`propagate`].  An edge's neighbourhood is the in- and
//! out-edges of both its endpoints; its own reverse edge is seen twice
//! (once at each end) and counts twice.  The estimate is the median of the
//! known neighbour values, written immediately so later edges in the same
//! scan already see it.  Scans repeat until one resolves nothing.
//!
//! Edges whose neighbourhood never reaches a known value stay unresolved
//! (`None` speed, `0` lanes).  That is a terminal state, not an error.

use tn_core::{max_lanes_of, EdgeHandle};

use crate::graph::{Edge, RoadGraph};

// ── Reports ───────────────────────────────────────────────────────────────────

/// Outcome of one propagation pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Propagation {
    /// Scans run, including the final one that resolved nothing.
    pub scans:      usize,
    pub resolved:   usize,
    /// Edges still unknown at the fixed point.
    pub unresolved: usize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InferenceReport {
    pub speed: Propagation,
    pub lanes: Propagation,
}

// ── Propagated attributes ─────────────────────────────────────────────────────

/// An edge attribute that may be unknown and can be estimated from a
/// neighbour median.
pub trait Propagated {
    const NAME: &'static str;

    /// The known value, or `None` while unresolved.
    fn known(edge: &Edge) -> Option<f64>;

    /// Write an estimate.  The edge may still be unknown afterwards.
    fn store(edge: &mut Edge, estimate: f64);
}

/// Speed limit in mph; unknown when absent.
pub struct Speed;

impl Propagated for Speed {
    const NAME: &'static str = "speed";

    fn known(edge: &Edge) -> Option<f64> {
        edge.max_speed.filter(|v| *v > 0.0)
    }

    fn store(edge: &mut Edge, estimate: f64) {
        edge.max_speed = Some(estimate);
    }
}

/// Lanes in the edge's direction; unknown when zero.
///
/// Estimates are floored and clamped to the one-way maximum of the edge's
/// road class.  An edge without a road class clamps to zero and so stays
/// unknown.
pub struct Lanes;

impl Propagated for Lanes {
    const NAME: &'static str = "lanes";

    fn known(edge: &Edge) -> Option<f64> {
        (edge.lanes > 0).then(|| f64::from(edge.lanes))
    }

    fn store(edge: &mut Edge, estimate: f64) {
        let lanes = estimate.floor().max(0.0) as u32;
        edge.lanes = lanes.min(max_lanes_of(edge.road_class));
    }
}

// ── Passes ────────────────────────────────────────────────────────────────────

/// Speed first, then lanes.
pub fn infer_attributes(graph: &mut RoadGraph) -> InferenceReport {
    let speed = infer_speeds(graph);
    let lanes = infer_lanes(graph);
    InferenceReport { speed, lanes }
}

pub fn infer_speeds(graph: &mut RoadGraph) -> Propagation {
    propagate::<Speed>(graph)
}

pub fn infer_lanes(graph: &mut RoadGraph) -> Propagation {
    propagate::<Lanes>(graph)
}

/// Resolve `A` to a fixed point.
///
/// Terminates because a resolved edge is never made unknown again and every
/// scan but the last resolves at least one edge.
pub fn propagate<A: Propagated>(graph: &mut RoadGraph) -> Propagation {
    let order: Vec<EdgeHandle> = graph.edge_handles().collect();
    let mut report = Propagation::default();
    let mut values = Vec::new();

    loop {
        report.scans += 1;
        let mut newly = 0;

        for &h in &order {
            let Some(edge) = graph.edge(h) else { continue };
            if A::known(edge).is_some() {
                continue;
            }
            neighbour_values::<A>(graph, edge, &mut values);
            let Some(estimate) = median(&mut values) else { continue };

            if let Some(edge) = graph.edge_mut(h) {
                A::store(edge, estimate);
                if A::known(edge).is_some() {
                    newly += 1;
                }
            }
        }

        log::debug!("infer {}: scan {} resolved {newly} edges", A::NAME, report.scans);
        report.resolved += newly;
        if newly == 0 {
            break;
        }
    }

    report.unresolved = order
        .iter()
        .filter_map(|&h| graph.edge(h))
        .filter(|e| A::known(e).is_none())
        .count();
    if report.unresolved > 0 {
        log::warn!("infer {}: {} edges left unresolved", A::NAME, report.unresolved);
    }
    log::info!(
        "infer {}: {} resolved in {} scans",
        A::NAME,
        report.resolved,
        report.scans
    );
    report
}

fn neighbour_values<A: Propagated>(graph: &RoadGraph, edge: &Edge, out: &mut Vec<f64>) {
    out.clear();
    let around = [
        graph.in_edges(edge.tail),
        graph.out_edges(edge.tail),
        graph.in_edges(edge.head),
        graph.out_edges(edge.head),
    ];
    out.extend(
        around
            .into_iter()
            .flatten()
            .filter_map(|&h| graph.edge(h))
            .filter_map(A::known),
    );
}

/// Median of `values`; the mean of the two middle values for an even count.
/// `None` when empty.  Sorts `values` in place.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}
