//! Network Parameterizer: derive capacity, free-flow time and BPR
//! coefficients, and drop build-time tags.

use tn_core::lane_capacity_of;

use crate::graph::{BprCoefficients, Edge, RoadGraph};

/// Counts from [`parameterize`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterReport {
    pub edges:         usize,
    /// Edges whose speed never resolved; their free-flow time is infinite.
    pub infinite_time: usize,
    /// Edges with no road class or no lanes.
    pub zero_capacity: usize,
}

/// Write the assignment attributes of every edge and reset every node's
/// zone flag.
///
/// - capacity = per-lane capacity of the road class × lanes (`0` without a
///   class),
/// - free-flow time = length / speed in hours, `f64::INFINITY` while the
///   speed is unresolved,
/// - `bpr` on every edge.
///
/// The raw tag record and owner id are dropped.
pub fn parameterize(graph: &mut RoadGraph, bpr: BprCoefficients) -> ParameterReport {
    let mut report = ParameterReport::default();

    for edge in graph.edges_mut() {
        edge.capacity = capacity(edge);
        edge.free_flow_time = free_flow_time(edge);
        edge.bpr = bpr;
        edge.raw = None;
        edge.owner = None;

        report.edges += 1;
        if edge.free_flow_time.is_infinite() {
            report.infinite_time += 1;
        }
        if edge.capacity == 0.0 {
            report.zero_capacity += 1;
        }
    }
    for node in graph.nodes_mut() {
        node.zone = false;
    }

    if report.infinite_time > 0 {
        log::warn!(
            "parameterize: {} of {} edges have no speed limit, free-flow time set to infinity",
            report.infinite_time,
            report.edges
        );
    }
    log::info!("parameterize: {} edges", report.edges);
    report
}

/// Vehicles per hour.
pub fn capacity(edge: &Edge) -> f64 {
    f64::from(lane_capacity_of(edge.road_class)) * f64::from(edge.lanes)
}

/// Hours.
pub fn free_flow_time(edge: &Edge) -> f64 {
    match edge.max_speed {
        Some(mph) if mph > 0.0 => edge.length / mph,
        _ => f64::INFINITY,
    }
}
