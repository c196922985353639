//! Observed travel times from a third-party routing service.
//!
//! The service itself (HTTP client, credentials, departure times) lives
//! behind [`TravelTimeSource`]; this module only walks the graph and records
//! what comes back.

use std::fmt::Display;

use tn_core::{EdgeHandle, GeoPoint};
use tn_network::{ObservedTimes, RoadGraph};

/// Something that can estimate driving times between two points.
pub trait TravelTimeSource {
    type Error: Display;

    /// Free-flow and congested best-guess times in hours for a trip from
    /// `from` to `to`.
    fn travel_times(&mut self, from: GeoPoint, to: GeoPoint) -> Result<ObservedTimes, Self::Error>;
}

/// Counts from [`annotate_travel_times`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TravelReport {
    pub queried: usize,
    pub failed:  usize,
}

/// Query `source` once per edge and store the result on the edge.
///
/// A failed query is logged and stored as zero times with ratio `1`; it
/// never aborts the walk.
pub fn annotate_travel_times<S: TravelTimeSource>(graph: &mut RoadGraph, source: &mut S) -> TravelReport {
    let trips: Vec<(EdgeHandle, GeoPoint, GeoPoint)> = graph
        .edges()
        .filter_map(|(h, e)| Some((h, graph.pos(e.tail)?, graph.pos(e.head)?)))
        .collect();

    let mut report = TravelReport::default();
    for (h, from, to) in trips {
        report.queried += 1;
        let observed = match source.travel_times(from, to) {
            Ok(t) => ObservedTimes::new(t.free_flow, t.congested),
            Err(e) => {
                report.failed += 1;
                log::warn!("travel: query {from} → {to} failed: {e}");
                ObservedTimes::new(0.0, 0.0)
            }
        };
        if let Some(edge) = graph.edge_mut(h) {
            edge.observed = Some(observed);
        }
    }

    log::info!("travel: {} edges queried, {} failed", report.queried, report.failed);
    report
}
