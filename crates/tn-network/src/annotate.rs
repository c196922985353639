//! Geometry Annotator: edge length from endpoint coordinates.

use tn_core::{NodeHandle, WayId};

use crate::graph::{Edge, Node, RoadGraph};

/// Overwrite every edge's length with the WGS-84 geodesic distance between its
/// endpoints, in miles.  Zone connectors keep their zero length.
///
/// Returns the number of edges annotated.  With the `parallel` feature the
/// distances are computed on Rayon's global pool.
pub fn annotate_lengths(graph: &mut RoadGraph) -> usize {
    let (edges, nodes) = graph.edge_slots_with_nodes();

    #[cfg(feature = "parallel")]
    let annotated = {
        use rayon::prelude::*;
        edges
            .par_iter_mut()
            .filter_map(Option::as_mut)
            .filter(|e| e.way != WayId::CONNECTOR)
            .map(|e| e.length = span(nodes, e))
            .count()
    };

    #[cfg(not(feature = "parallel"))]
    let annotated = edges
        .iter_mut()
        .filter_map(Option::as_mut)
        .filter(|e| e.way != WayId::CONNECTOR)
        .map(|e| e.length = span(nodes, e))
        .count();

    log::debug!("annotate: {annotated} edge lengths computed");
    annotated
}

fn span(nodes: &[Option<Node>], edge: &Edge) -> f64 {
    let at = |h: NodeHandle| nodes.get(h.index()).and_then(Option::as_ref).map(|n| n.pos);
    match (at(edge.tail), at(edge.head)) {
        (Some(a), Some(b)) => a.distance_miles(b),
        _ => 0.0,
    }
}
