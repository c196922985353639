//! Nearest-node snapping.
//!
//! An R-tree (via `rstar`) over `[lon, lat]` of every road node.  Zone nodes
//! are left out so points always snap onto the road network.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use tn_core::{GeoPoint, NodeHandle, OsmNodeId};

use crate::graph::RoadGraph;

#[derive(Clone)]
struct NodeEntry {
    point:  [f64; 2], // [lon, lat]
    handle: NodeHandle,
    id:     OsmNodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in degrees.  Good enough to rank
    /// candidates inside one metro area.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlon = self.point[0] - point[0];
        let dlat = self.point[1] - point[1];
        dlon * dlon + dlat * dlat
    }
}

/// Spatial index over a graph's road nodes.  Rebuild after the graph
/// changes.
pub struct SpatialIndex {
    tree: RTree<NodeEntry>,
}

impl SpatialIndex {
    pub fn build(graph: &RoadGraph) -> Self {
        let entries: Vec<NodeEntry> = graph
            .nodes()
            .filter(|(_, n)| !n.zone)
            .map(|(handle, n)| NodeEntry { point: [n.pos.lon, n.pos.lat], handle, id: n.id })
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest road node to `pos`.  `None` only for an empty index.
    pub fn nearest(&self, pos: GeoPoint) -> Option<NodeHandle> {
        self.tree.nearest_neighbor(&[pos.lon, pos.lat]).map(|e| e.handle)
    }

    /// Map id of the nearest road node to `pos`.
    pub fn snap(&self, pos: GeoPoint) -> Option<OsmNodeId> {
        self.tree.nearest_neighbor(&[pos.lon, pos.lat]).map(|e| e.id)
    }

    /// Up to `k` nearest road nodes, closest first.
    pub fn k_nearest(&self, pos: GeoPoint, k: usize) -> Vec<NodeHandle> {
        self.tree
            .nearest_neighbor_iter(&[pos.lon, pos.lat])
            .take(k)
            .map(|e| e.handle)
            .collect()
    }
}
