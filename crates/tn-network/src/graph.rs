//! Arena-backed directed road graph.
//!
//! # Data layout
//!
//! Nodes and edges live in two slot vectors addressed by [`NodeHandle`] and
//! [`EdgeHandle`].  Removing an element empties its slot; handles are never
//! reused or renumbered, so a handle collected before a mutation is either
//! still valid or visibly gone (`None`).
//!
//! Per-node adjacency lists (`out_adj`, `in_adj`) keep edges in insertion
//! order, and iteration over nodes follows slot order.  Every scan in the
//! pipeline therefore visits the graph in the same deterministic order the
//! map document was read in.
//!
//! At most one edge exists per ordered `(tail, head)` pair: writing a second
//! edge for the same pair replaces the first in place.

use rustc_hash::FxHashMap;

use tn_core::{EdgeHandle, GeoPoint, NodeHandle, OsmNodeId, OwnerId, RoadClass, WayId};

// ── Node ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Source map id (or synthetic id for zone nodes).
    pub id:   OsmNodeId,
    pub pos:  GeoPoint,
    /// `true` only for synthetic zone (TAZ) nodes.
    pub zone: bool,
}

// ── Edge attributes ───────────────────────────────────────────────────────────

/// Descriptive tags from the source way that only matter while the graph is
/// being built and simplified.  Dropped by the parameterizer.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EdgeTags {
    pub oneway:         bool,
    pub lanes_forward:  Option<u32>,
    pub lanes_backward: Option<u32>,
    pub lanes_psv:      u32,
}

/// Coefficients of the BPR congestion function
/// `t = t0 · (1 + b · (v/c)^power)`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BprCoefficients {
    pub b:     f64,
    pub power: f64,
}

impl BprCoefficients {
    pub const DEFAULT: BprCoefficients = BprCoefficients { b: 0.7, power: 0.4 };
}

impl Default for BprCoefficients {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Travel times observed by a third-party service, in hours.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ObservedTimes {
    /// Free-flow (off-peak) best guess.
    pub free_flow: f64,
    /// Congested (peak) best guess.
    pub congested: f64,
    /// `congested / free_flow` when both are positive, otherwise `1`.
    pub ratio:     f64,
}

impl ObservedTimes {
    pub fn new(free_flow: f64, congested: f64) -> Self {
        let ratio = if free_flow > 0.0 && congested > 0.0 {
            congested / free_flow
        } else {
            1.0
        };
        Self { free_flow, congested, ratio }
    }
}

/// Per-edge output of the external equilibrium solver.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LinkFlow {
    /// Projected travel time, hours.
    pub proj_ttime: f64,
    /// Assigned flow, veh/hr.
    pub new_flow:   f64,
    pub fixed_flow: f64,
    /// `new_flow + fixed_flow`.
    pub flow:       f64,
    /// Projected time over the observed free-flow time, floored at 1.
    pub fw_ratio:   f64,
    /// Volume over capacity.
    pub delta:      f64,
}

// ── Edge ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub tail:  NodeHandle,
    pub head:  NodeHandle,
    /// Source way (kept through merges, see the simplifier).
    pub way:   WayId,
    pub owner: Option<OwnerId>,

    pub road_class: Option<RoadClass>,
    pub name:       Option<String>,
    /// Raw descriptive tags; `None` once flattened.
    pub raw:        Option<EdgeTags>,

    /// Speed limit in mph; `None` while unresolved.
    pub max_speed: Option<f64>,
    /// Lanes in this direction; `0` while unresolved.
    pub lanes:     u32,
    /// Miles.
    pub length:    f64,

    /// Vehicles per hour.
    pub capacity:       f64,
    /// Hours; infinite when the speed limit never resolved.
    pub free_flow_time: f64,
    pub bpr:            BprCoefficients,

    pub observed: Option<ObservedTimes>,
    pub flow:     Option<LinkFlow>,
}

impl Edge {
    /// A bare edge with every attribute unset.
    pub fn new(tail: NodeHandle, head: NodeHandle, way: WayId) -> Self {
        Self {
            tail,
            head,
            way,
            owner:          None,
            road_class:     None,
            name:           None,
            raw:            None,
            max_speed:      None,
            lanes:          0,
            length:         0.0,
            capacity:       0.0,
            free_flow_time: 0.0,
            bpr:            BprCoefficients::DEFAULT,
            observed:       None,
            flow:           None,
        }
    }

    /// `true` if the source way was tagged `oneway=yes`.
    pub fn is_oneway(&self) -> bool {
        self.raw.is_some_and(|t| t.oneway)
    }

    /// Name, only if present and non-empty.
    pub fn nonempty_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

// ── Counts ────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphCounts {
    pub nodes: usize,
    pub edges: usize,
}

// ── RoadGraph ─────────────────────────────────────────────────────────────────

/// Directed road graph with stable handles.
#[derive(Clone, Debug, Default)]
pub struct RoadGraph {
    nodes:   Vec<Option<Node>>,
    edges:   Vec<Option<Edge>>,
    out_adj: Vec<Vec<EdgeHandle>>,
    in_adj:  Vec<Vec<EdgeHandle>>,
    by_id:   FxHashMap<OsmNodeId, NodeHandle>,
    by_pair: FxHashMap<(NodeHandle, NodeHandle), EdgeHandle>,
    live_nodes: usize,
    live_edges: usize,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:   Vec::with_capacity(nodes),
            edges:   Vec::with_capacity(edges),
            out_adj: Vec::with_capacity(nodes),
            in_adj:  Vec::with_capacity(nodes),
            ..Self::default()
        }
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    pub fn is_empty(&self) -> bool {
        self.live_nodes == 0
    }

    pub fn counts(&self) -> GraphCounts {
        GraphCounts { nodes: self.live_nodes, edges: self.live_edges }
    }

    // ── Nodes ─────────────────────────────────────────────────────────────

    /// Insert a node, or return the existing handle if `id` is already
    /// present (its position is left unchanged).
    pub fn add_node(&mut self, id: OsmNodeId, pos: GeoPoint) -> NodeHandle {
        if let Some(&h) = self.by_id.get(&id) {
            return h;
        }
        let h = NodeHandle(self.nodes.len() as u32);
        self.nodes.push(Some(Node { id, pos, zone: false }));
        self.out_adj.push(Vec::new());
        self.in_adj.push(Vec::new());
        self.by_id.insert(id, h);
        self.live_nodes += 1;
        h
    }

    pub fn node(&self, h: NodeHandle) -> Option<&Node> {
        self.nodes.get(h.index()).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, h: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(h.index()).and_then(Option::as_mut)
    }

    pub fn handle_of(&self, id: OsmNodeId) -> Option<NodeHandle> {
        self.by_id.get(&id).copied()
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, h: NodeHandle) -> Option<Node> {
        let node = self.nodes.get_mut(h.index())?.take()?;
        let incident: Vec<EdgeHandle> = self.out_adj[h.index()]
            .iter()
            .chain(self.in_adj[h.index()].iter())
            .copied()
            .collect();
        for e in incident {
            self.remove_edge(e);
        }
        self.by_id.remove(&node.id);
        self.live_nodes -= 1;
        Some(node)
    }

    /// Live node handles in slot (insertion) order.
    pub fn node_handles(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(i, _)| NodeHandle(i as u32))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeHandle(i as u32), n)))
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> + '_ {
        self.nodes.iter_mut().flatten()
    }

    /// Position of a live node.
    pub fn pos(&self, h: NodeHandle) -> Option<GeoPoint> {
        self.node(h).map(|n| n.pos)
    }

    /// Mean longitude/latitude over all live nodes.
    pub fn centroid(&self) -> Option<GeoPoint> {
        GeoPoint::mean(self.nodes().map(|(_, n)| n.pos))
    }

    // ── Edges ─────────────────────────────────────────────────────────────

    /// Insert `edge`, or overwrite the existing edge with the same
    /// `(tail, head)` pair.  The overwritten edge keeps its handle and its
    /// position in both adjacency lists.
    ///
    /// # Panics
    /// If either endpoint is not a live node.
    pub fn upsert_edge(&mut self, edge: Edge) -> EdgeHandle {
        let (tail, head) = (edge.tail, edge.head);
        assert!(
            self.node(tail).is_some() && self.node(head).is_some(),
            "edge {tail}→{head} touches a dead node"
        );
        if let Some(&h) = self.by_pair.get(&(tail, head)) {
            self.edges[h.index()] = Some(edge);
            return h;
        }
        let h = EdgeHandle(self.edges.len() as u32);
        self.edges.push(Some(edge));
        self.out_adj[tail.index()].push(h);
        self.in_adj[head.index()].push(h);
        self.by_pair.insert((tail, head), h);
        self.live_edges += 1;
        h
    }

    pub fn remove_edge(&mut self, h: EdgeHandle) -> Option<Edge> {
        let edge = self.edges.get_mut(h.index())?.take()?;
        self.out_adj[edge.tail.index()].retain(|&e| e != h);
        self.in_adj[edge.head.index()].retain(|&e| e != h);
        self.by_pair.remove(&(edge.tail, edge.head));
        self.live_edges -= 1;
        Some(edge)
    }

    pub fn edge(&self, h: EdgeHandle) -> Option<&Edge> {
        self.edges.get(h.index()).and_then(Option::as_ref)
    }

    pub fn edge_mut(&mut self, h: EdgeHandle) -> Option<&mut Edge> {
        self.edges.get_mut(h.index()).and_then(Option::as_mut)
    }

    pub fn find_edge(&self, tail: NodeHandle, head: NodeHandle) -> Option<EdgeHandle> {
        self.by_pair.get(&(tail, head)).copied()
    }

    /// Outgoing edges of `n`, in insertion order.  Empty for dead nodes.
    pub fn out_edges(&self, n: NodeHandle) -> &[EdgeHandle] {
        self.out_adj.get(n.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming edges of `n`, in insertion order.  Empty for dead nodes.
    pub fn in_edges(&self, n: NodeHandle) -> &[EdgeHandle] {
        self.in_adj.get(n.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Live edge handles grouped by tail node (slot order), then by
    /// insertion order within each tail.
    pub fn edge_handles(&self) -> impl Iterator<Item = EdgeHandle> + '_ {
        self.node_handles()
            .flat_map(move |n| self.out_adj[n.index()].iter().copied())
    }

    /// Live edges in [`edge_handles`](Self::edge_handles) order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeHandle, &Edge)> + '_ {
        self.edge_handles().filter_map(move |h| self.edge(h).map(|e| (h, e)))
    }

    /// Every live edge, in slot order.
    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> + '_ {
        self.edges.iter_mut().flatten()
    }

    /// Split borrow used by the annotator: mutable edge slots alongside
    /// read-only node slots.
    pub(crate) fn edge_slots_with_nodes(&mut self) -> (&mut [Option<Edge>], &[Option<Node>]) {
        (&mut self.edges, &self.nodes)
    }
}
