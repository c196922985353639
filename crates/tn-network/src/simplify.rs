//! Topology Simplifier: contract pass-through nodes into longer edges.
//!
//! # Phases
//!
//! [`Phase::Conservative`] only joins edges of the same source way.
//! [`Phase::NameBased`] then joins edges across way boundaries, using street
//! names to recognise a continuing two-way road and the road-class rank to
//! decide which identity the merged edge carries.
//!
//! Each phase repeats full scans until one removes no node.  A name-based
//! merge keeps the in-edge's way id, which can hand the conservative phase
//! new work, so the two phases alternate in rounds until a whole round
//! removes nothing.  On most inputs the second round is empty.  A scan visits
//! the nodes that were live when it started, in slot order.  Edge merges are
//! written as soon as a node matches, so later nodes in the same scan see the
//! merged edges; the contracted nodes themselves are only deleted when the
//! scan finishes.
//!
//! # Patterns
//!
//! ```text
//!   one-way         A ──▶ B ──▶ C          ⇒   A ──▶ C
//!   two-way         A ◀─▶ B ◀─▶ C          ⇒   A ◀─▶ C
//! ```
//!
//! A node is never contracted when
//! - it is a zone node,
//! - the merge would close a turnaround (`A == C`),
//! - or the graph already holds an `A → C` (resp. `C → A`) edge, since the
//!   merged edge would overwrite a parallel road.
//!
//! In the two-way pattern the two in-edge tails must be exactly the two
//! out-edge heads.  Merged lengths are always the exact sum of the two
//! constituents.

use std::fmt;

use tn_core::{rank_of, EdgeHandle, NodeHandle};

use crate::graph::{Edge, EdgeTags, RoadGraph};
use crate::{SimplifyError, SimplifyResult};

// ── Reports ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Same source way required on both sides.
    Conservative,
    /// Street names and road-class rank decide.
    NameBased,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Conservative => f.write_str("phase 1 (same way)"),
            Phase::NameBased    => f.write_str("phase 2 (by name)"),
        }
    }
}

/// Outcome of one phase.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseReport {
    pub phase:    Phase,
    /// Scans run, including the final one that removed nothing.
    pub scans:    usize,
    /// Nodes removed by each scan, in order.
    pub per_scan: Vec<usize>,
}

impl PhaseReport {
    fn new(phase: Phase) -> Self {
        Self { phase, scans: 0, per_scan: Vec::new() }
    }

    pub fn removed(&self) -> usize {
        self.per_scan.iter().sum()
    }

    fn absorb(&mut self, other: PhaseReport) {
        self.scans += other.scans;
        self.per_scan.extend(other.per_scan);
    }
}

/// Both phases, summed over every round.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplifyReport {
    /// Rounds run, including the final one that removed nothing.
    pub rounds:       usize,
    pub conservative: PhaseReport,
    pub name_based:   PhaseReport,
}

impl SimplifyReport {
    pub fn removed(&self) -> usize {
        self.conservative.removed() + self.name_based.removed()
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Alternate the two phases until a round of both removes nothing.
///
/// Must run after [`annotate_lengths`](crate::annotate_lengths) and before
/// inference and parameterization.  Running it again on its own output
/// removes nothing.
///
/// # Errors
///
/// [`SimplifyError`] only on an internal defect; the graph should be
/// discarded in that case.
pub fn simplify(graph: &mut RoadGraph) -> SimplifyResult<SimplifyReport> {
    let mut report = SimplifyReport {
        rounds:       0,
        conservative: PhaseReport::new(Phase::Conservative),
        name_based:   PhaseReport::new(Phase::NameBased),
    };
    // Every productive round removes at least one node.
    let bound = graph.node_count() + 1;

    loop {
        if report.rounds >= bound {
            return Err(SimplifyError::NoFixedPoint {
                phase: Phase::NameBased,
                scans: report.conservative.scans + report.name_based.scans,
            });
        }
        report.rounds += 1;
        let conservative = run_phase(graph, Phase::Conservative)?;
        let name_based = run_phase(graph, Phase::NameBased)?;
        let removed = conservative.removed() + name_based.removed();
        report.conservative.absorb(conservative);
        report.name_based.absorb(name_based);

        log::debug!("simplify: round {} removed {removed} nodes", report.rounds);
        if removed == 0 {
            break;
        }
    }

    log::info!(
        "simplify: removed {} + {} nodes in {} rounds, {} nodes and {} edges remain",
        report.conservative.removed(),
        report.name_based.removed(),
        report.rounds,
        graph.node_count(),
        graph.edge_count()
    );
    Ok(report)
}

/// Scan `graph` with `phase` until a scan removes no node.
///
/// Every productive scan removes at least one node, so more than
/// `node_count + 1` scans means the loop is not converging.
pub fn run_phase(graph: &mut RoadGraph, phase: Phase) -> SimplifyResult<PhaseReport> {
    let bound = graph.node_count() + 1;
    let mut per_scan = Vec::new();

    loop {
        if per_scan.len() >= bound {
            return Err(SimplifyError::NoFixedPoint { phase, scans: per_scan.len() });
        }
        let removed = scan(graph, phase)?;
        per_scan.push(removed);
        log::debug!("simplify {phase}: scan {} removed {removed} nodes", per_scan.len());
        if removed == 0 {
            break;
        }
    }

    Ok(PhaseReport { phase, scans: per_scan.len(), per_scan })
}

// ── Scan ──────────────────────────────────────────────────────────────────────

/// A matched contraction at one node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Pattern {
    OneWay { inbound: EdgeHandle, outbound: EdgeHandle },
    /// `a_in` and `c_out` form `A → C`; `c_in` and `a_out` form `C → A`.
    TwoWay {
        a_in:  EdgeHandle,
        c_out: EdgeHandle,
        c_in:  EdgeHandle,
        a_out: EdgeHandle,
    },
}

fn scan(graph: &mut RoadGraph, phase: Phase) -> SimplifyResult<usize> {
    let candidates: Vec<NodeHandle> = graph.node_handles().collect();
    let mut contracted = Vec::new();

    for n in candidates {
        let Some(pattern) = match_pattern(graph, n, phase) else {
            continue;
        };
        match pattern {
            Pattern::OneWay { inbound, outbound } => {
                contract(graph, phase, n, inbound, outbound)?;
            }
            Pattern::TwoWay { a_in, c_out, c_in, a_out } => {
                contract(graph, phase, n, a_in, c_out)?;
                contract(graph, phase, n, c_in, a_out)?;
            }
        }
        contracted.push(n);
    }

    for &n in &contracted {
        if !graph.out_edges(n).is_empty() || !graph.in_edges(n).is_empty() {
            return Err(SimplifyError::InvariantViolation {
                phase,
                node:   n,
                detail: "contracted node still has edges".into(),
            });
        }
        graph.remove_node(n);
    }
    Ok(contracted.len())
}

fn match_pattern(graph: &RoadGraph, n: NodeHandle, phase: Phase) -> Option<Pattern> {
    if graph.node(n)?.zone {
        return None;
    }
    let ins = graph.in_edges(n);
    let outs = graph.out_edges(n);

    match (ins.len(), outs.len()) {
        (1, 1) => {
            let (ie, oe) = (graph.edge(ins[0])?, graph.edge(outs[0])?);
            if ie.tail == oe.head || graph.find_edge(ie.tail, oe.head).is_some() {
                return None;
            }
            if phase == Phase::Conservative && ie.way != oe.way {
                return None;
            }
            Some(Pattern::OneWay { inbound: ins[0], outbound: outs[0] })
        }
        (2, 2) => {
            let (i0, i1) = (graph.edge(ins[0])?, graph.edge(ins[1])?);
            let (o0, o1) = (graph.edge(outs[0])?, graph.edge(outs[1])?);
            let (a, c) = (i0.tail, i1.tail);

            // The in-edge tails must be the out-edge heads, i.e. B touches
            // exactly two neighbours, each in both directions.
            if a == c {
                return None;
            }
            let (c_out, a_out) = if o0.head == c && o1.head == a {
                (outs[0], outs[1])
            } else if o0.head == a && o1.head == c {
                (outs[1], outs[0])
            } else {
                return None;
            };
            if graph.find_edge(a, c).is_some() || graph.find_edge(c, a).is_some() {
                return None;
            }

            let same_road = match phase {
                Phase::Conservative => {
                    let way = i0.way;
                    [i1, o0, o1].iter().all(|e| e.way == way)
                }
                Phase::NameBased => named_two_way(i0, i1, o0, o1),
            };
            same_road.then_some(Pattern::TwoWay { a_in: ins[0], c_out, c_in: ins[1], a_out })
        }
        _ => None,
    }
}

/// All four edges carry the same non-empty name and neither in-edge comes
/// from a one-way street.
fn named_two_way(i0: &Edge, i1: &Edge, o0: &Edge, o1: &Edge) -> bool {
    let Some(name) = i0.nonempty_name() else {
        return false;
    };
    let same = |e: &Edge| e.nonempty_name() == Some(name);
    same(i1) && same(o0) && same(o1) && !i0.is_oneway() && !i1.is_oneway()
}

/// Replace `inbound` (`A → B`) and `outbound` (`B → C`) with one `A → C`
/// edge.
fn contract(
    graph: &mut RoadGraph,
    phase: Phase,
    node: NodeHandle,
    inbound: EdgeHandle,
    outbound: EdgeHandle,
) -> SimplifyResult<()> {
    let violation = |detail: &str| SimplifyError::InvariantViolation {
        phase,
        node,
        detail: detail.to_string(),
    };

    let ie = graph.remove_edge(inbound).ok_or_else(|| violation("in-edge already removed"))?;
    let oe = graph.remove_edge(outbound).ok_or_else(|| violation("out-edge already removed"))?;
    if ie.head != node || oe.tail != node {
        return Err(violation("merge pair does not meet at the node"));
    }

    let merged = match phase {
        Phase::Conservative => merge_same_way(&ie, &oe),
        Phase::NameBased    => merge_by_rank(&ie, &oe),
    };
    graph.upsert_edge(merged);
    Ok(())
}

// ── Merge policies ────────────────────────────────────────────────────────────

/// In-edge identity and tags; the name survives only if both sides agree.
pub fn merge_same_way(ie: &Edge, oe: &Edge) -> Edge {
    Edge {
        head:   oe.head,
        length: ie.length + oe.length,
        name:   if ie.name == oe.name { ie.name.clone() } else { None },
        ..ie.clone()
    }
}

/// Join two edges of possibly different ways.
///
/// - speed and lanes: the smaller of the known values,
/// - road class, name and raw tags: from the edge with the lower road-class
///   rank (the in-edge on a tie),
/// - way and owner: from the in-edge,
/// - one-way if either side is.
pub fn merge_by_rank(ie: &Edge, oe: &Edge) -> Edge {
    let winner = if rank_of(oe.road_class) < rank_of(ie.road_class) { oe } else { ie };
    let oneway = ie.is_oneway() || oe.is_oneway();

    Edge {
        head:       oe.head,
        length:     ie.length + oe.length,
        road_class: winner.road_class,
        name:       winner.name.clone(),
        raw:        winner.raw.map(|t| EdgeTags { oneway, ..t }),
        max_speed:  min_known(ie.max_speed.filter(|v| *v > 0.0), oe.max_speed.filter(|v| *v > 0.0)),
        lanes:      min_known((ie.lanes > 0).then_some(ie.lanes), (oe.lanes > 0).then_some(oe.lanes))
            .unwrap_or(0),
        ..ie.clone()
    }
}

fn min_known<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b < a { b } else { a }),
        (a, b) => a.or(b),
    }
}
