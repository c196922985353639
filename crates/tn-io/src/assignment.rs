//! Exchange with an external traffic-assignment solver.
//!
//! The solver reads four CSV files and writes one:
//!
//! | File                | Contents                                                  |
//! |---------------------|-----------------------------------------------------------|
//! | `net.csv`           | one row per edge, see [`export_network`]                  |
//! | `net_metadata.csv`  | `<NUMBER OF ZONES>`, `<NUMBER OF NODES>`, `<NUMBER OF LINKS>` |
//! | `trip_metadata.csv` | `<NUMBER OF ZONES>`, `<TOTAL OD FLOW>`                    |
//! | `trips.csv`         | the OD matrix with an index column and `0..n` header      |
//! | `TA_results.csv`    | `tail,head,travel_time,xk,fixed_flow` per edge (solver output) |
//!
//! Solver node ids are dense: zones keep `1..=zones`, every other node is
//! numbered in the order edges are written.  The graph must hold exactly
//! the zone nodes `1..=zones`, and every edge needs a finite free-flow time;
//! nothing is written otherwise.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use csv::{ReaderBuilder, WriterBuilder};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use tn_core::OsmNodeId;
use tn_network::{LinkFlow, RoadGraph};

use crate::{IoError, IoResult};

pub const NET_FILE: &str = "net.csv";
pub const NET_METADATA_FILE: &str = "net_metadata.csv";
pub const TRIP_FILE: &str = "trips.csv";
pub const TRIP_METADATA_FILE: &str = "trip_metadata.csv";
pub const RESULTS_FILE: &str = "TA_results.csv";

// ── Trip table ────────────────────────────────────────────────────────────────

/// Zone-to-zone demand, vehicles per hour.  Row `i`, column `j` is the flow
/// from zone `i + 1` to zone `j + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct TripTable {
    rows: Vec<Vec<f64>>,
}

impl TripTable {
    /// # Errors
    ///
    /// [`IoError::TripTable`] unless `rows` is square with more than one
    /// zone.
    pub fn new(rows: Vec<Vec<f64>>) -> IoResult<Self> {
        let n = rows.len();
        if n < 2 {
            return Err(IoError::TripTable(format!("need at least 2 zones, got {n}")));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(IoError::TripTable(format!(
                "row {i} has {} entries, expected {n}",
                row.len()
            )));
        }
        Ok(Self { rows })
    }

    /// Read a headerless CSV matrix.
    pub fn from_csv_reader<R: Read>(reader: R) -> IoResult<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|v| {
                    v.trim()
                        .parse::<f64>()
                        .map_err(|_| IoError::TripTable(format!("not a number: {v:?}")))
                })
                .collect::<IoResult<Vec<_>>>()?;
            rows.push(row);
        }
        Self::new(rows)
    }

    pub fn from_path(path: &Path) -> IoResult<Self> {
        Self::from_csv_reader(File::open(path)?)
    }

    pub fn zones(&self) -> usize {
        self.rows.len()
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().flatten().sum()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

// ── Node renumbering ──────────────────────────────────────────────────────────

/// Map between map node ids and dense solver ids.
#[derive(Clone, Debug, Default)]
pub struct NodeReindex {
    to_solver: FxHashMap<OsmNodeId, u32>,
    to_node:   Vec<OsmNodeId>,
}

impl NodeReindex {
    fn with_zones(zones: usize) -> Self {
        let mut reindex = Self::default();
        for z in 1..=zones {
            reindex.assign(OsmNodeId(z as i64));
        }
        reindex
    }

    fn assign(&mut self, id: OsmNodeId) -> u32 {
        if let Some(&s) = self.to_solver.get(&id) {
            return s;
        }
        self.to_node.push(id);
        let s = self.to_node.len() as u32;
        self.to_solver.insert(id, s);
        s
    }

    pub fn solver_id(&self, id: OsmNodeId) -> Option<u32> {
        self.to_solver.get(&id).copied()
    }

    pub fn node_id(&self, solver: u32) -> Option<OsmNodeId> {
        (solver as usize).checked_sub(1).and_then(|i| self.to_node.get(i)).copied()
    }

    /// Number of solver ids handed out, zones included.
    pub fn len(&self) -> usize {
        self.to_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_node.is_empty()
    }
}

// ── Export ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct LinkRow {
    tail:       u32,
    head:       u32,
    capacity:   f64,
    length:     f64,
    fftime:     f64,
    b:          f64,
    power:      f64,
    speedlimit: Option<f64>,
    toll:       u32,
    #[serde(rename = "type")]
    link_type:  u32,
    am:         f64,
    base:       f64,
}

/// Write the edge table and its metadata.
///
/// `toll` is always `0` and `type` always `1`.  `am` and `base` are the
/// congested and free-flow observed times, `0` when none were recorded.
///
/// # Errors
///
/// - [`IoError::TripTable`] unless the zone nodes of `graph` are exactly
///   `1..=zones`.
/// - [`IoError::UnresolvedSpeed`] for an edge with an infinite free-flow
///   time.
pub fn export_network<W: Write, M: Write>(
    graph: &RoadGraph,
    zones: usize,
    net: W,
    meta: M,
) -> IoResult<NodeReindex> {
    check_exportable(graph, zones)?;
    let mut reindex = NodeReindex::with_zones(zones);
    let mut wtr = WriterBuilder::new().from_writer(net);
    let mut links = 0usize;

    for (_, edge) in graph.edges() {
        let (Some(tail), Some(head)) = (graph.node(edge.tail), graph.node(edge.head)) else {
            continue;
        };
        let (am, base) = edge.observed.map_or((0.0, 0.0), |o| (o.congested, o.free_flow));
        wtr.serialize(LinkRow {
            tail: reindex.assign(tail.id),
            head: reindex.assign(head.id),
            capacity: edge.capacity,
            length: edge.length,
            fftime: edge.free_flow_time,
            b: edge.bpr.b,
            power: edge.bpr.power,
            speedlimit: edge.max_speed,
            toll: 0,
            link_type: 1,
            am,
            base,
        })?;
        links += 1;
    }
    wtr.flush()?;

    write_metadata(meta, &[
        ("<NUMBER OF ZONES>", zones.to_string()),
        ("<NUMBER OF NODES>", reindex.len().to_string()),
        ("<NUMBER OF LINKS>", links.to_string()),
    ])?;

    log::debug!("assignment: exported {links} links over {} solver nodes", reindex.len());
    Ok(reindex)
}

/// Refuse a graph the solver would misread.
fn check_exportable(graph: &RoadGraph, zones: usize) -> IoResult<()> {
    for z in 1..=zones {
        let id = OsmNodeId(z as i64);
        let is_zone = graph.handle_of(id).and_then(|h| graph.node(h)).is_some_and(|n| n.zone);
        if !is_zone {
            return Err(IoError::TripTable(format!(
                "table has {zones} zones but node {id} is not a zone"
            )));
        }
    }
    let flagged = graph.nodes().filter(|(_, n)| n.zone).count();
    if flagged != zones {
        return Err(IoError::TripTable(format!(
            "table has {zones} zones but the network has {flagged}"
        )));
    }

    for (_, edge) in graph.edges() {
        if !edge.free_flow_time.is_finite() {
            let id = |h| graph.node(h).map_or(OsmNodeId(-1), |n| n.id);
            return Err(IoError::UnresolvedSpeed { tail: id(edge.tail), head: id(edge.head) });
        }
    }
    Ok(())
}

/// Write the OD matrix and its metadata.
pub fn export_trips<W: Write, M: Write>(table: &TripTable, trips: W, meta: M) -> IoResult<()> {
    let n = table.zones();
    let mut wtr = WriterBuilder::new().from_writer(trips);

    let header = std::iter::once(String::new()).chain((0..n).map(|j| j.to_string()));
    wtr.write_record(header)?;
    for (i, row) in table.rows().iter().enumerate() {
        let record = std::iter::once(i.to_string()).chain(row.iter().map(f64::to_string));
        wtr.write_record(record)?;
    }
    wtr.flush()?;

    write_metadata(meta, &[
        ("<NUMBER OF ZONES>", n.to_string()),
        ("<TOTAL OD FLOW>", table.total().to_string()),
    ])
}

fn write_metadata<M: Write>(meta: M, entries: &[(&str, String)]) -> IoResult<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(meta);
    for (key, value) in entries {
        wtr.write_record([*key, value.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

// ── Import ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ResultRow {
    tail:        u32,
    head:        u32,
    travel_time: f64,
    xk:          f64,
    fixed_flow:  f64,
}

/// Read solver output and store a [`LinkFlow`] on every listed edge.
/// Returns the number of edges updated.
///
/// `fw_ratio` is the projected time over the observed free-flow time,
/// floored at `1` (and `1` without an observation).  `delta` is assigned
/// flow over capacity, `0` on a zero-capacity edge.
///
/// # Errors
///
/// [`IoError::UnknownSolverNode`] / [`IoError::UnknownEdge`] if a row does
/// not map back onto the graph.
pub fn import_results<R: Read>(graph: &mut RoadGraph, reader: R, reindex: &NodeReindex) -> IoResult<usize> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut updated = 0usize;

    for row in rdr.deserialize() {
        let row: ResultRow = row?;
        let tail = reindex.node_id(row.tail).ok_or(IoError::UnknownSolverNode(row.tail))?;
        let head = reindex.node_id(row.head).ok_or(IoError::UnknownSolverNode(row.head))?;
        let handle = graph
            .handle_of(tail)
            .zip(graph.handle_of(head))
            .and_then(|(t, h)| graph.find_edge(t, h))
            .ok_or(IoError::UnknownEdge { tail, head })?;
        let edge = graph.edge_mut(handle).ok_or(IoError::UnknownEdge { tail, head })?;

        let ff_guess = edge.observed.map_or(0.0, |o| o.free_flow);
        let fw_ratio = if ff_guess == 0.0 { 1.0 } else { (row.travel_time / ff_guess).max(1.0) };
        let delta = if edge.capacity > 0.0 { row.xk / edge.capacity } else { 0.0 };

        edge.flow = Some(LinkFlow {
            proj_ttime: row.travel_time,
            new_flow: row.xk,
            fixed_flow: row.fixed_flow,
            flow: row.xk + row.fixed_flow,
            fw_ratio,
            delta,
        });
        updated += 1;
    }

    log::info!("assignment: flows imported for {updated} edges");
    Ok(updated)
}

// ── Running the solver ────────────────────────────────────────────────────────

/// The external solver executable.
///
/// It is invoked as `program args… net net_meta trip_meta trips results`
/// with absolute paths inside the working directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverCommand {
    pub program: PathBuf,
    pub args:    Vec<String>,
}

impl SolverCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Export `graph` and `table` into `workdir`, run the solver, and import its
/// results.  Every file written or produced in `workdir` is removed
/// afterwards.  Returns the number of edges updated.
///
/// # Errors
///
/// Checks the graph as [`export_network`] does before any file is
/// written.
pub fn run_assignment(
    graph: &mut RoadGraph,
    table: &TripTable,
    solver: &SolverCommand,
    workdir: &Path,
) -> IoResult<usize> {
    check_exportable(graph, table.zones())?;

    let net = workdir.join(NET_FILE);
    let net_meta = workdir.join(NET_METADATA_FILE);
    let trips = workdir.join(TRIP_FILE);
    let trip_meta = workdir.join(TRIP_METADATA_FILE);
    let results = workdir.join(RESULTS_FILE);

    let reindex = export_network(graph, table.zones(), File::create(&net)?, File::create(&net_meta)?)?;
    export_trips(table, File::create(&trips)?, File::create(&trip_meta)?)?;

    log::info!("assignment: running {}", solver.program.display());
    let status = Command::new(&solver.program)
        .args(&solver.args)
        .args([&net, &net_meta, &trip_meta, &trips, &results])
        .status();

    for input in [&net, &net_meta, &trip_meta, &trips] {
        fs::remove_file(input)?;
    }
    let status = status?;
    if !status.success() {
        let _ = fs::remove_file(&results);
        return Err(IoError::Solver {
            program: solver.program.display().to_string(),
            status:  status.to_string(),
        });
    }

    let updated = import_results(graph, File::open(&results)?, &reindex);
    fs::remove_file(&results)?;
    updated
}
