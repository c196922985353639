//! osm2net: turn an OSM extract into a parameterized traffic network.
//!
//! ```text
//! osm2net berkeley.osm --output berkeley.geojson --zones zones.json
//! ```
//!
//! `zones.json` is a list of zones, each a list of `[lon, lat]` points.
//! Every point is snapped to the nearest network node and the zone is wired
//! to those nodes.  Set `RUST_LOG=debug` for per-scan progress.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use tn_core::{GeoPoint, OsmNodeId};
use tn_network::{PipelineConfig, SpatialIndex, attach_zones, build_network};
use tn_osm::{RawDocument, read_osm_pbf, read_osm_xml_file};

#[derive(Parser, Debug)]
#[command(name = "osm2net")]
#[command(about = "Build a traffic-assignment network from an OSM extract")]
struct Args {
    /// `.osm` XML or `.pbf` extract
    input: PathBuf,

    /// GeoJSON output path
    #[arg(short, long, default_value = "net.geojson")]
    output: PathBuf,

    /// JSON list of zones, each a list of `[lon, lat]` points
    #[arg(long)]
    zones: Option<PathBuf>,

    /// Fail on missing changeset metadata instead of stamping it
    #[arg(long)]
    no_repair: bool,
}

fn read_document(path: &Path) -> Result<RawDocument> {
    let is_pbf = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("pbf"));
    let doc = if is_pbf { read_osm_pbf(path)? } else { read_osm_xml_file(path)? };
    Ok(doc)
}

fn read_zones(path: &Path) -> Result<Vec<Vec<GeoPoint>>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: Vec<Vec<[f64; 2]>> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(raw
        .into_iter()
        .map(|zone| zone.into_iter().map(|[lon, lat]| GeoPoint::new(lon, lat)).collect())
        .collect())
}

fn snap_zones(index: &SpatialIndex, zones: &[Vec<GeoPoint>]) -> Result<Vec<Vec<OsmNodeId>>> {
    zones
        .iter()
        .enumerate()
        .map(|(i, points)| {
            points
                .iter()
                .map(|&p| {
                    index
                        .snap(p)
                        .with_context(|| format!("zone {}: no network node to snap {p} to", i + 1))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start = Instant::now();

    // 1. Read the extract.
    let doc = read_document(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    println!("Read {}: {} nodes, {} ways", args.input.display(), doc.nodes.len(), doc.ways.len());

    // 2. Build, simplify, infer and parameterize.
    let mut config = PipelineConfig::default();
    if args.no_repair {
        config.repair = None;
    }
    let mut summary = build_network(doc, &config)?;
    println!(
        "Network: {} nodes / {} edges, simplified to {} nodes / {} edges",
        summary.original.nodes,
        summary.original.edges,
        summary.simplified.nodes,
        summary.simplified.edges,
    );
    println!("Centroid: {}", summary.centroid);
    println!(
        "Unresolved: {} speeds, {} lane counts, {} edges with infinite free-flow time",
        summary.inference.speed.unresolved,
        summary.inference.lanes.unresolved,
        summary.parameters.infinite_time,
    );

    // 3. Zones.
    if let Some(path) = &args.zones {
        let index = SpatialIndex::build(&summary.graph);
        let groups = snap_zones(&index, &read_zones(path)?)?;
        let zones = attach_zones(&mut summary.graph, &groups)?;
        println!("Attached {} zones", zones.len());
    }

    // 4. Write.
    tn_io::write_geojson(&summary.graph, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("Wrote {} in {:.2?}", args.output.display(), start.elapsed());
    Ok(())
}
