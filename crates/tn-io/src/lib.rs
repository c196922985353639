//! `tn-io`: moving a `tn-network` graph in and out of files and external
//! tools.
//!
//! | Module         | Contents                                                      |
//! |----------------|---------------------------------------------------------------|
//! | [`features`]   | GeoJSON `FeatureCollection` encode/decode                     |
//! | [`travel`]     | `TravelTimeSource` trait, `annotate_travel_times`             |
//! | [`assignment`] | `TripTable`, solver CSV export/import, `run_assignment`       |
//! | [`error`]      | `IoError`, `IoResult<T>`                                      |
//!
//! # Usage
//!
//! ```rust,ignore
//! use tn_io::{write_geojson, TripTable, SolverCommand, run_assignment};
//!
//! let table = TripTable::from_path(Path::new("trips.csv"))?;
//! run_assignment(&mut summary.graph, &table, &SolverCommand::new("./solve"), Path::new("tmp"))?;
//! write_geojson(&summary.graph, Path::new("net.geojson"))?;
//! ```

pub mod assignment;
pub mod error;
pub mod features;
pub mod travel;


pub use assignment::{
    export_network, export_trips, import_results, run_assignment, NodeReindex, SolverCommand,
    TripTable,
};
pub use error::{IoError, IoResult};
pub use features::{
    from_feature_collection, from_geojson_str, read_geojson, to_feature_collection,
    to_geojson_string, write_geojson,
};
pub use travel::{annotate_travel_times, TravelReport, TravelTimeSource};
