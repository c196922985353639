//! `tn-osm`: from a raw map document to a filtered, tag-normalized way list.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`document`] | `RawDocument`, `RawNode`, `RawWay`, `EntityMeta`          |
//! | [`xml`]      | `read_osm_xml`, `read_osm_xml_file`                       |
//! | [`pbf`]      | `read_osm_pbf` (feature = `"pbf"` only)                   |
//! | [`repair`]   | `MetadataRepair`, stamps missing changeset/timestamp     |
//! | [`ingest`]   | `ingest`, `Extract`, `WayRecord`, `WayTags`               |
//! | [`error`]    | `IngestError`, `IngestResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `pbf`   | Enables OSM PBF reading via the `osmpbf` crate.             |
//! | `serde` | Derives `Serialize`/`Deserialize` on public types.           |

pub mod document;
pub mod error;
pub mod ingest;
pub mod repair;
pub mod xml;

#[cfg(feature = "pbf")]
pub mod pbf;


pub use document::{EntityMeta, RawDocument, RawNode, RawWay};
pub use error::{EntityKind, IngestError, IngestResult};
pub use ingest::{ingest, parse_maxspeed, Extract, WayRecord, WayTags};
pub use repair::MetadataRepair;
pub use xml::{read_osm_xml, read_osm_xml_file};

#[cfg(feature = "pbf")]
pub use pbf::read_osm_pbf;
