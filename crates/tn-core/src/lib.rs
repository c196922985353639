//! `tn-core`: foundational types for the `tapnet` map-to-network pipeline.
//!
//! This crate is a dependency of every other `tn-*` crate.  It has no `tn-*`
//! dependencies and few external ones (`thiserror` and `geo`, plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                                    |
//! |-----------|-------------------------------------------------------------|
//! | [`ids`]   | `NodeHandle`, `EdgeHandle` (arena), `OsmNodeId`, `WayId`, `OwnerId` (source) |
//! | [`geo`]   | `GeoPoint`, WGS-84 geodesic distance in miles                  |
//! | [`road`]  | `RoadClass` and its per-class lookup tables                 |
//! | [`error`] | `CoreError`, `CoreResult`                                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod road;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use crate::geo::GeoPoint;
pub use ids::{EdgeHandle, NodeHandle, OsmNodeId, OwnerId, WayId};
pub use road::{lane_capacity_of, max_lanes_of, rank_of, RoadClass};
