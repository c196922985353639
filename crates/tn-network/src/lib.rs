//! `tn-network`: from filtered ways to a parameterized traffic network.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                 |
//! |------------------|----------------------------------------------------------|
//! | [`graph`]        | `RoadGraph` arena, `Node`, `Edge`, edge attribute records |
//! | [`build`]        | `build_graph`, weak connectivity helpers                 |
//! | [`annotate`]     | `annotate_lengths`                                       |
//! | [`simplify`]     | `simplify`, `run_phase`, merge policies                  |
//! | [`infer`]        | `infer_attributes`, `propagate`, `median`                |
//! | [`parameterize`] | `parameterize`, capacity and free-flow time              |
//! | [`zones`]        | `attach_zones`                                           |
//! | [`spatial`]      | `SpatialIndex` (R-tree snapping)                         |
//! | [`pipeline`]     | `build_network`, `PipelineConfig`, `NetworkSummary`      |
//! | [`error`]        | `BuildError`, `SimplifyError`, `NetworkError`            |
//!
//! # Phase order
//!
//! ```text
//! ingest → build → annotate → simplify → infer → parameterize
//! ```
//!
//! Simplification needs lengths and still-resolvable road classes, so the
//! order is fixed.  [`build_network`] runs it end to end.
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Edge lengths computed on Rayon's thread pool.           |
//! | `serde`    | Derives `Serialize`/`Deserialize` on config and reports. |

pub mod annotate;
pub mod build;
pub mod error;
pub mod graph;
pub mod infer;
pub mod parameterize;
pub mod pipeline;
pub mod simplify;
pub mod spatial;
pub mod zones;

#[cfg(test)]
mod tests;

pub use annotate::annotate_lengths;
pub use build::{build_graph, is_weakly_connected, split_lanes, weak_components};
pub use error::{
    BuildError, BuildResult, NetworkError, NetworkResult, SimplifyError, SimplifyResult,
};
pub use graph::{
    BprCoefficients, Edge, EdgeTags, GraphCounts, LinkFlow, Node, ObservedTimes, RoadGraph,
};
pub use infer::{infer_attributes, infer_lanes, infer_speeds, median, InferenceReport, Propagation};
pub use parameterize::{parameterize, ParameterReport};
pub use pipeline::{build_network, ingest_with_repair, run_pipeline, NetworkSummary, PipelineConfig};
pub use simplify::{
    merge_by_rank, merge_same_way, run_phase, simplify, Phase, PhaseReport, SimplifyReport,
};
pub use spatial::SpatialIndex;
pub use zones::attach_zones;
