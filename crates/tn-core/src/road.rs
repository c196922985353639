//! Road classes and the per-class tables used by inference and
//! parameterization.
//!
//! Only the six drivable arterial/collector classes survive ingestion.
//! `*_link` ramps fold into their parent class.

use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// The `highway=*` class of a kept road, with `_link` variants folded in.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Unclassified,
}

impl RoadClass {
    pub const ALL: [RoadClass; 6] = [
        RoadClass::Motorway,
        RoadClass::Trunk,
        RoadClass::Primary,
        RoadClass::Secondary,
        RoadClass::Tertiary,
        RoadClass::Unclassified,
    ];

    /// Map a raw `highway` tag value to a kept class.
    ///
    /// Returns `None` for every value outside the whitelist (residential,
    /// service, footway, …); those ways never enter the graph.
    pub fn from_highway(value: &str) -> Option<RoadClass> {
        match value {
            "motorway"  | "motorway_link"  => Some(RoadClass::Motorway),
            "trunk"     | "trunk_link"     => Some(RoadClass::Trunk),
            "primary"   | "primary_link"   => Some(RoadClass::Primary),
            "secondary" | "secondary_link" => Some(RoadClass::Secondary),
            "tertiary"  | "tertiary_link"  => Some(RoadClass::Tertiary),
            "unclassified"                 => Some(RoadClass::Unclassified),
            _                              => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoadClass::Motorway     => "motorway",
            RoadClass::Trunk        => "trunk",
            RoadClass::Primary      => "primary",
            RoadClass::Secondary    => "secondary",
            RoadClass::Tertiary     => "tertiary",
            RoadClass::Unclassified => "unclassified",
        }
    }

    /// Hierarchy rank: motorway = 5 down to unclassified = 0.  Lower means
    /// more local.
    pub fn rank(self) -> i8 {
        match self {
            RoadClass::Motorway     => 5,
            RoadClass::Trunk        => 4,
            RoadClass::Primary      => 3,
            RoadClass::Secondary    => 2,
            RoadClass::Tertiary     => 1,
            RoadClass::Unclassified => 0,
        }
    }

    /// Per-lane capacity in vehicles per hour.
    pub fn lane_capacity(self) -> u32 {
        match self {
            RoadClass::Motorway     => 800,
            RoadClass::Trunk        => 800,
            RoadClass::Primary      => 700,
            RoadClass::Secondary    => 600,
            RoadClass::Tertiary     => 500,
            RoadClass::Unclassified => 400,
        }
    }

    /// Upper bound on lanes in a single direction, used to sanity-check
    /// inferred lane counts.
    pub fn max_lanes_one_way(self) -> u32 {
        match self {
            RoadClass::Motorway     => 5,
            RoadClass::Trunk        => 4,
            RoadClass::Primary      => 3,
            RoadClass::Secondary    => 2,
            RoadClass::Tertiary     => 1,
            RoadClass::Unclassified => 1,
        }
    }
}

// ── Lookups over an optional class ────────────────────────────────────────────
//
// Edges without a recognised class (zone connectors, decoded foreign data)
// carry `None`.  These helpers give such edges the "unknown" row of each
// table.

/// Rank of an optional class; unknown ranks below every real class.
pub fn rank_of(class: Option<RoadClass>) -> i8 {
    class.map_or(-1, RoadClass::rank)
}

/// Per-lane capacity of an optional class; unknown ⇒ 0.
pub fn lane_capacity_of(class: Option<RoadClass>) -> u32 {
    class.map_or(0, RoadClass::lane_capacity)
}

/// One-way lane bound of an optional class; unknown ⇒ 0.
pub fn max_lanes_of(class: Option<RoadClass>) -> u32 {
    class.map_or(0, RoadClass::max_lanes_one_way)
}

impl fmt::Display for RoadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoadClass {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoadClass::from_highway(s).ok_or_else(|| CoreError::UnknownRoadClass(s.to_string()))
    }
}
