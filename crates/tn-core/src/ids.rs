//! Strongly typed identifier wrappers.
//!
//! Two families live here:
//!
//! - **Arena handles** (`NodeHandle`, `EdgeHandle`): dense `u32` slots into
//!   the graph arena.  A handle stays valid for the lifetime of the graph;
//!   removing a node or edge empties its slot but never renumbers others.
//! - **Source ids** (`OsmNodeId`, `WayId`, `OwnerId`): the `i64` ids carried
//!   over from the map document.  These are what leave the pipeline.

use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Generate a typed arena handle around a `u32` slot index.
macro_rules! arena_handle {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub u32);

        impl $name {
            /// Sentinel meaning "no valid handle".
            pub const INVALID: $name = $name(u32::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                u32::try_from(n).map($name)
            }
        }
    };
}

/// Generate a typed wrapper around an `i64` id taken from the source map.
macro_rules! source_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(pub i64);

        impl fmt::Display for $name {
            /// Bare number, so ids format the same way they appear in the
            /// source document and in exported files.
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map($name)
                    .map_err(|_| CoreError::InvalidId(s.to_string()))
            }
        }

        impl From<i64> for $name {
            #[inline(always)]
            fn from(n: i64) -> Self {
                $name(n)
            }
        }
    };
}

arena_handle! {
    /// Slot of a node in the graph arena.
    pub struct NodeHandle;
}

arena_handle! {
    /// Slot of a directed edge in the graph arena.
    pub struct EdgeHandle;
}

source_id! {
    /// Id of a map node, as assigned by the source document.
    pub struct OsmNodeId;
}

source_id! {
    /// Id of the way an edge was expanded from.
    pub struct WayId;
}

source_id! {
    /// Id of the user who last edited a way.
    pub struct OwnerId;
}

impl WayId {
    /// Way id carried by synthetic zone-connector edges.
    pub const CONNECTOR: WayId = WayId(0);
}
