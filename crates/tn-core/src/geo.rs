//! Geographic coordinate type and distance helpers.
//!
//! `GeoPoint` stores WGS-84 degrees in `f64`; simplification sums many short
//! edge lengths and needs the extra precision.  Distances are geodesics on
//! the WGS-84 ellipsoid, computed by the `geo` crate.

use ::geo::{Distance, Geodesic, Point};

/// A WGS-84 coordinate in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

const METERS_PER_MILE: f64 = 1_609.344;

impl GeoPoint {
    #[inline]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Ellipsoidal (WGS-84) geodesic distance in miles.
    pub fn distance_miles(self, other: GeoPoint) -> f64 {
        Geodesic.distance(self.to_point(), other.to_point()) / METERS_PER_MILE
    }

    #[inline]
    fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Arithmetic mean of a set of points, or `None` for an empty set.
    pub fn mean<I>(points: I) -> Option<GeoPoint>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let (mut lon, mut lat, mut n) = (0.0, 0.0, 0usize);
        for p in points {
            lon += p.lon;
            lat += p.lat;
            n += 1;
        }
        (n > 0).then(|| GeoPoint::new(lon / n as f64, lat / n as f64))
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lon, self.lat)
    }
}
