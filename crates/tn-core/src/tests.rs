//! Unit tests for tn-core primitives.

#[cfg(test)]
mod ids {
    use crate::{EdgeHandle, NodeHandle, OsmNodeId, WayId};

    #[test]
    fn handle_index_roundtrip() {
        let h = NodeHandle(42);
        assert_eq!(h.index(), 42);
        assert_eq!(NodeHandle::try_from(42usize).unwrap(), h);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(NodeHandle::INVALID.0, u32::MAX);
        assert_eq!(EdgeHandle::default(), EdgeHandle::INVALID);
    }

    #[test]
    fn source_ids_display_bare() {
        assert_eq!(OsmNodeId(65_432_101).to_string(), "65432101");
        assert_eq!(NodeHandle(7).to_string(), "NodeHandle(7)");
    }

    #[test]
    fn source_ids_parse() {
        assert_eq!(" 12 ".parse::<OsmNodeId>().unwrap(), OsmNodeId(12));
        assert!("abc".parse::<WayId>().is_err());
    }
}

#[cfg(test)]
mod geo {
    use crate::GeoPoint;

    #[test]
    fn zero_distance() {
        let p = GeoPoint::new(-122.27, 37.80);
        assert!(p.distance_miles(p) < 1e-9);
    }

    #[test]
    fn one_degree_latitude() {
        // One degree of latitude at 37-38°N on the WGS-84 ellipsoid.
        let a = GeoPoint::new(-122.0, 37.0);
        let b = GeoPoint::new(-122.0, 38.0);
        let d = a.distance_miles(b);
        assert!((d - 68.964).abs() < 0.01, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(-122.27, 37.80);
        let b = GeoPoint::new(-122.41, 37.77);
        assert!((a.distance_miles(b) - b.distance_miles(a)).abs() < 1e-9);
    }

    #[test]
    fn mean_of_points() {
        let m = GeoPoint::mean([GeoPoint::new(0.0, 0.0), GeoPoint::new(2.0, 4.0)]).unwrap();
        assert_eq!(m, GeoPoint::new(1.0, 2.0));
        assert!(GeoPoint::mean(std::iter::empty()).is_none());
    }
}

#[cfg(test)]
mod road {
    use crate::road::{lane_capacity_of, max_lanes_of, rank_of};
    use crate::RoadClass;

    #[test]
    fn links_fold_into_parent() {
        assert_eq!(RoadClass::from_highway("motorway_link"), Some(RoadClass::Motorway));
        assert_eq!(RoadClass::from_highway("tertiary_link"), Some(RoadClass::Tertiary));
        assert_eq!(RoadClass::from_highway("unclassified"), Some(RoadClass::Unclassified));
    }

    #[test]
    fn non_whitelisted_rejected() {
        for v in ["residential", "service", "footway", "unclassified_link", ""] {
            assert_eq!(RoadClass::from_highway(v), None, "{v}");
        }
    }

    #[test]
    fn ranks_descend_with_hierarchy() {
        let ranks: Vec<i8> = RoadClass::ALL.iter().map(|c| c.rank()).collect();
        assert_eq!(ranks, vec![5, 4, 3, 2, 1, 0]);
        assert!(rank_of(None) < RoadClass::Unclassified.rank());
    }

    #[test]
    fn unknown_class_rows_are_zero() {
        assert_eq!(lane_capacity_of(None), 0);
        assert_eq!(max_lanes_of(None), 0);
        assert_eq!(lane_capacity_of(Some(RoadClass::Primary)), 700);
        assert_eq!(max_lanes_of(Some(RoadClass::Secondary)), 2);
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(RoadClass::Trunk.to_string(), "trunk");
        assert_eq!("secondary".parse::<RoadClass>().unwrap(), RoadClass::Secondary);
        assert!("path".parse::<RoadClass>().is_err());
    }
}
