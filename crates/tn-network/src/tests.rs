//! Unit tests for tn-network.
//!
//! All tests use hand-built extracts and graphs so they run without any OSM
//! file.

#[cfg(test)]
mod helpers {
    use std::collections::HashMap;

    use tn_core::{EdgeHandle, GeoPoint, NodeHandle, OsmNodeId, OwnerId, RoadClass, WayId};
    use tn_osm::{EntityMeta, Extract, RawDocument, RawNode, RawWay, WayRecord, WayTags};

    use crate::{Edge, EdgeTags, RoadGraph};

    pub fn tags(class: RoadClass) -> WayTags {
        WayTags {
            highway:        class,
            name:           None,
            oneway:         false,
            max_speed:      None,
            lanes:          0,
            lanes_forward:  None,
            lanes_backward: None,
            lanes_psv:      0,
        }
    }

    pub fn record(id: i64, refs: &[i64], tags: WayTags) -> WayRecord {
        WayRecord {
            id:    WayId(id),
            owner: Some(OwnerId(5)),
            refs:  refs.iter().copied().map(OsmNodeId).collect(),
            tags,
        }
    }

    /// Node `i` sits at `(i * 0.01, 0)`.
    pub fn extract(ids: &[i64], ways: Vec<WayRecord>) -> Extract {
        Extract {
            coords: ids
                .iter()
                .map(|&i| (OsmNodeId(i), GeoPoint::new(i as f64 * 0.01, 0.0)))
                .collect::<HashMap<_, _>>(),
            ways,
            dropped_ways: 0,
        }
    }

    /// A graph with one node per id, placed as in [`extract`].
    pub fn graph_with(ids: &[i64]) -> (RoadGraph, Vec<NodeHandle>) {
        let mut g = RoadGraph::new();
        let handles = ids
            .iter()
            .map(|&i| g.add_node(OsmNodeId(i), GeoPoint::new(i as f64 * 0.01, 0.0)))
            .collect();
        (g, handles)
    }

    pub fn edge(a: NodeHandle, b: NodeHandle, way: i64, length: f64) -> Edge {
        Edge {
            length,
            road_class: Some(RoadClass::Primary),
            raw: Some(EdgeTags::default()),
            ..Edge::new(a, b, WayId(way))
        }
    }

    pub fn link(g: &mut RoadGraph, a: NodeHandle, b: NodeHandle, way: i64, length: f64) -> EdgeHandle {
        g.upsert_edge(edge(a, b, way, length))
    }

    /// Both directions of a street segment.
    pub fn road(g: &mut RoadGraph, a: NodeHandle, b: NodeHandle, way: i64, length: f64) {
        link(g, a, b, way, length);
        link(g, b, a, way, length);
    }

    pub fn named_road(g: &mut RoadGraph, a: NodeHandle, b: NodeHandle, way: i64, name: &str) {
        for (t, h) in [(a, b), (b, a)] {
            let mut e = edge(t, h, way, 0.1);
            e.name = Some(name.to_string());
            g.upsert_edge(e);
        }
    }

    pub fn total_length(g: &RoadGraph) -> f64 {
        g.edges().map(|(_, e)| e.length).sum()
    }

    /// `1 ↔ 2 ↔ 3 ↔ 4 ↔ 5` (way 1) with a branch `3 ↔ 6 ↔ 7` (way 2).
    pub fn tee() -> (RoadGraph, Vec<NodeHandle>) {
        let (mut g, n) = graph_with(&[1, 2, 3, 4, 5, 6, 7]);
        road(&mut g, n[0], n[1], 1, 0.1);
        road(&mut g, n[1], n[2], 1, 0.2);
        road(&mut g, n[2], n[3], 1, 0.3);
        road(&mut g, n[3], n[4], 1, 0.4);
        road(&mut g, n[2], n[5], 2, 0.5);
        road(&mut g, n[5], n[6], 2, 0.6);
        (g, n)
    }

    pub fn stamped() -> EntityMeta {
        EntityMeta { changeset: Some(3), timestamp: Some("2019-03-01T00:00:00Z".into()) }
    }

    /// Raw version of [`tee`] with primary and tertiary ways.
    pub fn tee_document(meta: EntityMeta) -> RawDocument {
        let node = |id: i64, lon: f64, lat: f64| RawNode { id: OsmNodeId(id), lon, lat, meta: meta.clone() };
        let way = |id: i64, refs: &[i64], tags: &[(&str, &str)]| RawWay {
            id:    WayId(id),
            owner: Some(OwnerId(5)),
            refs:  refs.iter().copied().map(OsmNodeId).collect(),
            tags:  tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            meta:  meta.clone(),
        };
        RawDocument {
            nodes: vec![
                node(1, -121.99, 37.0),
                node(2, -121.98, 37.0),
                node(3, -121.97, 37.0),
                node(4, -121.96, 37.0),
                node(5, -121.95, 37.0),
                node(6, -121.97, 37.01),
                node(7, -121.97, 37.02),
                node(8, -121.90, 37.5),
            ],
            ways: vec![
                way(10, &[1, 2, 3, 4, 5], &[("highway", "primary"), ("maxspeed", "30 mph"), ("lanes", "4")]),
                way(11, &[3, 6, 7], &[("highway", "tertiary")]),
                way(12, &[6, 8], &[("highway", "footway")]),
            ],
        }
    }
}

// ── Graph arena ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod graph {
    use tn_core::{GeoPoint, OsmNodeId};

    use super::helpers::{edge, graph_with, link};

    #[test]
    fn add_node_is_idempotent() {
        let (mut g, n) = graph_with(&[1]);
        assert_eq!(g.add_node(OsmNodeId(1), GeoPoint::new(9.0, 9.0)), n[0]);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.pos(n[0]), Some(GeoPoint::new(0.01, 0.0)));
    }

    #[test]
    fn same_pair_overwrites_in_place() {
        let (mut g, n) = graph_with(&[1, 2]);
        let first = link(&mut g, n[0], n[1], 1, 0.5);
        let second = g.upsert_edge(edge(n[0], n[1], 2, 0.7));
        assert_eq!(first, second);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.out_edges(n[0]).len(), 1);
        assert_eq!(g.edge(first).unwrap().way.0, 2);
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        link(&mut g, n[0], n[1], 1, 1.0);
        link(&mut g, n[1], n[2], 1, 1.0);
        link(&mut g, n[2], n[0], 1, 1.0);
        g.remove_node(n[1]);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.in_edges(n[2]).is_empty());
        assert!(g.handle_of(OsmNodeId(2)).is_none());
        assert!(g.node(n[1]).is_none());
        assert!(g.out_edges(n[1]).is_empty());
    }

    #[test]
    fn edge_order_follows_nodes_then_insertion() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        let e21 = link(&mut g, n[1], n[0], 1, 1.0);
        let e02 = link(&mut g, n[0], n[2], 1, 1.0);
        let e01 = link(&mut g, n[0], n[1], 1, 1.0);
        let order: Vec<_> = g.edge_handles().collect();
        assert_eq!(order, vec![e02, e01, e21]);
    }

    #[test]
    fn centroid_is_mean_position() {
        let (g, _) = graph_with(&[1, 3]);
        let c = g.centroid().unwrap();
        assert!((c.lon - 0.02).abs() < 1e-12);
        assert_eq!(c.lat, 0.0);
    }
}

// ── Graph Builder ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod build {
    use tn_core::{OsmNodeId, RoadClass};

    use super::helpers::{extract, record, tags};
    use crate::{build_graph, is_weakly_connected, split_lanes, BuildError};

    #[test]
    fn oneway_emits_forward_edges_only() {
        let mut t = tags(RoadClass::Primary);
        t.oneway = true;
        let g = build_graph(&extract(&[1, 2, 3], vec![record(1, &[1, 2, 3], t)])).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        let (a, b) = (g.handle_of(OsmNodeId(1)).unwrap(), g.handle_of(OsmNodeId(2)).unwrap());
        assert!(g.find_edge(a, b).is_some());
        assert!(g.find_edge(b, a).is_none());
    }

    #[test]
    fn twoway_emits_both_directions() {
        let g = build_graph(&extract(&[1, 2, 3], vec![record(1, &[1, 2, 3], tags(RoadClass::Secondary))]))
            .unwrap();
        assert_eq!(g.edge_count(), 4);
        assert!(g.edges().all(|(_, e)| e.road_class == Some(RoadClass::Secondary)));
        assert!(g.edges().all(|(_, e)| e.raw.is_some()));
    }

    #[test]
    fn lane_split() {
        let mut t = tags(RoadClass::Primary);
        t.lanes = 4;
        assert_eq!(split_lanes(&record(1, &[], t.clone())), (2, 2));

        t.lanes = 5;
        assert_eq!(split_lanes(&record(1, &[], t.clone())), (2, 2));

        t.lanes = 6;
        t.lanes_psv = 2;
        t.lanes_forward = Some(3);
        assert_eq!(split_lanes(&record(1, &[], t.clone())), (2, 2));

        t.oneway = true;
        t.lanes = 3;
        t.lanes_psv = 1;
        assert_eq!(split_lanes(&record(1, &[], t.clone())).0, 2);

        t.lanes = 0;
        t.lanes_psv = 2;
        assert_eq!(split_lanes(&record(1, &[], t)).0, 0);
    }

    #[test]
    fn directions_carry_their_own_lanes() {
        let mut t = tags(RoadClass::Primary);
        t.lanes = 5;
        t.lanes_forward = Some(3);
        t.lanes_backward = Some(2);
        let g = build_graph(&extract(&[1, 2], vec![record(1, &[1, 2], t)])).unwrap();
        let (a, b) = (g.handle_of(OsmNodeId(1)).unwrap(), g.handle_of(OsmNodeId(2)).unwrap());
        assert_eq!(g.edge(g.find_edge(a, b).unwrap()).unwrap().lanes, 3);
        assert_eq!(g.edge(g.find_edge(b, a).unwrap()).unwrap().lanes, 2);
    }

    #[test]
    fn later_way_wins_shared_pair() {
        let mut first = tags(RoadClass::Primary);
        first.oneway = true;
        first.name = Some("First".into());
        let mut second = first.clone();
        second.name = Some("Second".into());

        let g = build_graph(&extract(
            &[1, 2],
            vec![record(1, &[1, 2], first), record(2, &[1, 2], second)],
        ))
        .unwrap();
        assert_eq!(g.edge_count(), 1);
        let (_, e) = g.edges().next().unwrap();
        assert_eq!(e.way.0, 2);
        assert_eq!(e.name.as_deref(), Some("Second"));
    }

    #[test]
    fn repeated_reference_is_not_a_self_loop() {
        let g = build_graph(&extract(&[1, 2], vec![record(1, &[1, 1, 2], tags(RoadClass::Primary))]))
            .unwrap();
        assert_eq!(g.edge_count(), 2);
        assert!(g.edges().all(|(_, e)| e.tail != e.head));
    }

    #[test]
    fn keeps_largest_component() {
        let g = build_graph(&extract(
            &[1, 2, 3, 10, 11],
            vec![
                record(1, &[1, 2, 3], tags(RoadClass::Primary)),
                record(2, &[10, 11], tags(RoadClass::Primary)),
            ],
        ))
        .unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 4);
        assert!(g.handle_of(OsmNodeId(10)).is_none());
        assert!(is_weakly_connected(&g));
    }

    #[test]
    fn direction_ignored_for_connectivity() {
        let mut t = tags(RoadClass::Primary);
        t.oneway = true;
        // 1 → 2 ← 3: not strongly connected but one weak component.
        let g = build_graph(&extract(
            &[1, 2, 3],
            vec![record(1, &[1, 2], t.clone()), record(2, &[3, 2], t)],
        ))
        .unwrap();
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn no_ways_is_empty_graph() {
        let err = build_graph(&extract(&[1], vec![])).unwrap_err();
        assert!(matches!(err, BuildError::EmptyGraph));
    }

    #[test]
    fn single_node_ways_yield_no_edges() {
        let err = build_graph(&extract(&[1], vec![record(1, &[1], tags(RoadClass::Primary))])).unwrap_err();
        assert!(matches!(err, BuildError::NoEdgesAfterFiltering { ways: 1 }));
    }
}

// ── Geometry Annotator ────────────────────────────────────────────────────────

#[cfg(test)]
mod annotate {
    use tn_core::{GeoPoint, OsmNodeId, WayId};

    use super::helpers::{graph_with, link};
    use crate::{annotate_lengths, Edge, RoadGraph};

    #[test]
    fn length_is_geodesic_miles() {
        let mut g = RoadGraph::new();
        let a = g.add_node(OsmNodeId(1), GeoPoint::new(0.0, 0.0));
        let b = g.add_node(OsmNodeId(2), GeoPoint::new(1.0, 0.0));
        let e = link(&mut g, a, b, 1, 123.0);
        assert_eq!(annotate_lengths(&mut g), 1);
        // One degree of longitude along the WGS-84 equator.
        assert!((g.edge(e).unwrap().length - 69.171).abs() < 0.01);
    }

    #[test]
    fn connectors_keep_zero_length() {
        let (mut g, n) = graph_with(&[1, 2]);
        let e = g.upsert_edge(Edge::new(n[0], n[1], WayId::CONNECTOR));
        assert_eq!(annotate_lengths(&mut g), 0);
        assert_eq!(g.edge(e).unwrap().length, 0.0);
    }
}

// ── Topology Simplifier ───────────────────────────────────────────────────────

#[cfg(test)]
mod simplify {
    use tn_core::RoadClass;

    use super::helpers::{edge, graph_with, link, named_road, road, tee, total_length};
    use crate::{is_weakly_connected, merge_by_rank, run_phase, simplify, Phase};

    #[test]
    fn oneway_chain_collapses() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        let mut ab = edge(n[0], n[1], 7, 0.5);
        ab.lanes = 2;
        ab.name = Some("Main".into());
        let mut bc = edge(n[1], n[2], 7, 0.3);
        bc.lanes = 3;
        bc.name = Some("Main".into());
        g.upsert_edge(ab);
        g.upsert_edge(bc);

        let report = simplify(&mut g).unwrap();
        assert_eq!(report.removed(), 1);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.node(n[1]).is_none());

        let ac = g.edge(g.find_edge(n[0], n[2]).unwrap()).unwrap();
        assert!((ac.length - 0.8).abs() < 1e-12);
        assert_eq!(ac.lanes, 2);
        assert_eq!(ac.way.0, 7);
        assert_eq!(ac.name.as_deref(), Some("Main"));
    }

    #[test]
    fn phase_one_drops_disagreeing_name() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        let mut ab = edge(n[0], n[1], 7, 0.5);
        ab.name = Some("Main".into());
        let mut bc = edge(n[1], n[2], 7, 0.3);
        bc.name = Some("Oak".into());
        g.upsert_edge(ab);
        g.upsert_edge(bc);

        run_phase(&mut g, Phase::Conservative).unwrap();
        let ac = g.edge(g.find_edge(n[0], n[2]).unwrap()).unwrap();
        assert_eq!(ac.name, None);
    }

    #[test]
    fn twoway_chain_collapses() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        road(&mut g, n[0], n[1], 4, 0.5);
        road(&mut g, n[1], n[2], 4, 0.3);

        simplify(&mut g).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 2);
        assert!(g.node(n[1]).is_none());
        for (t, h) in [(n[0], n[2]), (n[2], n[0])] {
            let e = g.edge(g.find_edge(t, h).unwrap()).unwrap();
            assert!((e.length - 0.8).abs() < 1e-12);
            assert_eq!(e.way.0, 4);
        }
    }

    #[test]
    fn long_chain_collapses_in_one_scan() {
        let (mut g, n) = graph_with(&[1, 2, 3, 4, 5]);
        for i in 0..4 {
            road(&mut g, n[i], n[i + 1], 1, 0.25);
        }
        let report = run_phase(&mut g, Phase::Conservative).unwrap();
        assert_eq!(report.per_scan, vec![3, 0]);
        assert_eq!(g.node_count(), 2);
        let e = g.edge(g.find_edge(n[4], n[0]).unwrap()).unwrap();
        assert!((e.length - 1.0).abs() < 1e-12);
    }

    #[test]
    fn phase_one_requires_same_way() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        link(&mut g, n[0], n[1], 1, 0.5);
        link(&mut g, n[1], n[2], 2, 0.3);

        assert_eq!(run_phase(&mut g, Phase::Conservative).unwrap().removed(), 0);
        assert_eq!(run_phase(&mut g, Phase::NameBased).unwrap().removed(), 1);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn turnaround_untouched() {
        let (mut g, n) = graph_with(&[1, 2]);
        road(&mut g, n[0], n[1], 1, 0.5);
        assert_eq!(simplify(&mut g).unwrap().removed(), 0);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn junction_untouched() {
        let (mut g, n) = graph_with(&[1, 2, 3, 4]);
        road(&mut g, n[0], n[1], 1, 0.1);
        road(&mut g, n[1], n[2], 1, 0.1);
        road(&mut g, n[1], n[3], 1, 0.1);
        simplify(&mut g).unwrap();
        assert!(g.node(n[1]).is_some());
        assert_eq!(g.node_count(), 4);
    }

    #[test]
    fn parallel_road_not_overwritten() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        link(&mut g, n[0], n[1], 1, 0.5);
        link(&mut g, n[1], n[2], 1, 0.3);
        link(&mut g, n[0], n[2], 2, 0.9);
        simplify(&mut g).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge(g.find_edge(n[0], n[2]).unwrap()).unwrap().length, 0.9);
    }

    #[test]
    fn zone_node_untouched() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        road(&mut g, n[0], n[1], 1, 0.5);
        road(&mut g, n[1], n[2], 1, 0.3);
        g.node_mut(n[1]).unwrap().zone = true;
        assert_eq!(simplify(&mut g).unwrap().removed(), 0);
    }

    #[test]
    fn named_twoway_joins_across_ways() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        named_road(&mut g, n[0], n[1], 1, "Main");
        named_road(&mut g, n[1], n[2], 2, "Main");
        assert_eq!(run_phase(&mut g, Phase::Conservative).unwrap().removed(), 0);
        assert_eq!(run_phase(&mut g, Phase::NameBased).unwrap().removed(), 1);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn differently_named_twoway_kept() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        named_road(&mut g, n[0], n[1], 1, "Main");
        named_road(&mut g, n[1], n[2], 2, "Oak");
        assert_eq!(simplify(&mut g).unwrap().removed(), 0);
    }

    #[test]
    fn oneway_inbound_blocks_named_twoway() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        named_road(&mut g, n[0], n[1], 1, "Main");
        named_road(&mut g, n[1], n[2], 2, "Main");
        let e = g.find_edge(n[0], n[1]).unwrap();
        g.edge_mut(e).unwrap().raw.as_mut().unwrap().oneway = true;
        assert_eq!(run_phase(&mut g, Phase::NameBased).unwrap().removed(), 0);
    }

    #[test]
    fn more_local_class_wins() {
        let (_, n) = graph_with(&[1, 2, 3]);
        let mut ie = edge(n[0], n[1], 1, 0.2);
        ie.road_class = Some(RoadClass::Primary);
        ie.name = Some("Highway 9".into());
        ie.max_speed = Some(40.0);
        ie.lanes = 2;
        let mut oe = edge(n[1], n[2], 2, 0.3);
        oe.road_class = Some(RoadClass::Tertiary);
        oe.name = Some("Elm".into());
        oe.max_speed = Some(25.0);
        oe.lanes = 0;
        oe.raw.as_mut().unwrap().oneway = true;

        let m = merge_by_rank(&ie, &oe);
        assert_eq!(m.tail, n[0]);
        assert_eq!(m.head, n[2]);
        assert_eq!(m.road_class, Some(RoadClass::Tertiary));
        assert_eq!(m.name.as_deref(), Some("Elm"));
        assert_eq!(m.max_speed, Some(25.0));
        assert_eq!(m.lanes, 2);
        assert_eq!(m.way.0, 1);
        assert!(m.is_oneway());
        assert!((m.length - 0.5).abs() < 1e-12);
    }

    #[test]
    fn equal_rank_keeps_inbound_identity() {
        let (_, n) = graph_with(&[1, 2, 3]);
        let mut ie = edge(n[0], n[1], 1, 0.2);
        ie.name = Some("First".into());
        let mut oe = edge(n[1], n[2], 2, 0.3);
        oe.name = Some("Second".into());
        oe.max_speed = Some(35.0);

        let m = merge_by_rank(&ie, &oe);
        assert_eq!(m.name.as_deref(), Some("First"));
        assert_eq!(m.max_speed, Some(35.0));
        assert_eq!(m.lanes, 0);
    }

    #[test]
    fn idempotent() {
        let (mut g, _) = tee();
        simplify(&mut g).unwrap();
        let after = g.counts();
        let again = simplify(&mut g).unwrap();
        assert_eq!(again.removed(), 0);
        assert_eq!(g.counts(), after);
    }

    /// `1 ↔ 2` is way 3 "Oak".  Around node 3 the inbound edges are way 3
    /// and the outbound ones way 9, all named "Main".  Joining at 3 leaves
    /// node 2 with four way-3 edges but two names, which only the
    /// conservative phase can contract.
    #[test]
    fn name_merge_feeds_conservative_phase() {
        let (mut g, n) = graph_with(&[1, 2, 3, 4]);
        named_road(&mut g, n[0], n[1], 3, "Oak");
        for (t, h, way) in [(n[1], n[2], 3), (n[2], n[1], 9), (n[2], n[3], 9), (n[3], n[2], 3)] {
            let mut e = edge(t, h, way, 0.1);
            e.name = Some("Main".into());
            g.upsert_edge(e);
        }

        let report = simplify(&mut g).unwrap();
        assert_eq!(report.name_based.removed(), 1);
        assert_eq!(report.conservative.removed(), 1);
        assert_eq!(report.rounds, 3);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 2);

        let ad = g.edge(g.find_edge(n[0], n[3]).unwrap()).unwrap();
        assert!((ad.length - 0.3).abs() < 1e-12);
        assert_eq!(ad.way.0, 3);
        assert_eq!(ad.name, None);

        assert_eq!(simplify(&mut g).unwrap().removed(), 0);
    }

    #[test]
    fn preserves_connectivity_and_length() {
        let (mut g, n) = tee();
        let before = total_length(&g);
        assert!(is_weakly_connected(&g));

        simplify(&mut g).unwrap();
        assert!(is_weakly_connected(&g));
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 6);
        assert!((total_length(&g) - before).abs() < 1e-9);

        let leg = g.edge(g.find_edge(n[2], n[6]).unwrap()).unwrap();
        assert!((leg.length - 1.1).abs() < 1e-12);
        for survivor in [n[0], n[2], n[4], n[6]] {
            assert!(g.node(survivor).is_some());
        }
    }

    #[test]
    fn scans_bounded_by_node_count() {
        let (mut g, _) = tee();
        let initial = g.node_count();
        let report = simplify(&mut g).unwrap();
        assert_eq!(report.rounds, 2);
        for phase in [&report.conservative, &report.name_based] {
            assert!(phase.scans <= 2 * (initial + 1));
            assert_eq!(phase.per_scan.last(), Some(&0));
        }
    }
}

// ── Attribute Inferencer ──────────────────────────────────────────────────────

#[cfg(test)]
mod infer {
    use tn_core::RoadClass;

    use super::helpers::{edge, graph_with, link, road};
    use crate::{infer_lanes, infer_speeds, median};

    #[test]
    fn median_conventions() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut [30.0]), Some(30.0));
    }

    #[test]
    fn speed_spreads_from_neighbours() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        road(&mut g, n[0], n[1], 1, 0.1);
        road(&mut g, n[1], n[2], 2, 0.1);
        for h in [g.find_edge(n[0], n[1]).unwrap(), g.find_edge(n[1], n[0]).unwrap()] {
            g.edge_mut(h).unwrap().max_speed = Some(30.0);
        }

        let p = infer_speeds(&mut g);
        assert_eq!(p.resolved, 2);
        assert_eq!(p.unresolved, 0);
        assert!(g.edges().all(|(_, e)| e.max_speed == Some(30.0)));
    }

    #[test]
    fn updates_visible_within_a_scan() {
        let (mut g, n) = graph_with(&[1, 2, 3, 4]);
        let first = link(&mut g, n[0], n[1], 1, 0.1);
        link(&mut g, n[1], n[2], 1, 0.1);
        link(&mut g, n[2], n[3], 1, 0.1);
        g.edge_mut(first).unwrap().max_speed = Some(40.0);

        let p = infer_speeds(&mut g);
        assert_eq!(p.resolved, 2);
        // Everything resolved in the first scan; the second finds nothing.
        assert_eq!(p.scans, 2);
    }

    #[test]
    fn unreachable_values_stay_unknown() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        road(&mut g, n[0], n[1], 1, 0.1);
        road(&mut g, n[1], n[2], 1, 0.1);
        let p = infer_speeds(&mut g);
        assert_eq!(p.resolved, 0);
        assert_eq!(p.unresolved, 4);
        assert_eq!(p.scans, 1);
        assert!(g.edges().all(|(_, e)| e.max_speed.is_none()));
    }

    #[test]
    fn lanes_clamped_to_class_maximum() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        let mut wide = edge(n[0], n[1], 1, 0.1);
        wide.road_class = Some(RoadClass::Motorway);
        wide.lanes = 6;
        g.upsert_edge(wide);
        let mut narrow = edge(n[1], n[2], 2, 0.1);
        narrow.road_class = Some(RoadClass::Secondary);
        let h = g.upsert_edge(narrow);

        let p = infer_lanes(&mut g);
        assert_eq!(p.resolved, 1);
        assert_eq!(g.edge(h).unwrap().lanes, 2);
    }

    #[test]
    fn even_lane_median_floors() {
        let (mut g, n) = graph_with(&[1, 2, 3, 4]);
        let mut a = edge(n[0], n[1], 1, 0.1);
        a.lanes = 1;
        g.upsert_edge(a);
        let mut b = edge(n[3], n[1], 1, 0.1);
        b.lanes = 2;
        g.upsert_edge(b);
        let h = link(&mut g, n[1], n[2], 1, 0.1);

        infer_lanes(&mut g);
        assert_eq!(g.edge(h).unwrap().lanes, 1);
    }

    #[test]
    fn classless_edge_clamps_to_zero() {
        let (mut g, n) = graph_with(&[1, 2, 3]);
        let mut known = edge(n[0], n[1], 1, 0.1);
        known.lanes = 2;
        g.upsert_edge(known);
        let mut bare = edge(n[1], n[2], 2, 0.1);
        bare.road_class = None;
        let h = g.upsert_edge(bare);

        let p = infer_lanes(&mut g);
        assert_eq!(p.resolved, 0);
        assert_eq!(p.unresolved, 1);
        assert_eq!(g.edge(h).unwrap().lanes, 0);
    }
}

// ── Network Parameterizer ─────────────────────────────────────────────────────

#[cfg(test)]
mod parameterize {
    use tn_core::{OwnerId, RoadClass};

    use super::helpers::{edge, graph_with};
    use crate::{parameterize, BprCoefficients};

    #[test]
    fn capacity_from_class_and_lanes() {
        let (mut g, n) = graph_with(&[1, 2]);
        let mut e = edge(n[0], n[1], 1, 0.5);
        e.lanes = 3;
        e.max_speed = Some(30.0);
        let h = g.upsert_edge(e);

        let report = parameterize(&mut g, BprCoefficients::DEFAULT);
        assert_eq!(report.edges, 1);
        assert_eq!(report.infinite_time, 0);
        let e = g.edge(h).unwrap();
        assert_eq!(e.capacity, 2100.0);
        assert!((e.free_flow_time - 0.5 / 30.0).abs() < 1e-12);
        assert_eq!(e.bpr, BprCoefficients { b: 0.7, power: 0.4 });
    }

    #[test]
    fn unknown_class_has_no_capacity() {
        let (mut g, n) = graph_with(&[1, 2]);
        let mut e = edge(n[0], n[1], 1, 0.5);
        e.road_class = None;
        e.lanes = 4;
        let h = g.upsert_edge(e);

        let report = parameterize(&mut g, BprCoefficients::DEFAULT);
        assert_eq!(report.zero_capacity, 1);
        assert_eq!(g.edge(h).unwrap().capacity, 0.0);
    }

    #[test]
    fn unresolved_speed_gives_infinite_time() {
        let (mut g, n) = graph_with(&[1, 2]);
        let h = g.upsert_edge(edge(n[0], n[1], 1, 0.5));
        let report = parameterize(&mut g, BprCoefficients::DEFAULT);
        assert_eq!(report.infinite_time, 1);
        assert_eq!(g.edge(h).unwrap().free_flow_time, f64::INFINITY);
    }

    #[test]
    fn flattens_tags_and_resets_zones() {
        let (mut g, n) = graph_with(&[1, 2]);
        let mut e = edge(n[0], n[1], 1, 0.5);
        e.owner = Some(OwnerId(9));
        e.road_class = Some(RoadClass::Tertiary);
        let h = g.upsert_edge(e);
        g.node_mut(n[0]).unwrap().zone = true;

        parameterize(&mut g, BprCoefficients { b: 0.15, power: 4.0 });
        let e = g.edge(h).unwrap();
        assert!(e.raw.is_none());
        assert!(e.owner.is_none());
        assert_eq!(e.bpr.power, 4.0);
        assert!(g.nodes().all(|(_, n)| !n.zone));
    }
}

// ── Zones ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod zones {
    use tn_core::{OsmNodeId, WayId};

    use super::helpers::{graph_with, road};
    use crate::zones::{CONNECTOR_CAPACITY, CONNECTOR_MAX_SPEED};
    use crate::{attach_zones, NetworkError};

    #[test]
    fn zone_joined_to_members() {
        let (mut g, n) = graph_with(&[100, 102, 104]);
        road(&mut g, n[0], n[1], 1, 0.1);
        road(&mut g, n[1], n[2], 1, 0.1);

        let zones = attach_zones(&mut g, &[vec![OsmNodeId(100), OsmNodeId(104)]]).unwrap();
        assert_eq!(zones.len(), 1);
        let z = zones[0];
        let node = g.node(z).unwrap();
        assert_eq!(node.id, OsmNodeId(1));
        assert!(node.zone);
        assert!((node.pos.lon - 1.02).abs() < 1e-12);

        assert_eq!(g.edge_count(), 4 + 4);
        for m in [n[0], n[2]] {
            for (t, h) in [(z, m), (m, z)] {
                let c = g.edge(g.find_edge(t, h).unwrap()).unwrap();
                assert_eq!(c.way, WayId::CONNECTOR);
                assert_eq!(c.capacity, CONNECTOR_CAPACITY);
                assert_eq!(c.max_speed, Some(CONNECTOR_MAX_SPEED));
                assert_eq!(c.lanes, 1);
                assert_eq!(c.length, 0.0);
                assert_eq!(c.free_flow_time, 0.0);
                assert_eq!(c.road_class, None);
            }
        }
    }

    #[test]
    fn zones_numbered_from_one() {
        let (mut g, _) = graph_with(&[100, 101]);
        let zones = attach_zones(&mut g, &[vec![OsmNodeId(100)], vec![OsmNodeId(101)]]).unwrap();
        let ids: Vec<_> = zones.iter().map(|&z| g.node(z).unwrap().id).collect();
        assert_eq!(ids, vec![OsmNodeId(1), OsmNodeId(2)]);
    }

    #[test]
    fn id_collision_attaches_nothing() {
        let (mut g, _) = graph_with(&[2, 100]);
        let err = attach_zones(&mut g, &[vec![OsmNodeId(100)], vec![OsmNodeId(100)]]).unwrap_err();
        assert!(matches!(err, NetworkError::ZoneIdCollision(OsmNodeId(2))));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn bad_groups_rejected() {
        let (mut g, _) = graph_with(&[100]);
        assert!(matches!(
            attach_zones(&mut g, &[vec![]]).unwrap_err(),
            NetworkError::EmptyZone { zone: 1 }
        ));
        assert!(matches!(
            attach_zones(&mut g, &[vec![OsmNodeId(7)]]).unwrap_err(),
            NetworkError::UnknownNode(OsmNodeId(7))
        ));
        assert_eq!(g.node_count(), 1);
    }
}

// ── Spatial index ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod spatial {
    use tn_core::{GeoPoint, OsmNodeId};

    use super::helpers::graph_with;
    use crate::{attach_zones, SpatialIndex};

    #[test]
    fn nearest_and_k_nearest() {
        let (g, n) = graph_with(&[1, 5, 9]);
        let idx = SpatialIndex::build(&g);
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.nearest(GeoPoint::new(0.06, 0.0)), Some(n[1]));
        assert_eq!(idx.snap(GeoPoint::new(0.0, 0.0)), Some(OsmNodeId(1)));
        assert_eq!(idx.k_nearest(GeoPoint::new(0.1, 0.0), 2), vec![n[2], n[1]]);
    }

    #[test]
    fn zone_nodes_not_indexed() {
        let (mut g, _) = graph_with(&[100, 101]);
        attach_zones(&mut g, &[vec![OsmNodeId(100)]]).unwrap();
        let idx = SpatialIndex::build(&g);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.snap(GeoPoint::new(1.0, 0.0)), Some(OsmNodeId(100)));
    }

    #[test]
    fn empty_graph_snaps_nowhere() {
        let (g, _) = graph_with(&[]);
        let idx = SpatialIndex::build(&g);
        assert!(idx.is_empty());
        assert_eq!(idx.nearest(GeoPoint::new(0.0, 0.0)), None);
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod pipeline {
    use tn_core::{OsmNodeId, RoadClass};
    use tn_osm::EntityMeta;

    use super::helpers::{stamped, tee_document};
    use crate::{build_network, is_weakly_connected, GraphCounts, NetworkError, PipelineConfig};

    #[test]
    fn end_to_end() {
        let summary = build_network(tee_document(stamped()), &PipelineConfig::default()).unwrap();

        // Node 8 only hangs off a footway and never enters the graph.
        assert_eq!(summary.original, GraphCounts { nodes: 7, edges: 12 });
        assert_eq!(summary.simplified, GraphCounts { nodes: 4, edges: 6 });
        assert!(is_weakly_connected(&summary.graph));

        assert!((summary.centroid.lon - -121.97).abs() < 1e-9);
        assert!((summary.centroid.lat - 37.005).abs() < 1e-9);

        let g = &summary.graph;
        let (a, b) = (g.handle_of(OsmNodeId(3)).unwrap(), g.handle_of(OsmNodeId(7)).unwrap());
        let branch = g.edge(g.find_edge(a, b).unwrap()).unwrap();
        assert_eq!(branch.road_class, Some(RoadClass::Tertiary));
        assert_eq!(branch.max_speed, Some(30.0));
        assert_eq!(branch.lanes, 1);
        assert_eq!(branch.capacity, 500.0);
        assert!(branch.free_flow_time.is_finite());
        assert!(branch.raw.is_none());

        assert_eq!(summary.inference.speed.unresolved, 0);
        assert_eq!(summary.parameters.infinite_time, 0);
    }

    #[test]
    fn missing_metadata_repaired_once() {
        let bare = EntityMeta::default();
        let summary = build_network(tee_document(bare), &PipelineConfig::default()).unwrap();
        assert_eq!(summary.simplified.nodes, 4);
    }

    #[test]
    fn repair_disabled_surfaces_ingest_error() {
        let config = PipelineConfig { repair: None, ..PipelineConfig::default() };
        let err = build_network(tee_document(EntityMeta::default()), &config).unwrap_err();
        match err {
            NetworkError::Ingest(e) => assert!(e.is_missing_changeset()),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
