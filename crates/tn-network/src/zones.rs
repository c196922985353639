//! Traffic analysis zones: synthetic demand nodes wired to the road network.

use tn_core::{GeoPoint, NodeHandle, OsmNodeId, WayId};

use crate::graph::{BprCoefficients, Edge, RoadGraph};
use crate::{NetworkError, NetworkResult};

// Connector attributes.  Connectors are effectively free and uncongestible.
pub const CONNECTOR_CAPACITY:  f64 = 15_000.0;
pub const CONNECTOR_MAX_SPEED: f64 = 200.0;
pub const CONNECTOR_LANES:     u32 = 1;

/// Attach one zone per group of member nodes.
///
/// Zone `i` (0-based) becomes node id `i + 1`, placed at the mean position of
/// its members and flagged `zone`.  It is joined to every member by a pair
/// of connector edges (zero length and free-flow time, no road class).
///
/// Returns the zone handles in group order.  Nothing is attached on error.
///
/// # Errors
///
/// - [`NetworkError::EmptyZone`] for a group without members.
/// - [`NetworkError::UnknownNode`] for a member not in the graph.
/// - [`NetworkError::ZoneIdCollision`] if a road node already uses a zone id.
pub fn attach_zones(
    graph: &mut RoadGraph,
    groups: &[Vec<OsmNodeId>],
) -> NetworkResult<Vec<NodeHandle>> {
    let mut resolved = Vec::with_capacity(groups.len());
    for (i, group) in groups.iter().enumerate() {
        let id = zone_id(i);
        if graph.handle_of(id).is_some() {
            return Err(NetworkError::ZoneIdCollision(id));
        }
        if group.is_empty() {
            return Err(NetworkError::EmptyZone { zone: i + 1 });
        }
        let members = group
            .iter()
            .map(|&m| graph.handle_of(m).ok_or(NetworkError::UnknownNode(m)))
            .collect::<NetworkResult<Vec<_>>>()?;
        let pos = GeoPoint::mean(members.iter().filter_map(|&m| graph.pos(m)))
            .ok_or(NetworkError::EmptyZone { zone: i + 1 })?;
        resolved.push((id, pos, members));
    }

    let mut zones = Vec::with_capacity(resolved.len());
    for (id, pos, members) in resolved {
        let z = graph.add_node(id, pos);
        if let Some(node) = graph.node_mut(z) {
            node.zone = true;
        }
        for m in members {
            graph.upsert_edge(connector(z, m));
            graph.upsert_edge(connector(m, z));
        }
        zones.push(z);
    }

    log::info!("zones: attached {} zones", zones.len());
    Ok(zones)
}

/// Node id of the zone at `index` (0-based).
pub fn zone_id(index: usize) -> OsmNodeId {
    OsmNodeId(index as i64 + 1)
}

fn connector(tail: NodeHandle, head: NodeHandle) -> Edge {
    Edge {
        max_speed: Some(CONNECTOR_MAX_SPEED),
        lanes: CONNECTOR_LANES,
        length: 0.0,
        capacity: CONNECTOR_CAPACITY,
        free_flow_time: 0.0,
        bpr: BprCoefficients::DEFAULT,
        ..Edge::new(tail, head, WayId::CONNECTOR)
    }
}
