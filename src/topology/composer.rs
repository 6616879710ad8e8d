//! Topology composition.
//!
//! Creates the node set in a fixed order (access points, clients, gateway,
//! remote host), binds each access point and client to its planned position
//! through an explicit slot map, checks positions against the buildings they
//! claim to be in, attaches clients to their nearest access point, and lays
//! out addresses and static routes.

use std::collections::HashMap;

use log::{debug, info};

use crate::config::BackhaulConfig;
use crate::error::ScenarioError;
use crate::ip::{AddressRegistry, SubnetAllocator, BACKHAUL_SUBNET, CLIENT_SUBNET};
use crate::placement::{locate_in, Building, IndoorLocation, PlacedPosition, Placement, Slot};
use super::types::{
    Attachment, BackhaulLink, Node, NodeId, Role, Route, RouteKind, Topology,
};

/// Interface index of the LTE device on clients and of the point-to-point
/// device on the remote host (interface 0 is loopback)
const PRIMARY_INTERFACE: u32 = 1;

pub struct TopologyComposer<'a> {
    buildings: &'a [Building],
    backhaul: &'a BackhaulConfig,
}

impl<'a> TopologyComposer<'a> {
    pub fn new(buildings: &'a [Building], backhaul: &'a BackhaulConfig) -> Self {
        Self { buildings, backhaul }
    }

    /// Compose the topology for the given role counts and placement.
    ///
    /// Fails without returning anything partial when the placement does not
    /// match the node set or a position contradicts its declared building.
    pub fn compose(
        &self,
        access_points: usize,
        clients: usize,
        placement: &Placement,
    ) -> Result<Topology, ScenarioError> {
        let slots = slot_map(access_points, clients, placement)?;

        let mut nodes = Vec::with_capacity(access_points + clients + 2);
        let mut next_id = 0u32;
        let mut create = |nodes: &mut Vec<Node>, role: Role, index: usize, name: String| {
            let id = NodeId(next_id);
            next_id += 1;
            nodes.push(Node {
                id,
                role,
                index,
                name,
                position: None,
                indoor: None,
                address: None,
            });
            id
        };

        let ap_ids: Vec<NodeId> = (0..access_points)
            .map(|i| create(&mut nodes, Role::AccessPoint, i, format!("enb{}", i)))
            .collect();
        let client_ids: Vec<NodeId> = (0..clients)
            .map(|i| create(&mut nodes, Role::Client, i, format!("ue{}", i)))
            .collect();
        let gateway = create(&mut nodes, Role::Gateway, 0, "pgw".to_string());
        let remote_host = create(&mut nodes, Role::RemoteHost, 0, "remote-host".to_string());

        // Static mobility: each position is bound exactly once, by slot
        for (slot, id) in ap_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (Slot::AccessPoint(i), *id))
            .chain(client_ids.iter().enumerate().map(|(i, id)| (Slot::Client(i), *id)))
        {
            let planned = slots.get(&slot).copied().ok_or(ScenarioError::PositionCountMismatch {
                nodes: access_points + clients,
                positions: placement.len(),
            })?;
            let indoor = self.check_consistency(id, planned)?;
            let node = &mut nodes[id.0 as usize];
            node.position = Some(planned.position);
            node.indoor = indoor;
        }
        debug!("Mobility consistent for {} positioned nodes", slots.len());

        let attachments = self.attach(&nodes, &ap_ids, &client_ids);

        let mut registry = AddressRegistry::new();
        let mut backhaul_allocator = SubnetAllocator::new(BACKHAUL_SUBNET);
        let gateway_address = backhaul_allocator.allocate()?;
        registry.register(gateway_address, gateway)?;
        let remote_address = backhaul_allocator.allocate()?;
        registry.register(remote_address, remote_host)?;
        nodes[gateway.0 as usize].address = Some(gateway_address);
        nodes[remote_host.0 as usize].address = Some(remote_address);

        let client_gateway = CLIENT_SUBNET
            .host(1)
            .ok_or(crate::ip::AddressError::Exhausted { subnet: CLIENT_SUBNET })?;
        let mut client_allocator = SubnetAllocator::with_reserved(CLIENT_SUBNET, 1);
        let mut routes = Vec::with_capacity(clients + 1);
        for id in &client_ids {
            let addr = client_allocator.allocate()?;
            registry.register(addr, *id)?;
            nodes[id.0 as usize].address = Some(addr);
            routes.push(Route {
                node: *id,
                kind: RouteKind::Default,
                destination: crate::ip::Subnet::new(std::net::Ipv4Addr::UNSPECIFIED, 0),
                next_hop: Some(client_gateway),
                interface: PRIMARY_INTERFACE,
            });
        }
        routes.push(Route {
            node: remote_host,
            kind: RouteKind::Network,
            destination: CLIENT_SUBNET,
            next_hop: None,
            interface: PRIMARY_INTERFACE,
        });

        info!(
            "Composed topology: {} access points, {} clients, remote host {} via gateway {}",
            access_points, clients, remote_address, gateway_address
        );
        debug!("Registered {} node addresses", registry.len());

        Ok(Topology {
            nodes,
            access_points: ap_ids,
            clients: client_ids,
            gateway,
            remote_host,
            attachments,
            routes,
            backhaul: BackhaulLink {
                gateway,
                remote_host,
                gateway_address,
                remote_address,
                data_rate: self.backhaul.data_rate.clone(),
                mtu: self.backhaul.mtu,
                delay: self.backhaul.delay,
            },
            client_gateway,
        })
    }

    /// Check a planned position against the building it claims to be in
    fn check_consistency(
        &self,
        node: NodeId,
        planned: &PlacedPosition,
    ) -> Result<Option<IndoorLocation>, ScenarioError> {
        match planned.building {
            Some(index) => {
                let building = self.buildings.get(index).ok_or_else(|| {
                    ScenarioError::InconsistentPlacement {
                        node,
                        reason: format!(
                            "claims building {} but only {} buildings exist",
                            index,
                            self.buildings.len()
                        ),
                    }
                })?;
                let cell = building.locate(&planned.position).ok_or_else(|| {
                    ScenarioError::InconsistentPlacement {
                        node,
                        reason: format!(
                            "position ({}) lies outside building {} it claims to be in",
                            planned.position, index
                        ),
                    }
                })?;
                Ok(Some(IndoorLocation { building: index, cell }))
            }
            None => Ok(locate_in(self.buildings, &planned.position)),
        }
    }

    /// Attach every client to its nearest access point, ties to the lowest index
    fn attach(&self, nodes: &[Node], ap_ids: &[NodeId], client_ids: &[NodeId]) -> Vec<Attachment> {
        client_ids
            .iter()
            .filter_map(|client| {
                let position = nodes[client.0 as usize].position?;
                let mut best: Option<(usize, f64)> = None;
                for (ap_index, ap) in ap_ids.iter().enumerate() {
                    let Some(ap_position) = nodes[ap.0 as usize].position else {
                        continue;
                    };
                    let distance = position.distance_to(&ap_position);
                    if best.map_or(true, |(_, d)| distance < d) {
                        best = Some((ap_index, distance));
                    }
                }
                best.map(|(ap_index, distance)| {
                    debug!("Client {} attaches to access point {} ({:.1} m)", client, ap_index, distance);
                    Attachment {
                        client: *client,
                        access_point: ap_ids[ap_index],
                        access_point_index: ap_index,
                    }
                })
            })
            .collect()
    }
}

/// Explicit slot -> position map, rejecting any placement that does not
/// cover the node set exactly once
fn slot_map(
    access_points: usize,
    clients: usize,
    placement: &Placement,
) -> Result<HashMap<Slot, &PlacedPosition>, ScenarioError> {
    let expected = access_points + clients;
    let mismatch = || ScenarioError::PositionCountMismatch {
        nodes: expected,
        positions: placement.len(),
    };

    if placement.len() != expected {
        return Err(mismatch());
    }

    let mut slots = HashMap::with_capacity(expected);
    for entry in placement.entries() {
        let in_range = match entry.slot {
            Slot::AccessPoint(i) => i < access_points,
            Slot::Client(i) => i < clients,
        };
        if !in_range || slots.insert(entry.slot, entry).is_some() {
            return Err(mismatch());
        }
    }
    Ok(slots)
}
