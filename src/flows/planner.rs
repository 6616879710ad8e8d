//! Flow enumeration.
//!
//! For every client the planner emits, in order, its video flow and then
//! one flow per enabled generic direction. Flow ids are handed out in that
//! order, so the same topology and configuration always yield the same ids.

use log::{debug, info};

use crate::config::{FlowConfig, GenericTransport};
use crate::error::ScenarioError;
use crate::policy::StartPolicy;
use crate::topology::{NodeId, Topology};
use super::ports::PortPlan;
use super::types::{Direction, DirectionSet, Flow, FlowId, ProtocolClass, TrafficProfile};

/// Planned flows of a scenario
#[derive(Debug, Clone, Default)]
pub struct FlowSet {
    flows: Vec<Flow>,
}

impl FlowSet {
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.flows.iter().filter(|f| f.direction == direction).count()
    }

    pub fn for_client(&self, index: usize) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(move |f| f.client_index == index)
    }

    /// Generic (non-video) flows in plan order
    pub fn generic(&self) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(|f| f.direction != Direction::Video)
    }

    /// True when no two flows share a (destination, port) pair
    pub fn has_unique_destinations(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.flows
            .iter()
            .all(|f| seen.insert((f.destination, f.port)))
    }
}

pub struct FlowPlanner<'a> {
    topology: &'a Topology,
    config: &'a FlowConfig,
    start: &'a StartPolicy,
}

impl<'a> FlowPlanner<'a> {
    pub fn new(topology: &'a Topology, config: &'a FlowConfig, start: &'a StartPolicy) -> Self {
        Self { topology, config, start }
    }

    fn enabled(&self) -> DirectionSet {
        DirectionSet {
            downlink: self.config.downlink,
            uplink: self.config.uplink,
            peer: self.config.peer,
        }
    }

    /// Generic directions that will actually be planned
    pub fn effective_directions(&self) -> Vec<Direction> {
        let enabled = self.enabled();
        let mut directions = Vec::with_capacity(3);
        if enabled.downlink {
            directions.push(Direction::Downlink);
        }
        if enabled.uplink {
            directions.push(Direction::Uplink);
        }
        if enabled.peer {
            if self.topology.access_point_count() < 2 {
                debug!("Peer flows need at least two access points, skipping");
            } else if self.topology.client_count() < 2 {
                debug!("Peer flows need at least two clients, skipping");
            } else {
                directions.push(Direction::Peer);
            }
        }
        directions
    }

    fn generic_protocol(&self) -> ProtocolClass {
        match self.config.transport {
            GenericTransport::Datagram => ProtocolClass::BestEffortDatagram,
            GenericTransport::Stream => ProtocolClass::ReliableStream,
        }
    }

    fn profile(&self) -> TrafficProfile {
        TrafficProfile {
            interval: self.config.packet_interval,
            max_packets: self.config.max_packets,
            packet_size: self.config.packet_size,
        }
    }

    /// Client index that client `index` sends peer traffic to: the first
    /// other client served by the next access point around the ring, else
    /// the next client index. Never `index` itself.
    pub fn peer_of(&self, index: usize) -> Result<usize, ScenarioError> {
        let clients = self.topology.client_count();
        if index >= clients {
            return Err(ScenarioError::ClientIndexOutOfRange { index, count: clients });
        }
        if clients < 2 {
            return Err(ScenarioError::DirectionNotPlanned {
                direction: Direction::Peer.as_str(),
            });
        }
        let target_ap = (index + 1) % self.topology.access_point_count().max(1);
        Ok(self
            .topology
            .clients_of(target_ap)
            .into_iter()
            .find(|client| *client != index)
            .unwrap_or((index + 1) % clients))
    }

    pub fn plan(&self) -> Result<FlowSet, ScenarioError> {
        let clients = self.topology.client_count();
        let directions = self.effective_directions();
        let ports = PortPlan::new(&self.config.ports, &directions, clients)?;

        let remote = self.topology.remote_host();
        let remote_address = self.topology.remote_address();
        let protocol = self.generic_protocol();

        let mut flows = Vec::with_capacity(clients * (1 + directions.len()));
        let mut next_id = 0u32;
        let mut id = || {
            let id = FlowId(next_id);
            next_id += 1;
            id
        };

        for index in 0..clients {
            let client = self.topology.client(index)?;
            let client_address = client.address.ok_or_else(|| {
                ScenarioError::InconsistentPlacement {
                    node: client.id,
                    reason: "client has no address".to_string(),
                }
            })?;

            push(
                &mut flows,
                Flow {
                    id: id(),
                    client_index: index,
                    direction: Direction::Video,
                    protocol: ProtocolClass::VideoSegmentStream,
                    source: remote,
                    destination: client.id,
                    destination_address: client_address,
                    port: ports.port(Direction::Video, index)?,
                    start: self.start.client_start(index),
                    stop: None,
                    profile: None,
                },
            );

            if directions.is_empty() {
                continue;
            }
            let (start, stop) = self.start.generic_window(index)?;

            for direction in &directions {
                let (source, destination, destination_address) = match direction {
                    Direction::Downlink => (remote, client.id, client_address),
                    Direction::Uplink => (client.id, remote, remote_address),
                    Direction::Peer => {
                        let peer = self.topology.client(self.peer_of(index)?)?;
                        (client.id, peer.id, peer_address(peer.id, peer.address)?)
                    }
                    Direction::Video => continue,
                };
                push(
                    &mut flows,
                    Flow {
                        id: id(),
                        client_index: index,
                        direction: *direction,
                        protocol,
                        source,
                        destination,
                        destination_address,
                        port: ports.port(*direction, index)?,
                        start,
                        stop: Some(stop),
                        profile: Some(self.profile()),
                    },
                );
            }
        }

        info!(
            "Planned {} flows for {} clients (directions: video{})",
            flows.len(),
            clients,
            directions
                .iter()
                .map(|d| format!(", {}", d.as_str()))
                .collect::<String>()
        );

        Ok(FlowSet { flows })
    }
}

fn push(flows: &mut Vec<Flow>, flow: Flow) {
    debug!(
        "{} {} client {} {} -> {}:{}",
        flow.id,
        flow.direction.as_str(),
        flow.client_index,
        flow.source,
        flow.destination_address,
        flow.port
    );
    flows.push(flow);
}

fn peer_address(
    node: NodeId,
    address: Option<std::net::Ipv4Addr>,
) -> Result<std::net::Ipv4Addr, ScenarioError> {
    address.ok_or_else(|| ScenarioError::InconsistentPlacement {
        node,
        reason: "peer client has no address".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackhaulConfig, ListedPosition, PlacementConfig, PlacementMode, ScheduleConfig};
    use crate::placement::PlacementPlanner;
    use crate::topology::TopologyComposer;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn topology(access_points: usize, clients: usize) -> Topology {
        let placement = PlacementPlanner::new(&PlacementConfig::default(), &[], 60.0, 1)
            .plan(access_points, clients)
            .unwrap();
        TopologyComposer::new(&[], &BackhaulConfig::default())
            .compose(access_points, clients, &placement)
            .unwrap()
    }

    fn plan(topology: &Topology, config: &FlowConfig) -> Result<FlowSet, ScenarioError> {
        let start = StartPolicy::from(&ScheduleConfig::default());
        FlowPlanner::new(topology, config, &start).plan()
    }

    #[test]
    fn test_counts_for_every_direction_combination() {
        let topology = topology(2, 5);
        for mask in 0..8u8 {
            let config = FlowConfig {
                downlink: mask & 1 != 0,
                uplink: mask & 2 != 0,
                peer: mask & 4 != 0,
                ..Default::default()
            };
            let flows = plan(&topology, &config).unwrap();
            let enabled = mask.count_ones() as usize;

            assert_eq!(flows.count(Direction::Video), 5);
            assert_eq!(flows.len(), 5 * (1 + enabled), "mask {:#05b}", mask);
            assert!(flows.has_unique_destinations());

            for direction in [Direction::Downlink, Direction::Uplink, Direction::Peer] {
                let ports: BTreeSet<u16> = flows
                    .flows()
                    .iter()
                    .filter(|f| f.direction == direction)
                    .map(|f| f.port)
                    .collect();
                assert_eq!(ports.len(), flows.count(direction));
            }
        }
    }

    #[test]
    fn test_one_access_point_three_clients() {
        let topology = topology(1, 3);
        let flows = plan(&topology, &FlowConfig::default()).unwrap();

        assert_eq!(flows.len(), 9);
        let ports = |direction| -> Vec<u16> {
            flows
                .flows()
                .iter()
                .filter(|f| f.direction == direction)
                .map(|f| f.port)
                .collect()
        };
        assert_eq!(ports(Direction::Video), vec![80, 80, 80]);
        assert_eq!(ports(Direction::Downlink), vec![1100, 1101, 1102]);
        assert_eq!(ports(Direction::Uplink), vec![2000, 2001, 2002]);

        let first: Vec<_> = flows.for_client(0).map(|f| f.direction).collect();
        assert_eq!(first, vec![Direction::Video, Direction::Downlink, Direction::Uplink]);

        let ids: Vec<u32> = flows.flows().iter().map(|f| f.id.0).collect();
        assert_eq!(ids, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_flow_endpoints() {
        let topology = topology(1, 2);
        let flows = plan(&topology, &FlowConfig::default()).unwrap();
        let client = topology.client(1).unwrap();

        for flow in flows.for_client(1) {
            match flow.direction {
                Direction::Video | Direction::Downlink => {
                    assert_eq!(flow.source, topology.remote_host());
                    assert_eq!(flow.destination, client.id);
                    assert_eq!(Some(flow.destination_address), client.address);
                }
                Direction::Uplink => {
                    assert_eq!(flow.source, client.id);
                    assert_eq!(flow.destination_address, topology.remote_address());
                }
                Direction::Peer => unreachable!(),
            }
        }
    }

    #[test]
    fn test_peer_round_robin() {
        let topology = topology(2, 4);
        let config = FlowConfig { peer: true, ..Default::default() };
        let flows = plan(&topology, &config).unwrap();

        let peers: Vec<_> = flows
            .flows()
            .iter()
            .filter(|f| f.direction == Direction::Peer)
            .collect();
        assert_eq!(peers.len(), 4);

        let targets: Vec<NodeId> = peers.iter().map(|f| f.destination).collect();
        let expected: Vec<NodeId> = [1, 0, 1, 0]
            .iter()
            .map(|i| topology.client(*i).unwrap().id)
            .collect();
        assert_eq!(targets, expected);

        let ports: Vec<u16> = peers.iter().map(|f| f.port).collect();
        assert_eq!(ports, vec![3000, 3001, 3002, 3003]);
    }

    #[test]
    fn test_peer_never_targets_sender() {
        // Client 0 sits under access point 1 and client 1 under access point 0,
        // so each ring successor serves only the sender itself
        let at = |x: f64| ListedPosition { x, y: 0.0, z: 0.0, building: None };
        let placement_config = PlacementConfig {
            mode: PlacementMode::Listed,
            listed: vec![at(0.0), at(100.0), at(100.0), at(0.0)],
            ..Default::default()
        };
        let placement = PlacementPlanner::new(&placement_config, &[], 60.0, 1)
            .plan(2, 2)
            .unwrap();
        let topology = TopologyComposer::new(&[], &BackhaulConfig::default())
            .compose(2, 2, &placement)
            .unwrap();
        assert_eq!(topology.clients_of(1), vec![0]);
        assert_eq!(topology.clients_of(0), vec![1]);

        let config = FlowConfig { peer: true, ..Default::default() };
        let flows = plan(&topology, &config).unwrap();
        for flow in flows.flows().iter().filter(|f| f.direction == Direction::Peer) {
            assert_ne!(flow.source, flow.destination);
        }
        let start = StartPolicy::from(&ScheduleConfig::default());
        let planner = FlowPlanner::new(&topology, &config, &start);
        assert_eq!(planner.peer_of(0).unwrap(), 1);
        assert_eq!(planner.peer_of(1).unwrap(), 0);
    }

    #[test]
    fn test_peer_omitted_with_single_client() {
        let topology = topology(2, 1);
        let config = FlowConfig { peer: true, ..Default::default() };
        let flows = plan(&topology, &config).unwrap();
        assert_eq!(flows.count(Direction::Peer), 0);
        assert_eq!(flows.len(), 3);

        let start = StartPolicy::from(&ScheduleConfig::default());
        assert!(matches!(
            FlowPlanner::new(&topology, &config, &start).peer_of(0),
            Err(ScenarioError::DirectionNotPlanned { direction: "peer" })
        ));
    }

    #[test]
    fn test_peer_omitted_with_single_access_point() {
        let topology = topology(1, 4);
        let config = FlowConfig { peer: true, ..Default::default() };
        let flows = plan(&topology, &config).unwrap();
        assert_eq!(flows.count(Direction::Peer), 0);
        assert_eq!(flows.len(), 12);
    }

    #[test]
    fn test_transport_selects_protocol() {
        let topology = topology(1, 1);
        let datagram = plan(&topology, &FlowConfig::default()).unwrap();
        assert!(datagram
            .generic()
            .all(|f| f.protocol == ProtocolClass::BestEffortDatagram));

        let config = FlowConfig { transport: GenericTransport::Stream, ..Default::default() };
        let stream = plan(&topology, &config).unwrap();
        assert!(stream.generic().all(|f| f.protocol == ProtocolClass::ReliableStream));
        assert_eq!(stream.flows()[0].protocol, ProtocolClass::VideoSegmentStream);
    }

    #[test]
    fn test_generic_window() {
        let topology = topology(1, 2);
        let flows = plan(&topology, &FlowConfig::default()).unwrap();
        let uplink = flows
            .for_client(1)
            .find(|f| f.direction == Direction::Uplink)
            .unwrap();
        assert_eq!(uplink.start, Duration::from_millis(2030));
        assert_eq!(uplink.stop, Some(Duration::from_secs(8)));
        assert_eq!(uplink.profile.unwrap().interval, Duration::from_millis(100));
    }

    #[test]
    fn test_port_collision_surfaces() {
        let topology = topology(1, 3);
        let mut config = FlowConfig::default();
        config.ports.uplink_base = 1101;
        assert!(matches!(
            plan(&topology, &config),
            Err(ScenarioError::PortRangeCollision { .. })
        ));
    }
}
