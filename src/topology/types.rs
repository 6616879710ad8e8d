//! Topology type definitions.
//!
//! Nodes, routes and attachments produced by the composer. Everything here
//! is created once during composition and read-only afterwards.

use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::error::ScenarioError;
use crate::ip::Subnet;
use crate::placement::{IndoorLocation, Position};

/// Scenario-wide node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    AccessPoint,
    Client,
    Gateway,
    RemoteHost,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::AccessPoint => "access_point",
            Role::Client => "client",
            Role::Gateway => "gateway",
            Role::RemoteHost => "remote_host",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub role: Role,
    /// Index within the node's role group
    pub index: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indoor: Option<IndoorLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Ipv4Addr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Default,
    Network,
}

/// Static route installed on one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub node: NodeId,
    pub kind: RouteKind,
    pub destination: Subnet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop: Option<Ipv4Addr>,
    pub interface: u32,
}

/// Client attached to its serving access point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub client: NodeId,
    pub access_point: NodeId,
    /// Index of the serving access point among all access points
    pub access_point_index: usize,
}

/// Point-to-point link between the packet gateway and the remote host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackhaulLink {
    pub gateway: NodeId,
    pub remote_host: NodeId,
    pub gateway_address: Ipv4Addr,
    pub remote_address: Ipv4Addr,
    pub data_rate: String,
    pub mtu: u16,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

/// Fully composed node set
#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    pub(crate) nodes: Vec<Node>,
    pub(crate) access_points: Vec<NodeId>,
    pub(crate) clients: Vec<NodeId>,
    pub(crate) gateway: NodeId,
    pub(crate) remote_host: NodeId,
    /// Indexed by client index
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) routes: Vec<Route>,
    pub(crate) backhaul: BackhaulLink,
    /// Default gateway address every client routes through
    pub(crate) client_gateway: Ipv4Addr,
}

impl Topology {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn access_point_count(&self) -> usize {
        self.access_points.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn access_points(&self) -> &[NodeId] {
        &self.access_points
    }

    pub fn clients(&self) -> &[NodeId] {
        &self.clients
    }

    /// Client node by client index
    pub fn client(&self, index: usize) -> Result<&Node, ScenarioError> {
        self.clients
            .get(index)
            .and_then(|id| self.node(*id))
            .ok_or(ScenarioError::ClientIndexOutOfRange {
                index,
                count: self.clients.len(),
            })
    }

    pub fn gateway(&self) -> NodeId {
        self.gateway
    }

    pub fn remote_host(&self) -> NodeId {
        self.remote_host
    }

    pub fn remote_address(&self) -> Ipv4Addr {
        self.backhaul.remote_address
    }

    pub fn client_gateway(&self) -> Ipv4Addr {
        self.client_gateway
    }

    pub fn backhaul(&self) -> &BackhaulLink {
        &self.backhaul
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn routes_of(&self, node: NodeId) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(move |route| route.node == node)
    }

    /// Access point index serving client `index`
    pub fn serving_access_point(&self, index: usize) -> Result<usize, ScenarioError> {
        self.attachments
            .get(index)
            .map(|attachment| attachment.access_point_index)
            .ok_or(ScenarioError::ClientIndexOutOfRange {
                index,
                count: self.clients.len(),
            })
    }

    /// Client indices attached to access point `ap_index`, ascending
    pub fn clients_of(&self, ap_index: usize) -> Vec<usize> {
        self.attachments
            .iter()
            .enumerate()
            .filter(|(_, attachment)| attachment.access_point_index == ap_index)
            .map(|(client, _)| client)
            .collect()
    }
}
