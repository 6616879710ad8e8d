//! Flow type definitions.

use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::topology::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FlowId(pub u32);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Segment download from the origin server
    Video,
    Downlink,
    Uplink,
    Peer,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Video => "video",
            Direction::Downlink => "downlink",
            Direction::Uplink => "uplink",
            Direction::Peer => "peer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolClass {
    ReliableStream,
    BestEffortDatagram,
    VideoSegmentStream,
}

/// Constant-rate sender settings of a generic load flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficProfile {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub max_packets: u32,
    pub packet_size: u32,
}

/// One planned traffic stream between two nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    pub id: FlowId,
    /// Client this flow was planned for
    pub client_index: usize,
    pub direction: Direction,
    pub protocol: ProtocolClass,
    pub source: NodeId,
    pub destination: NodeId,
    /// Address the sender targets
    pub destination_address: Ipv4Addr,
    pub port: u16,
    #[serde(with = "humantime_serde")]
    pub start: Duration,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub stop: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<TrafficProfile>,
}

/// Which generic directions to plan on top of the video flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DirectionSet {
    pub downlink: bool,
    pub uplink: bool,
    pub peer: bool,
}
