//! Simulation engine seam.
//!
//! The orchestrator never builds a network itself. It hands every node,
//! link, application, schedule entry and collector to a [`SimulationEngine`]
//! and then asks it to run until the stop time. [`ScenarioDocument`] is the
//! bundled engine: it records the registrations and writes them out as a
//! scenario file for an external network simulator.

pub mod document;

use serde::Serialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::flows::{Flow, FlowId};
use crate::placement::Position;
use crate::policy::{ClientPolicy, ScheduleEntry};
use crate::topology::{Attachment, BackhaulLink, Node, NodeId, Route};
use crate::trace::CollectorSpec;

pub use document::ScenarioDocument;

/// Transport and radio defaults applied before any node exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineDefaults {
    pub tcp_segment_size: u32,
    pub tcp_buffer_size: u32,
    /// Component carriers when carrier aggregation is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_carriers: Option<u8>,
}

/// Origin server bundle installed on the remote host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoServer {
    pub node: NodeId,
    pub listen_address: Ipv4Addr,
    pub port: u16,
    pub content_root: String,
}

/// Adaptive streaming client bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoClient {
    pub node: NodeId,
    pub manifest_url: String,
    pub port: u16,
    pub policy: ClientPolicy,
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    #[serde(with = "humantime_serde")]
    pub stop: Duration,
    pub nodes: usize,
    pub flows: usize,
    pub collectors: usize,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("node {0} was never created")]
    UnknownNode(NodeId),

    #[error("node {0} created twice")]
    DuplicateNode(NodeId),

    #[error("{0} was never installed")]
    UnknownFlow(FlowId),

    #[error("schedule target {0} has no installed application")]
    UnscheduledTarget(String),

    #[error("engine is {state}, cannot {operation}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },

    #[error("failed to serialize {what}: {reason}")]
    Serialize { what: &'static str, reason: String },

    #[error(transparent)]
    Scenario(#[from] crate::error::ScenarioError),
}

/// Operations the orchestrator drives a network simulator through.
///
/// Calls arrive in deployment order: defaults, nodes, mobility, attachment,
/// addressing and routes, backhaul, applications, schedule, collectors,
/// then `run` and finally `destroy`.
pub trait SimulationEngine {
    fn configure_defaults(&mut self, defaults: &EngineDefaults) -> Result<(), EngineError>;

    fn create_node(&mut self, node: &Node) -> Result<(), EngineError>;

    fn install_mobility(&mut self, node: NodeId, position: Position) -> Result<(), EngineError>;

    fn attach(&mut self, attachment: &Attachment) -> Result<(), EngineError>;

    fn assign_address(&mut self, node: NodeId, address: Ipv4Addr) -> Result<(), EngineError>;

    fn add_route(&mut self, route: &Route) -> Result<(), EngineError>;

    fn install_backhaul(&mut self, link: &BackhaulLink) -> Result<(), EngineError>;

    fn install_video_server(&mut self, server: &VideoServer) -> Result<(), EngineError>;

    fn install_video_client(&mut self, client: &VideoClient) -> Result<(), EngineError>;

    fn install_flow(&mut self, flow: &Flow) -> Result<(), EngineError>;

    fn schedule(&mut self, entry: &ScheduleEntry) -> Result<(), EngineError>;

    fn attach_collector(&mut self, collector: &CollectorSpec) -> Result<(), EngineError>;

    /// Run until simulated time reaches `stop`
    fn run(&mut self, stop: Duration) -> Result<RunReport, EngineError>;

    /// Release everything the run opened
    fn destroy(&mut self) -> Result<(), EngineError>;
}
