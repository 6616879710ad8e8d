//! Measurement collector wiring.
//!
//! Collectors are attached after flows and policies are final. Each
//! (collector kind, node) pair is wired at most once, however many times
//! wiring is requested for it.

use log::{debug, info};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::TracingConfig;
use crate::topology::{NodeId, Topology};
use super::output::OutputDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CollectorKind {
    /// Buffer level transitions, representation switches and stalls
    Playback,
    /// Bytes received at the origin side
    Throughput,
    /// PHY/MAC/RLC/PDCP statistics of the radio stack
    LteStack,
    PacketCapture { prefix: String },
    /// Enqueue, dequeue, drop and receive events on point-to-point links
    AsciiTrace { file: String },
    RoutingTable {
        #[serde(with = "humantime_serde")]
        interval: Duration,
    },
}

impl CollectorKind {
    pub fn name(&self) -> &'static str {
        match self {
            CollectorKind::Playback => "playback",
            CollectorKind::Throughput => "throughput",
            CollectorKind::LteStack => "lte",
            CollectorKind::PacketCapture { .. } => "pcap",
            CollectorKind::AsciiTrace { .. } => "ascii",
            CollectorKind::RoutingTable { .. } => "routes",
        }
    }

    /// CSV header of the trace this collector writes, `None` for collectors
    /// the engine writes in its own format
    pub fn header(&self) -> Option<&'static str> {
        match self {
            CollectorKind::Playback => Some("time,node,event,representation,buffer_level"),
            CollectorKind::Throughput => Some("time,node,bytes"),
            CollectorKind::LteStack => Some("time,layer,cell,rnti,bytes"),
            CollectorKind::RoutingTable { .. } => Some("time,node,destination,gateway,interface"),
            CollectorKind::PacketCapture { .. } | CollectorKind::AsciiTrace { .. } => None,
        }
    }
}

/// One collector bound to its entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectorSpec {
    #[serde(flatten)]
    pub kind: CollectorKind,
    /// `None` for scenario-wide collectors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
    pub output: PathBuf,
}

pub struct InstrumentationWiring<'a> {
    output: &'a OutputDescriptor,
    wired: HashSet<(&'static str, Option<NodeId>)>,
    collectors: Vec<CollectorSpec>,
}

impl<'a> InstrumentationWiring<'a> {
    pub fn new(output: &'a OutputDescriptor) -> Self {
        Self {
            output,
            wired: HashSet::new(),
            collectors: Vec::new(),
        }
    }

    fn wire(&mut self, kind: CollectorKind, node: Option<NodeId>) -> bool {
        if !self.wired.insert((kind.name(), node)) {
            debug!("{} collector already wired for {:?}", kind.name(), node);
            return false;
        }
        let output = match &kind {
            CollectorKind::PacketCapture { prefix } => self.output.run_dir().join(prefix),
            CollectorKind::AsciiTrace { file } => self.output.run_dir().join(file),
            other => self.output.trace(other.name()),
        };
        self.collectors.push(CollectorSpec { kind, node, output });
        true
    }

    /// Playback collector on each client; returns how many were new
    pub fn wire_playback(&mut self, clients: &[NodeId]) -> usize {
        clients
            .iter()
            .filter(|id| self.wire(CollectorKind::Playback, Some(**id)))
            .count()
    }

    pub fn wire_throughput(&mut self, node: NodeId) -> bool {
        self.wire(CollectorKind::Throughput, Some(node))
    }

    pub fn wire_lte_stack(&mut self) -> bool {
        self.wire(CollectorKind::LteStack, None)
    }

    pub fn wire_packet_capture(&mut self, prefix: &str) -> bool {
        self.wire(CollectorKind::PacketCapture { prefix: prefix.to_string() }, None)
    }

    pub fn wire_ascii_trace(&mut self, file: &str) -> bool {
        self.wire(CollectorKind::AsciiTrace { file: file.to_string() }, None)
    }

    pub fn wire_routing_table(&mut self, node: NodeId, interval: Duration) -> bool {
        self.wire(CollectorKind::RoutingTable { interval }, Some(node))
    }

    /// Wire everything `config` enables for `topology`
    pub fn wire_topology(&mut self, config: &TracingConfig, topology: &Topology) {
        if config.playback {
            self.wire_playback(topology.clients());
        }
        if config.throughput {
            self.wire_throughput(topology.remote_host());
        }
        if config.lte_traces {
            self.wire_lte_stack();
        }
        if let Some(prefix) = &config.pcap_prefix {
            self.wire_packet_capture(prefix);
        }
        if let Some(file) = &config.ascii_trace {
            self.wire_ascii_trace(file);
        }
        if let Some(interval) = config.routing_table_interval {
            self.wire_routing_table(topology.remote_host(), interval);
        }
        info!("Wired {} collectors", self.collectors.len());
    }

    pub fn collectors(&self) -> &[CollectorSpec] {
        &self.collectors
    }

    pub fn into_collectors(self) -> Vec<CollectorSpec> {
        self.collectors
    }
}
