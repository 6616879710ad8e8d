//! Scenario document engine.
//!
//! Records every registration into serializable host and application
//! entries. Running writes the scenario as YAML plus a JSON summary next to
//! the other run artifacts and opens the trace files collectors write into.

use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ScenarioError;
use crate::flows::{Flow, FlowId, ProtocolClass, TrafficProfile};
use crate::placement::{IndoorLocation, Position};
use crate::policy::{ClientPolicy, ScheduleEntry, ScheduleTarget};
use crate::topology::{Attachment, BackhaulLink, Node, NodeId, Route};
use crate::trace::{CollectorSpec, OutputDescriptor, TraceStream};
use crate::utils::format_duration;
use super::{EngineDefaults, EngineError, RunReport, SimulationEngine, VideoClient, VideoServer};

/// Host entry of the scenario document
#[derive(Serialize, Debug)]
pub struct DocumentHost {
    pub id: NodeId,
    pub name: String,
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indoor: Option<IndoorLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_addr: Option<Ipv4Addr>,
    /// Serving access point, clients only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<NodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<DocumentApplication>,
}

/// Application running on a host
#[derive(Serialize, Debug, Clone)]
pub struct DocumentApplication {
    #[serde(flatten)]
    pub kind: ApplicationKind,
    /// Start time (e.g. "2s", "2030ms"), unset until scheduled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApplicationKind {
    VideoServer {
        listen_address: Ipv4Addr,
        port: u16,
        content_root: String,
    },
    VideoClient {
        manifest_url: String,
        port: u16,
        policy: ClientPolicy,
    },
    Sender {
        flow: FlowId,
        direction: &'static str,
        protocol: ProtocolClass,
        destination: Ipv4Addr,
        port: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        profile: Option<TrafficProfile>,
    },
    Sink {
        flow: FlowId,
        protocol: ProtocolClass,
        port: u16,
    },
}

#[derive(Serialize, Debug)]
struct DocumentGeneral<'a> {
    run_id: u32,
    policy: &'a str,
    clients: usize,
    stop_time: String,
}

#[derive(Serialize, Debug)]
struct DocumentFile<'a> {
    general: DocumentGeneral<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    defaults: Option<&'a EngineDefaults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backhaul: Option<&'a BackhaulLink>,
    hosts: &'a [DocumentHost],
    collectors: &'a [CollectorSpec],
}

/// Machine-readable digest of one run
#[derive(Serialize, Debug)]
struct RunSummary<'a> {
    run_id: u32,
    policy: &'a str,
    clients: usize,
    stop_time: String,
    hosts: usize,
    flows: BTreeMap<&'static str, usize>,
    scheduled: usize,
    collectors: usize,
    scenario: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Recording,
    Ran,
    Destroyed,
}

impl State {
    fn as_str(&self) -> &'static str {
        match self {
            State::Recording => "recording",
            State::Ran => "finished",
            State::Destroyed => "destroyed",
        }
    }
}

/// Bundled [`SimulationEngine`] that renders the scenario to files
#[derive(Debug)]
pub struct ScenarioDocument {
    output: OutputDescriptor,
    state: State,
    defaults: Option<EngineDefaults>,
    hosts: Vec<DocumentHost>,
    host_index: HashMap<NodeId, usize>,
    backhaul: Option<BackhaulLink>,
    /// (host, application) slots started by each schedule target
    applications: HashMap<ScheduleTarget, Vec<(usize, usize)>>,
    flows: BTreeMap<&'static str, usize>,
    scheduled: usize,
    collectors: Vec<CollectorSpec>,
    streams: Vec<TraceStream>,
}

impl ScenarioDocument {
    pub fn new(output: OutputDescriptor) -> Self {
        Self {
            output,
            state: State::Recording,
            defaults: None,
            hosts: Vec::new(),
            host_index: HashMap::new(),
            backhaul: None,
            applications: HashMap::new(),
            flows: BTreeMap::new(),
            scheduled: 0,
            collectors: Vec::new(),
            streams: Vec::new(),
        }
    }

    pub fn hosts(&self) -> &[DocumentHost] {
        &self.hosts
    }

    pub fn host(&self, node: NodeId) -> Option<&DocumentHost> {
        self.host_index.get(&node).map(|i| &self.hosts[*i])
    }

    pub fn collectors(&self) -> &[CollectorSpec] {
        &self.collectors
    }

    /// Trace files currently open
    pub fn open_streams(&self) -> usize {
        self.streams.len()
    }

    fn expect_recording(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.state != State::Recording {
            return Err(EngineError::InvalidState {
                state: self.state.as_str(),
                operation,
            });
        }
        Ok(())
    }

    fn slot(&self, node: NodeId) -> Result<usize, EngineError> {
        self.host_index
            .get(&node)
            .copied()
            .ok_or(EngineError::UnknownNode(node))
    }

    fn host_mut(&mut self, node: NodeId) -> Result<&mut DocumentHost, EngineError> {
        let slot = self.slot(node)?;
        Ok(&mut self.hosts[slot])
    }

    fn add_application(
        &mut self,
        node: NodeId,
        target: ScheduleTarget,
        kind: ApplicationKind,
    ) -> Result<(), EngineError> {
        let slot = self.slot(node)?;
        let host = &mut self.hosts[slot];
        host.applications.push(DocumentApplication {
            kind,
            start_time: None,
            stop_time: None,
        });
        let app = host.applications.len() - 1;
        self.applications.entry(target).or_default().push((slot, app));
        Ok(())
    }

    fn write_outputs(&self, stop: Duration) -> Result<Vec<PathBuf>, EngineError> {
        let run_dir = self.output.run_dir();
        fs::create_dir_all(&run_dir).map_err(|e| ScenarioError::io(&run_dir, e))?;

        let document = DocumentFile {
            general: DocumentGeneral {
                run_id: self.output.run_id,
                policy: &self.output.policy,
                clients: self.output.clients,
                stop_time: format_duration(stop),
            },
            defaults: self.defaults.as_ref(),
            backhaul: self.backhaul.as_ref(),
            hosts: &self.hosts,
            collectors: &self.collectors,
        };
        let yaml = serde_yaml::to_string(&document).map_err(|e| EngineError::Serialize {
            what: "scenario document",
            reason: e.to_string(),
        })?;
        let document_path = self.output.scenario_document();
        fs::write(&document_path, yaml).map_err(|e| ScenarioError::io(&document_path, e))?;

        let summary = RunSummary {
            run_id: self.output.run_id,
            policy: &self.output.policy,
            clients: self.output.clients,
            stop_time: format_duration(stop),
            hosts: self.hosts.len(),
            flows: self.flows.clone(),
            scheduled: self.scheduled,
            collectors: self.collectors.len(),
            scenario: document_path.clone(),
        };
        let json = serde_json::to_string_pretty(&summary).map_err(|e| EngineError::Serialize {
            what: "run summary",
            reason: e.to_string(),
        })?;
        let summary_path = self.output.summary();
        fs::write(&summary_path, json).map_err(|e| ScenarioError::io(&summary_path, e))?;

        Ok(vec![document_path, summary_path])
    }
}

impl SimulationEngine for ScenarioDocument {
    fn configure_defaults(&mut self, defaults: &EngineDefaults) -> Result<(), EngineError> {
        self.expect_recording("configure defaults")?;
        debug!("Engine defaults: {:?}", defaults);
        self.defaults = Some(defaults.clone());
        Ok(())
    }

    fn create_node(&mut self, node: &Node) -> Result<(), EngineError> {
        self.expect_recording("create nodes")?;
        if self.host_index.contains_key(&node.id) {
            return Err(EngineError::DuplicateNode(node.id));
        }
        self.host_index.insert(node.id, self.hosts.len());
        self.hosts.push(DocumentHost {
            id: node.id,
            name: node.name.clone(),
            role: node.role.as_str(),
            position: None,
            indoor: node.indoor,
            ip_addr: None,
            attached_to: None,
            routes: Vec::new(),
            applications: Vec::new(),
        });
        Ok(())
    }

    fn install_mobility(&mut self, node: NodeId, position: Position) -> Result<(), EngineError> {
        self.expect_recording("install mobility")?;
        self.host_mut(node)?.position = Some(position);
        Ok(())
    }

    fn attach(&mut self, attachment: &Attachment) -> Result<(), EngineError> {
        self.expect_recording("attach clients")?;
        self.slot(attachment.access_point)?;
        self.host_mut(attachment.client)?.attached_to = Some(attachment.access_point);
        Ok(())
    }

    fn assign_address(&mut self, node: NodeId, address: Ipv4Addr) -> Result<(), EngineError> {
        self.expect_recording("assign addresses")?;
        self.host_mut(node)?.ip_addr = Some(address);
        Ok(())
    }

    fn add_route(&mut self, route: &Route) -> Result<(), EngineError> {
        self.expect_recording("add routes")?;
        self.host_mut(route.node)?.routes.push(route.clone());
        Ok(())
    }

    fn install_backhaul(&mut self, link: &BackhaulLink) -> Result<(), EngineError> {
        self.expect_recording("install the backhaul")?;
        self.slot(link.gateway)?;
        self.host_mut(link.remote_host)?.ip_addr = Some(link.remote_address);
        self.host_mut(link.gateway)?.ip_addr = Some(link.gateway_address);
        self.backhaul = Some(link.clone());
        Ok(())
    }

    fn install_video_server(&mut self, server: &VideoServer) -> Result<(), EngineError> {
        self.expect_recording("install applications")?;
        self.add_application(
            server.node,
            ScheduleTarget::VideoServer,
            ApplicationKind::VideoServer {
                listen_address: server.listen_address,
                port: server.port,
                content_root: server.content_root.clone(),
            },
        )
    }

    fn install_video_client(&mut self, client: &VideoClient) -> Result<(), EngineError> {
        self.expect_recording("install applications")?;
        self.add_application(
            client.node,
            ScheduleTarget::VideoClient(client.policy.client_index),
            ApplicationKind::VideoClient {
                manifest_url: client.manifest_url.clone(),
                port: client.port,
                policy: client.policy.clone(),
            },
        )?;
        *self.flows.entry("video").or_default() += 1;
        Ok(())
    }

    fn install_flow(&mut self, flow: &Flow) -> Result<(), EngineError> {
        self.expect_recording("install applications")?;
        let target = ScheduleTarget::Flow(flow.id);
        self.add_application(
            flow.source,
            target,
            ApplicationKind::Sender {
                flow: flow.id,
                direction: flow.direction.as_str(),
                protocol: flow.protocol,
                destination: flow.destination_address,
                port: flow.port,
                profile: flow.profile,
            },
        )?;
        self.add_application(
            flow.destination,
            target,
            ApplicationKind::Sink {
                flow: flow.id,
                protocol: flow.protocol,
                port: flow.port,
            },
        )?;
        *self.flows.entry(flow.direction.as_str()).or_default() += 1;
        Ok(())
    }

    fn schedule(&mut self, entry: &ScheduleEntry) -> Result<(), EngineError> {
        self.expect_recording("schedule applications")?;
        let slots = match self.applications.get(&entry.target) {
            Some(slots) => slots.clone(),
            None => {
                return Err(match entry.target {
                    ScheduleTarget::Flow(id) => EngineError::UnknownFlow(id),
                    other => EngineError::UnscheduledTarget(format!("{:?}", other)),
                })
            }
        };
        for (host, app) in slots {
            let application = &mut self.hosts[host].applications[app];
            application.start_time = Some(format_duration(entry.start));
            application.stop_time = entry.stop.map(format_duration);
        }
        self.scheduled += 1;
        Ok(())
    }

    fn attach_collector(&mut self, collector: &CollectorSpec) -> Result<(), EngineError> {
        self.expect_recording("attach collectors")?;
        if let Some(node) = collector.node {
            self.slot(node)?;
        }
        self.collectors.push(collector.clone());
        Ok(())
    }

    fn run(&mut self, stop: Duration) -> Result<RunReport, EngineError> {
        self.expect_recording("run")?;
        info!(
            "Writing scenario for {} hosts, stop time {}",
            self.hosts.len(),
            format_duration(stop)
        );

        let mut artifacts = self.write_outputs(stop)?;

        for collector in &self.collectors {
            let Some(header) = collector.kind.header() else {
                continue;
            };
            if self.streams.iter().any(|s| s.path() == collector.output) {
                continue;
            }
            self.streams.push(TraceStream::open(&collector.output, header)?);
            artifacts.push(collector.output.clone());
        }

        self.state = State::Ran;
        info!("Scenario written to {:?}", self.output.scenario_document());

        Ok(RunReport {
            stop,
            nodes: self.hosts.len(),
            flows: self.flows.values().sum(),
            collectors: self.collectors.len(),
            artifacts,
        })
    }

    fn destroy(&mut self) -> Result<(), EngineError> {
        if self.state == State::Destroyed {
            return Err(EngineError::InvalidState {
                state: self.state.as_str(),
                operation: "destroy",
            });
        }
        let streams = std::mem::take(&mut self.streams);
        debug!("Closing {} trace streams", streams.len());
        for stream in streams {
            stream.close()?;
        }
        self.state = State::Destroyed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Role;
    use crate::trace::CollectorKind;
    use tempfile::TempDir;

    fn node(id: u32, role: Role, name: &str) -> Node {
        Node {
            id: NodeId(id),
            role,
            index: 0,
            name: name.to_string(),
            position: None,
            indoor: None,
            address: None,
        }
    }

    fn document(dir: &TempDir) -> ScenarioDocument {
        ScenarioDocument::new(OutputDescriptor::new(dir.path(), "panda", 1, 4))
    }

    #[test]
    fn test_unknown_node_rejected() {
        let dir = TempDir::new().unwrap();
        let mut engine = document(&dir);
        let err = engine
            .install_mobility(NodeId(3), Position::new(0.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownNode(NodeId(3))));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let dir = TempDir::new().unwrap();
        let mut engine = document(&dir);
        engine.create_node(&node(0, Role::Client, "ue0")).unwrap();
        assert!(matches!(
            engine.create_node(&node(0, Role::Client, "ue0")),
            Err(EngineError::DuplicateNode(NodeId(0)))
        ));
    }

    #[test]
    fn test_schedule_needs_installed_target() {
        let dir = TempDir::new().unwrap();
        let mut engine = document(&dir);
        let entry =
            ScheduleEntry::new(ScheduleTarget::Flow(FlowId(2)), Duration::from_secs(2), None)
                .unwrap();
        assert!(matches!(engine.schedule(&entry), Err(EngineError::UnknownFlow(FlowId(2)))));
    }

    #[test]
    fn test_run_writes_document_and_summary() {
        let dir = TempDir::new().unwrap();
        let mut engine = document(&dir);
        engine.create_node(&node(0, Role::RemoteHost, "remote-host")).unwrap();
        engine
            .install_video_server(&VideoServer {
                node: NodeId(0),
                listen_address: Ipv4Addr::new(1, 0, 0, 2),
                port: 80,
                content_root: "/content/".to_string(),
            })
            .unwrap();
        engine
            .schedule(
                &ScheduleEntry::new(ScheduleTarget::VideoServer, Duration::from_secs(1), None)
                    .unwrap(),
            )
            .unwrap();

        let report = engine.run(Duration::from_secs(10)).unwrap();
        assert_eq!(report.nodes, 1);
        assert_eq!(report.artifacts.len(), 2);

        let output = OutputDescriptor::new(dir.path(), "panda", 1, 4);
        let yaml = fs::read_to_string(output.scenario_document()).unwrap();
        assert!(yaml.contains("remote-host"));
        assert!(yaml.contains("type: video_server"));
        assert!(yaml.contains("start_time: 1s"));

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(output.summary()).unwrap()).unwrap();
        assert_eq!(summary["run_id"], 4);
        assert_eq!(summary["stop_time"], "10s");
        assert_eq!(summary["scheduled"], 1);

        assert!(matches!(
            engine.run(Duration::from_secs(10)),
            Err(EngineError::InvalidState { .. })
        ));
        engine.destroy().unwrap();
        assert!(engine.destroy().is_err());
    }

    #[test]
    fn test_trace_streams_open_on_run_and_close_on_destroy() {
        let dir = TempDir::new().unwrap();
        let output = OutputDescriptor::new(dir.path(), "panda", 1, 4);
        let mut engine = document(&dir);
        engine.create_node(&node(0, Role::Client, "client-0")).unwrap();
        let playback = CollectorSpec {
            kind: CollectorKind::Playback,
            node: Some(NodeId(0)),
            output: output.trace("playback"),
        };
        engine.attach_collector(&playback).unwrap();
        // A second client on the same file shares the stream
        engine.attach_collector(&playback).unwrap();
        engine
            .attach_collector(&CollectorSpec {
                kind: CollectorKind::PacketCapture { prefix: "lena-simple-epc".to_string() },
                node: None,
                output: output.run_dir().join("lena-simple-epc"),
            })
            .unwrap();
        assert_eq!(engine.open_streams(), 0);

        let report = engine.run(Duration::from_secs(10)).unwrap();
        assert_eq!(report.collectors, 3);
        // Packet captures have no header and no stream
        assert_eq!(engine.open_streams(), 1);
        assert!(report.artifacts.contains(&output.trace("playback")));

        engine.destroy().unwrap();
        assert_eq!(engine.open_streams(), 0);
        assert!(fs::read_to_string(output.trace("playback")).unwrap().starts_with("time,node,event"));
    }
}
