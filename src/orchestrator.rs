//! Scenario orchestrator.
//!
//! Runs the build phases in their fixed order (placement, topology, flows,
//! policies, schedule, instrumentation) and then drives a
//! [`SimulationEngine`] through deployment and the run. Building is pure:
//! nothing reaches the engine unless every phase succeeded.

use color_eyre::eyre::WrapErr;
use log::{info, warn};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::engine::{
    EngineDefaults, EngineError, RunReport, ScenarioDocument, SimulationEngine, VideoClient,
    VideoServer,
};
use crate::error::ScenarioError;
use crate::flows::{Direction, FlowPlanner, FlowSet};
use crate::placement::{write_position_log, Building, Placement, PlacementPlanner};
use crate::policy::{build_schedule, ClientPolicy, PolicyAssigner, ScheduleEntry, StartPolicy};
use crate::topology::{Topology, TopologyComposer};
use crate::trace::{CollectorSpec, InstrumentationWiring, OutputDescriptor};

/// Everything a run deploys, fully resolved
#[derive(Debug)]
pub struct Scenario {
    pub output: OutputDescriptor,
    pub placement: Placement,
    pub topology: Topology,
    pub flows: FlowSet,
    pub policies: Vec<ClientPolicy>,
    pub schedule: Vec<ScheduleEntry>,
    pub collectors: Vec<CollectorSpec>,
    pub defaults: EngineDefaults,
    pub stop: Duration,
    video_port: u16,
    content_root: String,
    manifest_url: String,
    write_position_log: bool,
}

/// Label used for the per-policy output directory
fn policy_label(config: &Config) -> String {
    if config.streaming.policy_cycle.is_empty() {
        config.streaming.adaptation_policy.clone()
    } else {
        config.streaming.policy_cycle.join("-")
    }
}

/// Manifest URL clients fetch from the origin server
pub fn manifest_url(remote: Ipv4Addr, content_root: &str, manifest: &str) -> String {
    let root = content_root.trim_matches('/');
    let manifest = manifest.trim_start_matches('/');
    if root.is_empty() {
        format!("http://{}/{}", remote, manifest)
    } else {
        format!("http://{}/{}/{}", remote, root, manifest)
    }
}

/// Build a scenario from a validated configuration
pub fn build_scenario(config: &Config) -> Result<Scenario, ScenarioError> {
    let access_points = config.network.access_points;
    let clients = config.network.clients;
    let buildings: Vec<Building> = config.buildings.iter().map(Building::from).collect();

    let placement = PlacementPlanner::new(
        &config.placement,
        &buildings,
        config.network.distance,
        config.general.simulation_id,
    )
    .plan(access_points, clients)?;

    let topology = TopologyComposer::new(&buildings, &config.network.backhaul)
        .compose(access_points, clients, &placement)?;

    let start = StartPolicy::from(&config.schedule);
    let flows = FlowPlanner::new(&topology, &config.flows, &start).plan()?;
    let policies = PolicyAssigner::new(&config.streaming).assign(&topology)?;
    let schedule = build_schedule(&start, topology.client_count(), &flows)?;

    let output = OutputDescriptor::new(
        &config.general.output_dir,
        &policy_label(config),
        clients,
        config.general.simulation_id,
    );
    let mut wiring = InstrumentationWiring::new(&output);
    wiring.wire_topology(&config.tracing, &topology);
    let collectors = wiring.into_collectors();

    let stop = config.stop_time();
    if let Some(last) = schedule.iter().map(|entry| entry.start).max() {
        if last >= stop {
            warn!(
                "Last application starts at {:?}, at or after the stop time {:?}",
                last, stop
            );
        }
    }

    let defaults = EngineDefaults {
        tcp_segment_size: config.network.tcp_segment_size,
        tcp_buffer_size: config.network.tcp_buffer_size,
        component_carriers: config
            .network
            .use_carrier_aggregation
            .then_some(config.network.component_carriers),
    };

    let manifest_url = manifest_url(
        topology.remote_address(),
        &config.streaming.content_root,
        &config.streaming.manifest,
    );

    info!(
        "Built scenario: {} access points, {} clients, {} flows, {} schedule entries, {} collectors",
        topology.access_point_count(),
        topology.client_count(),
        flows.len(),
        schedule.len(),
        collectors.len()
    );

    Ok(Scenario {
        output,
        placement,
        topology,
        flows,
        policies,
        schedule,
        collectors,
        defaults,
        stop,
        video_port: config.flows.ports.video,
        content_root: config.streaming.content_root.clone(),
        manifest_url,
        write_position_log: config.general.write_position_log,
    })
}

impl Scenario {
    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    /// Write the client position log, if enabled
    pub fn write_position_log(&self) -> Result<Option<PathBuf>, ScenarioError> {
        if !self.write_position_log {
            return Ok(None);
        }
        let path = self.output.position_log();
        write_position_log(&path, &self.placement)?;
        Ok(Some(path))
    }

    /// Register the whole scenario with `engine`, in deployment order
    pub fn deploy<E: SimulationEngine>(&self, engine: &mut E) -> Result<(), EngineError> {
        let topology = &self.topology;
        engine.configure_defaults(&self.defaults)?;

        for node in topology.nodes() {
            engine.create_node(node)?;
        }
        for node in topology.nodes() {
            if let Some(position) = node.position {
                engine.install_mobility(node.id, position)?;
            }
        }
        for attachment in topology.attachments() {
            engine.attach(attachment)?;
        }
        for id in topology.clients() {
            let client = topology
                .node(*id)
                .ok_or(EngineError::UnknownNode(*id))?;
            if let Some(address) = client.address {
                engine.assign_address(client.id, address)?;
            }
        }
        for route in topology.routes() {
            engine.add_route(route)?;
        }
        engine.install_backhaul(topology.backhaul())?;

        engine.install_video_server(&VideoServer {
            node: topology.remote_host(),
            listen_address: topology.remote_address(),
            port: self.video_port,
            content_root: self.content_root.clone(),
        })?;
        for policy in &self.policies {
            engine.install_video_client(&VideoClient {
                node: policy.client,
                manifest_url: self.manifest_url().to_string(),
                port: self.video_port,
                policy: policy.clone(),
            })?;
        }
        for flow in self.flows.flows() {
            if flow.direction != Direction::Video {
                engine.install_flow(flow)?;
            }
        }

        for entry in &self.schedule {
            engine.schedule(entry)?;
        }
        for collector in &self.collectors {
            engine.attach_collector(collector)?;
        }

        info!("Deployed {} nodes", topology.nodes().len());
        Ok(())
    }

    /// Deploy, run until the stop time, then tear the engine down
    pub fn execute<E: SimulationEngine>(&self, engine: &mut E) -> Result<RunReport, EngineError> {
        let result = self.deploy(engine).and_then(|_| engine.run(self.stop));
        let destroyed = engine.destroy();
        let report = result?;
        destroyed?;
        Ok(report)
    }
}

/// Build a scenario from `config` and render it with the bundled engine
pub fn run_scenario(config: &Config) -> color_eyre::Result<RunReport> {
    let scenario = build_scenario(config).wrap_err("Failed to build scenario")?;

    scenario
        .write_position_log()
        .wrap_err("Failed to write client position log")?;

    let mut engine = ScenarioDocument::new(scenario.output.clone());
    let report = scenario
        .execute(&mut engine)
        .wrap_err("Scenario run failed")?;

    info!(
        "Run finished at {:?}: {} nodes, {} flows, {} collectors",
        report.stop, report.nodes, report.flows, report.collectors
    );
    for artifact in &report.artifacts {
        info!("  - {}", artifact.display());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlacementMode;
    use crate::engine::EngineDefaults;
    use crate::flows::{Flow, FlowId};
    use crate::placement::Position;
    use crate::policy::ScheduleTarget;
    use crate::topology::{Attachment, BackhaulLink, Node, NodeId, Route};

    /// Records the order of engine calls
    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<String>,
        fail_on_run: bool,
        destroyed: bool,
    }

    impl SimulationEngine for RecordingEngine {
        fn configure_defaults(&mut self, _: &EngineDefaults) -> Result<(), EngineError> {
            self.calls.push("defaults".into());
            Ok(())
        }
        fn create_node(&mut self, node: &Node) -> Result<(), EngineError> {
            self.calls.push(format!("node {}", node.name));
            Ok(())
        }
        fn install_mobility(&mut self, node: NodeId, _: Position) -> Result<(), EngineError> {
            self.calls.push(format!("mobility {}", node));
            Ok(())
        }
        fn attach(&mut self, a: &Attachment) -> Result<(), EngineError> {
            self.calls.push(format!("attach {} {}", a.client, a.access_point));
            Ok(())
        }
        fn assign_address(&mut self, node: NodeId, addr: Ipv4Addr) -> Result<(), EngineError> {
            self.calls.push(format!("address {} {}", node, addr));
            Ok(())
        }
        fn add_route(&mut self, route: &Route) -> Result<(), EngineError> {
            self.calls.push(format!("route {}", route.node));
            Ok(())
        }
        fn install_backhaul(&mut self, _: &BackhaulLink) -> Result<(), EngineError> {
            self.calls.push("backhaul".into());
            Ok(())
        }
        fn install_video_server(&mut self, _: &VideoServer) -> Result<(), EngineError> {
            self.calls.push("server".into());
            Ok(())
        }
        fn install_video_client(&mut self, c: &VideoClient) -> Result<(), EngineError> {
            self.calls.push(format!("client {}", c.node));
            Ok(())
        }
        fn install_flow(&mut self, flow: &Flow) -> Result<(), EngineError> {
            self.calls.push(format!("flow {}", flow.id));
            Ok(())
        }
        fn schedule(&mut self, entry: &ScheduleEntry) -> Result<(), EngineError> {
            self.calls.push(format!("schedule {:?}", entry.target));
            Ok(())
        }
        fn attach_collector(&mut self, c: &CollectorSpec) -> Result<(), EngineError> {
            self.calls.push(format!("collector {}", c.kind.name()));
            Ok(())
        }
        fn run(&mut self, stop: Duration) -> Result<RunReport, EngineError> {
            if self.fail_on_run {
                return Err(EngineError::UnknownFlow(FlowId(99)));
            }
            self.calls.push("run".into());
            Ok(RunReport {
                stop,
                nodes: 0,
                flows: 0,
                collectors: 0,
                artifacts: Vec::new(),
            })
        }
        fn destroy(&mut self) -> Result<(), EngineError> {
            self.destroyed = true;
            Ok(())
        }
    }

    fn config(access_points: usize, clients: usize) -> Config {
        let mut config = Config::default();
        config.network.access_points = access_points;
        config.network.clients = clients;
        config
    }

    #[test]
    fn test_manifest_url() {
        let remote = Ipv4Addr::new(1, 0, 0, 2);
        assert_eq!(
            manifest_url(remote, "/content/segments/BigBuckBunny/bunny_2s/", "vid1.mpd.gz"),
            "http://1.0.0.2/content/segments/BigBuckBunny/bunny_2s/vid1.mpd.gz"
        );
        assert_eq!(manifest_url(remote, "", "/vid1.mpd"), "http://1.0.0.2/vid1.mpd");
    }

    #[test]
    fn test_build_single_cell() {
        let scenario = build_scenario(&config(1, 3)).unwrap();
        assert_eq!(scenario.topology.client_count(), 3);
        assert_eq!(scenario.flows.len(), 9);
        assert_eq!(scenario.policies.len(), 3);
        // server + 3 video clients + 6 generic flows
        assert_eq!(scenario.schedule.len(), 10);
        assert_eq!(scenario.schedule[0].target, ScheduleTarget::VideoServer);
        assert_eq!(scenario.stop, Duration::from_millis(221 * 2000 + 144_600));
        assert_eq!(scenario.defaults.component_carriers, None);
        assert_eq!(
            scenario.manifest_url(),
            "http://1.0.0.2/content/segments/BigBuckBunny/bunny_2s/vid1.mpd.gz"
        );
    }

    #[test]
    fn test_build_failure_reaches_no_engine() {
        let mut config = config(1, 2);
        config.placement.mode = PlacementMode::Listed;
        assert!(matches!(
            build_scenario(&config),
            Err(ScenarioError::PlacementExhausted { .. })
        ));
    }

    #[test]
    fn test_deploy_order() {
        let scenario = build_scenario(&config(1, 1)).unwrap();
        let mut engine = RecordingEngine::default();
        scenario.execute(&mut engine).unwrap();

        let position = |prefix: &str| {
            engine
                .calls
                .iter()
                .position(|call| call.starts_with(prefix))
                .unwrap()
        };
        assert_eq!(position("defaults"), 0);
        assert!(position("node") < position("mobility"));
        assert!(position("mobility") < position("attach"));
        assert!(position("attach") < position("address"));
        assert!(position("route") < position("backhaul"));
        assert!(position("server") < position("client"));
        assert!(position("flow") < position("schedule"));
        assert!(position("schedule") < position("collector"));
        assert_eq!(engine.calls.last().map(String::as_str), Some("run"));
        assert!(engine.destroyed);
    }

    #[test]
    fn test_engine_destroyed_when_run_fails() {
        let scenario = build_scenario(&config(1, 1)).unwrap();
        let mut engine = RecordingEngine {
            fail_on_run: true,
            ..Default::default()
        };
        assert!(scenario.execute(&mut engine).is_err());
        assert!(engine.destroyed);
    }

    #[test]
    fn test_policy_cycle_label() {
        let mut config = config(1, 2);
        config.streaming.policy_cycle = vec!["panda".into(), "festive".into()];
        let scenario = build_scenario(&config).unwrap();
        assert_eq!(scenario.output.policy, "panda-festive");
    }
}
