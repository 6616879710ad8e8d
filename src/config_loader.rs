use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading scenario configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open config file '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse config file '{}'", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// CLI arguments that override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub access_points: Option<usize>,
    pub clients: Option<usize>,
    pub distance: Option<f64>,
    pub packet_interval: Option<Duration>,
    pub use_carrier_aggregation: Option<bool>,
    pub disable_downlink: bool,
    pub disable_uplink: bool,
    pub enable_peer: bool,
    pub adaptation_policy: Option<String>,
    pub segment_size_file: Option<PathBuf>,
    pub segment_duration: Option<Duration>,
    pub simulation_id: Option<u32>,
    pub output_dir: Option<PathBuf>,
}

/// Apply CLI overrides to a configuration and re-validate it
pub fn apply_cli_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(access_points) = overrides.access_points {
        debug!("Overriding access_points: {}", access_points);
        config.network.access_points = access_points;
    }
    if let Some(clients) = overrides.clients {
        debug!("Overriding clients: {}", clients);
        config.network.clients = clients;
    }
    if let Some(distance) = overrides.distance {
        config.network.distance = distance;
    }
    if let Some(interval) = overrides.packet_interval {
        config.flows.packet_interval = interval;
    }
    if let Some(use_ca) = overrides.use_carrier_aggregation {
        config.network.use_carrier_aggregation = use_ca;
    }
    if overrides.disable_downlink {
        config.flows.downlink = false;
    }
    if overrides.disable_uplink {
        config.flows.uplink = false;
    }
    if overrides.enable_peer {
        config.flows.peer = true;
    }
    if let Some(policy) = &overrides.adaptation_policy {
        debug!("Overriding adaptation policy: {}", policy);
        config.streaming.adaptation_policy = policy.clone();
        // An explicit token on the command line wins over any cycle from the file
        config.streaming.policy_cycle.clear();
    }
    if let Some(path) = &overrides.segment_size_file {
        config.streaming.segment_size_file = path.clone();
    }
    if let Some(duration) = overrides.segment_duration {
        config.streaming.segment_duration = duration;
    }
    if let Some(id) = overrides.simulation_id {
        config.general.simulation_id = id;
    }
    if let Some(dir) = &overrides.output_dir {
        config.general.output_dir = dir.clone();
    }

    config.validate()?;

    Ok(())
}
