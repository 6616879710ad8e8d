use clap::Parser;
use color_eyre::Result;
use dashsim::config::Config;
use dashsim::config_loader::{apply_cli_overrides, load_config, CliOverrides};
use dashsim::orchestrator::run_scenario;
use dashsim::utils::parse_duration;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

/// Compose and render an LTE adaptive video streaming scenario
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario configuration YAML file (defaults apply without one)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for logs, traces and the scenario document
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of base stations
    #[arg(long)]
    access_points: Option<usize>,

    /// Number of streaming clients
    #[arg(long)]
    clients: Option<usize>,

    /// Spacing of the linear layout, metres
    #[arg(long)]
    distance: Option<f64>,

    /// Send interval of the generic load flows (e.g. "100ms")
    #[arg(long, value_parser = parse_duration)]
    inter_packet_interval: Option<Duration>,

    /// Enable carrier aggregation
    #[arg(long)]
    use_ca: bool,

    /// Disable downlink load flows
    #[arg(long)]
    disable_dl: bool,

    /// Disable uplink load flows
    #[arg(long)]
    disable_ul: bool,

    /// Enable client-to-client load flows
    #[arg(long)]
    enable_peer: bool,

    /// Adaptation policy token for every client
    #[arg(long)]
    adaptation_algo: Option<String>,

    /// Segment size table handed to streaming clients
    #[arg(long)]
    segment_size_file: Option<PathBuf>,

    /// Segment duration (e.g. "2s")
    #[arg(long, value_parser = parse_duration)]
    segment_duration: Option<Duration>,

    /// Run id; seeds random placement and names output files
    #[arg(long)]
    simulation_id: Option<u32>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            access_points: self.access_points,
            clients: self.clients,
            distance: self.distance,
            packet_interval: self.inter_packet_interval,
            use_carrier_aggregation: self.use_ca.then_some(true),
            disable_downlink: self.disable_dl,
            disable_uplink: self.disable_ul,
            enable_peer: self.enable_peer,
            adaptation_policy: self.adaptation_algo.clone(),
            segment_size_file: self.segment_size_file.clone(),
            segment_duration: self.segment_duration,
            simulation_id: self.simulation_id,
            output_dir: self.output.clone(),
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_cli_overrides(&mut config, &args.overrides())?;

    // RUST_LOG wins over the configured level, which defaults to "info"
    let level = config.general.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("Starting dashsim scenario composer");
    if let Some(path) = &args.config {
        info!("Configuration file: {:?}", path);
    }
    info!("Output directory: {:?}", config.general.output_dir);
    info!(
        "{} access points, {} clients, run {}",
        config.network.access_points, config.network.clients, config.general.simulation_id
    );

    let report = run_scenario(&config)?;

    info!(
        "Scenario composed successfully ({} artifacts)",
        report.artifacts.len()
    );
    Ok(())
}
