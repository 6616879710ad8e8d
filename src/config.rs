use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Scenario configuration.
///
/// Every section carries defaults matching the reference LTE/DASH experiment,
/// so an empty YAML document is a valid single-cell, single-client scenario.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub network: NetworkConfig,
    pub placement: PlacementConfig,
    pub buildings: Vec<BuildingConfig>,
    pub flows: FlowConfig,
    pub streaming: StreamingConfig,
    pub schedule: ScheduleConfig,
    pub tracing: TracingConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.network.validate()?;
        self.placement.validate()?;
        for (index, building) in self.buildings.iter().enumerate() {
            building.validate(index)?;
        }
        self.flows.validate()?;
        self.streaming.validate()?;
        self.schedule.validate()?;

        if let Some(level) = &self.general.log_level {
            if level.parse::<log::LevelFilter>().is_err() {
                return Err(ValidationError::InvalidGeneral(format!(
                    "unknown log_level '{}'",
                    level
                )));
            }
        }

        if self.general.stop_time.is_none() && self.derived_stop_time().is_none() {
            return Err(ValidationError::InvalidStreaming(format!(
                "{} segments of {:?} plus {:?} drain overflow the run length",
                self.streaming.segment_count, self.streaming.segment_duration, self.streaming.drain
            )));
        }

        if self.stop_time() <= self.schedule.base_start {
            return Err(ValidationError::InvalidGeneral(format!(
                "stop_time {:?} ends before the first client starts at {:?}",
                self.stop_time(),
                self.schedule.base_start
            )));
        }

        Ok(())
    }

    /// Simulated run length.
    ///
    /// Uses `general.stop_time` when set, otherwise the time needed to stream
    /// every segment back to back plus the configured drain period.
    pub fn stop_time(&self) -> Duration {
        self.general
            .stop_time
            .or_else(|| self.derived_stop_time())
            .unwrap_or(Duration::MAX)
    }

    /// Streaming length plus drain, `None` on overflow
    fn derived_stop_time(&self) -> Option<Duration> {
        self.streaming
            .segment_duration
            .checked_mul(self.streaming.segment_count)?
            .checked_add(self.streaming.drain)
    }
}

/// Run-wide settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    /// Distinguishes output files of consecutive runs and seeds placement
    pub simulation_id: u32,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    pub output_dir: PathBuf,
    pub write_position_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            simulation_id: 1,
            stop_time: None,
            log_level: Some("info".to_string()),
            output_dir: PathBuf::from("dash-log-files"),
            write_position_log: true,
        }
    }
}

/// Access network and wide-area link settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub access_points: usize,
    pub clients: usize,
    /// Inter-site distance in metres
    pub distance: f64,
    pub use_carrier_aggregation: bool,
    pub component_carriers: u8,
    pub tcp_segment_size: u32,
    pub tcp_buffer_size: u32,
    pub backhaul: BackhaulConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            access_points: 1,
            clients: 1,
            distance: 60.0,
            use_carrier_aggregation: false,
            component_carriers: 2,
            tcp_segment_size: 1446,
            tcp_buffer_size: 524_288,
            backhaul: BackhaulConfig::default(),
        }
    }
}

impl NetworkConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.access_points == 0 {
            return Err(ValidationError::InvalidNetwork(
                "access_points must be at least 1".to_string(),
            ));
        }
        if self.clients == 0 {
            return Err(ValidationError::InvalidNetwork(
                "clients must be at least 1".to_string(),
            ));
        }
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(ValidationError::InvalidNetwork(format!(
                "distance must be a positive number of metres, got {}",
                self.distance
            )));
        }
        if self.use_carrier_aggregation && self.component_carriers < 2 {
            return Err(ValidationError::InvalidNetwork(
                "carrier aggregation needs at least 2 component carriers".to_string(),
            ));
        }
        if self.backhaul.data_rate.trim().is_empty() {
            return Err(ValidationError::InvalidNetwork(
                "backhaul data_rate cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Point-to-point link between the gateway and the remote host
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BackhaulConfig {
    pub data_rate: String,
    pub mtu: u16,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for BackhaulConfig {
    fn default() -> Self {
        Self {
            data_rate: "100Gb/s".to_string(),
            mtu: 1500,
            delay: Duration::from_millis(10),
        }
    }
}

/// How node positions are produced
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    /// Fixed linear layout, independent of the seed
    Linear,
    /// Seeded random client positions filtered against building geometry
    BuildingRandom,
    /// Positions listed verbatim in the configuration
    Listed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PlacementConfig {
    pub mode: PlacementMode,
    /// Height of access point antennas in the linear layout
    pub ap_height: f64,
    /// Lateral offset of clients from the access point line
    pub client_offset_y: f64,
    /// Height used for outdoor random positions
    pub outdoor_height: f64,
    pub area: AreaConfig,
    /// Minimum distance from room walls and floor slabs for indoor positions
    pub wall_clearance: f64,
    pub max_attempts: u32,
    pub listed: Vec<ListedPosition>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            mode: PlacementMode::Linear,
            ap_height: 50.0,
            client_offset_y: 5.0,
            outdoor_height: 1.5,
            area: AreaConfig::default(),
            wall_clearance: 0.5,
            max_attempts: 10_000,
            listed: Vec::new(),
        }
    }
}

impl PlacementConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let bounds = [self.area.x_min, self.area.x_max, self.area.y_min, self.area.y_max];
        let spans = [self.area.x_max - self.area.x_min, self.area.y_max - self.area.y_min];
        if bounds.iter().chain(spans.iter()).any(|v| !v.is_finite()) {
            return Err(ValidationError::InvalidPlacement(format!(
                "placement area bounds must be finite: x [{}, {}), y [{}, {})",
                self.area.x_min, self.area.x_max, self.area.y_min, self.area.y_max
            )));
        }
        let heights = [self.ap_height, self.client_offset_y, self.outdoor_height];
        if heights.iter().any(|v| !v.is_finite()) || !self.wall_clearance.is_finite() {
            return Err(ValidationError::InvalidPlacement(
                "placement offsets and clearance must be finite".to_string(),
            ));
        }
        if self.area.x_min >= self.area.x_max || self.area.y_min >= self.area.y_max {
            return Err(ValidationError::InvalidPlacement(format!(
                "placement area is empty: x [{}, {}), y [{}, {})",
                self.area.x_min, self.area.x_max, self.area.y_min, self.area.y_max
            )));
        }
        if !(self.wall_clearance >= 0.0) {
            return Err(ValidationError::InvalidPlacement(
                "wall_clearance cannot be negative".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidPlacement(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.mode == PlacementMode::Listed && self.listed.is_empty() {
            return Err(ValidationError::InvalidPlacement(
                "listed placement mode needs at least one listed position".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ground rectangle random candidates are drawn from
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct AreaConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 100.0,
            y_min: 0.0,
            y_max: 40.0,
        }
    }
}

/// Explicit node position; access points come first, then clients
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ListedPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Index into `buildings` this position declares itself to be inside
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum WallMaterial {
    Wood,
    #[default]
    ConcreteWithWindows,
    ConcreteWithoutWindows,
    StoneBlocks,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildingUsage {
    Residential,
    #[default]
    Office,
    Commercial,
}

/// Axis-aligned building with a regular floor/room grid
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BuildingConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    #[serde(default)]
    pub z_min: f64,
    pub z_max: f64,
    pub floors: u16,
    pub rooms_x: u16,
    pub rooms_y: u16,
    #[serde(default)]
    pub wall: WallMaterial,
    #[serde(default)]
    pub usage: BuildingUsage,
}

impl BuildingConfig {
    fn validate(&self, index: usize) -> Result<(), ValidationError> {
        let axes = [
            ("x", self.x_min, self.x_max),
            ("y", self.y_min, self.y_max),
            ("z", self.z_min, self.z_max),
        ];
        for (axis, min, max) in axes {
            if !(min.is_finite() && max.is_finite() && min < max) {
                return Err(ValidationError::InvalidBuilding(format!(
                    "building {}: {} bounds [{}, {}) are empty or inverted",
                    index, axis, min, max
                )));
            }
        }
        if self.floors == 0 || self.rooms_x == 0 || self.rooms_y == 0 {
            return Err(ValidationError::InvalidBuilding(format!(
                "building {}: floors and room counts must be at least 1",
                index
            )));
        }
        Ok(())
    }
}

/// Transport used by the generic load flows
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenericTransport {
    #[default]
    Datagram,
    Stream,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FlowConfig {
    pub downlink: bool,
    pub uplink: bool,
    pub peer: bool,
    pub transport: GenericTransport,
    pub ports: PortConfig,
    #[serde(with = "humantime_serde")]
    pub packet_interval: Duration,
    pub max_packets: u32,
    pub packet_size: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            downlink: true,
            uplink: true,
            peer: false,
            transport: GenericTransport::Datagram,
            ports: PortConfig::default(),
            packet_interval: Duration::from_millis(100),
            max_packets: 1_000_000,
            packet_size: 1024,
        }
    }
}

impl FlowConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.packet_interval.is_zero() {
            return Err(ValidationError::InvalidFlows(
                "packet_interval must be positive".to_string(),
            ));
        }
        if self.packet_size == 0 {
            return Err(ValidationError::InvalidFlows(
                "packet_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Port plan: one shared video port plus one base per generic direction
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PortConfig {
    pub video: u16,
    pub downlink_base: u16,
    pub uplink_base: u16,
    pub peer_base: u16,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            video: 80,
            downlink_base: 1100,
            uplink_base: 2000,
            peer_base: 3000,
        }
    }
}

/// Per-client replacement of the scenario-wide streaming defaults
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ClientOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptation_policy: Option<String>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub start_up_delay: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_buffer: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_upscale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_downscale: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StreamingConfig {
    pub adaptation_policy: String,
    /// Tokens assigned round-robin by client index; overrides `adaptation_policy`
    pub policy_cycle: Vec<String>,
    /// Client index -> overrides
    pub overrides: BTreeMap<usize, ClientOverride>,
    #[serde(with = "humantime_serde")]
    pub start_up_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_buffer: Duration,
    pub screen_width: u32,
    pub screen_height: u32,
    pub allow_upscale: bool,
    pub allow_downscale: bool,
    #[serde(with = "humantime_serde")]
    pub segment_duration: Duration,
    pub segment_count: u32,
    pub segment_size_file: PathBuf,
    pub content_root: String,
    pub manifest: String,
    /// Slack after the last segment before the run stops
    #[serde(with = "humantime_serde")]
    pub drain: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            adaptation_policy: "panda".to_string(),
            policy_cycle: Vec::new(),
            overrides: BTreeMap::new(),
            start_up_delay: Duration::from_millis(500),
            max_buffer: Duration::from_secs(1600),
            screen_width: 1240,
            screen_height: 1080,
            allow_upscale: true,
            allow_downscale: true,
            segment_duration: Duration::from_secs(2),
            segment_count: 221,
            segment_size_file: PathBuf::from("src/dash/segmentSizes.txt"),
            content_root: "/content/segments/BigBuckBunny/bunny_2s/".to_string(),
            manifest: "vid1.mpd.gz".to_string(),
            drain: Duration::from_millis(144_600),
        }
    }
}

impl StreamingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.adaptation_policy.trim().is_empty() {
            return Err(ValidationError::InvalidStreaming(
                "adaptation_policy cannot be empty".to_string(),
            ));
        }
        if self.policy_cycle.iter().any(|token| token.trim().is_empty()) {
            return Err(ValidationError::InvalidStreaming(
                "policy_cycle cannot contain empty tokens".to_string(),
            ));
        }
        for (index, client) in &self.overrides {
            if matches!(&client.adaptation_policy, Some(token) if token.trim().is_empty()) {
                return Err(ValidationError::InvalidStreaming(format!(
                    "override for client {} has an empty adaptation_policy",
                    index
                )));
            }
        }
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ValidationError::InvalidStreaming(
                "viewport dimensions must be positive".to_string(),
            ));
        }
        if self.segment_duration.is_zero() {
            return Err(ValidationError::InvalidStreaming(
                "segment_duration must be positive".to_string(),
            ));
        }
        if self.manifest.trim().is_empty() {
            return Err(ValidationError::InvalidStreaming(
                "manifest cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Application timing.
///
/// `base_start` and `stagger` decide when client `i` starts streaming:
/// `base_start + i * stagger`. The stagger keeps clients from requesting
/// their first segment in the same instant.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleConfig {
    #[serde(with = "humantime_serde")]
    pub server_start: Duration,
    #[serde(with = "humantime_serde")]
    pub base_start: Duration,
    #[serde(with = "humantime_serde")]
    pub stagger: Duration,
    /// Stop time shared by every generic load flow
    #[serde(with = "humantime_serde")]
    pub generic_stop: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            server_start: Duration::from_secs(1),
            base_start: Duration::from_secs(2),
            stagger: Duration::from_millis(30),
            generic_stop: Duration::from_secs(8),
        }
    }
}

impl ScheduleConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.stagger.is_zero() {
            return Err(ValidationError::InvalidSchedule(
                "stagger must be positive so client starts are distinguishable".to_string(),
            ));
        }
        if self.server_start > self.base_start {
            return Err(ValidationError::InvalidSchedule(format!(
                "server_start {:?} is after the first client start {:?}",
                self.server_start, self.base_start
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TracingConfig {
    pub playback: bool,
    pub throughput: bool,
    pub lte_traces: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcap_prefix: Option<String>,
    /// ASCII trace of every point-to-point link, written under the run directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascii_trace: Option<String>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub routing_table_interval: Option<Duration>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            playback: true,
            throughput: true,
            lte_traces: true,
            pcap_prefix: Some("lena-simple-epc".to_string()),
            ascii_trace: Some("lte-dash-streaming.tr".to_string()),
            routing_table_interval: Some(Duration::from_secs(5)),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid network configuration: {0}")]
    InvalidNetwork(String),
    #[error("Invalid placement configuration: {0}")]
    InvalidPlacement(String),
    #[error("Invalid building configuration: {0}")]
    InvalidBuilding(String),
    #[error("Invalid flow configuration: {0}")]
    InvalidFlows(String),
    #[error("Invalid streaming configuration: {0}")]
    InvalidStreaming(String),
    #[error("Invalid schedule configuration: {0}")]
    InvalidSchedule(String),
}
