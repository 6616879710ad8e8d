//! Per-client streaming policy.
//!
//! Every client gets the scenario defaults, then its adaptation token from
//! the policy cycle (if one is configured), then any per-index override.

use log::{debug, info};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::StreamingConfig;
use crate::error::ScenarioError;
use crate::topology::{NodeId, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Streaming behavior of one client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientPolicy {
    pub client: NodeId,
    pub client_index: usize,
    pub adaptation_policy: String,
    #[serde(with = "humantime_serde")]
    pub start_up_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_buffer: Duration,
    pub viewport: Viewport,
    pub allow_upscale: bool,
    pub allow_downscale: bool,
    #[serde(with = "humantime_serde")]
    pub segment_duration: Duration,
    pub segment_size_file: PathBuf,
}

pub struct PolicyAssigner<'a> {
    config: &'a StreamingConfig,
}

impl<'a> PolicyAssigner<'a> {
    pub fn new(config: &'a StreamingConfig) -> Self {
        Self { config }
    }

    fn token_for(&self, index: usize) -> &str {
        if self.config.policy_cycle.is_empty() {
            &self.config.adaptation_policy
        } else {
            &self.config.policy_cycle[index % self.config.policy_cycle.len()]
        }
    }

    /// One policy per client, indexed by client index
    pub fn assign(&self, topology: &Topology) -> Result<Vec<ClientPolicy>, ScenarioError> {
        let count = topology.client_count();
        if let Some((&index, _)) = self.config.overrides.range(count..).next() {
            return Err(ScenarioError::ClientIndexOutOfRange { index, count });
        }

        let mut policies = Vec::with_capacity(count);
        for (index, id) in topology.clients().iter().enumerate() {
            let mut policy = ClientPolicy {
                client: *id,
                client_index: index,
                adaptation_policy: self.token_for(index).to_string(),
                start_up_delay: self.config.start_up_delay,
                max_buffer: self.config.max_buffer,
                viewport: Viewport {
                    width: self.config.screen_width,
                    height: self.config.screen_height,
                },
                allow_upscale: self.config.allow_upscale,
                allow_downscale: self.config.allow_downscale,
                segment_duration: self.config.segment_duration,
                segment_size_file: self.config.segment_size_file.clone(),
            };

            if let Some(over) = self.config.overrides.get(&index) {
                debug!("Applying streaming override to client {}", index);
                if let Some(token) = &over.adaptation_policy {
                    policy.adaptation_policy = token.clone();
                }
                if let Some(delay) = over.start_up_delay {
                    policy.start_up_delay = delay;
                }
                if let Some(buffer) = over.max_buffer {
                    policy.max_buffer = buffer;
                }
                if let Some(width) = over.screen_width {
                    policy.viewport.width = width;
                }
                if let Some(height) = over.screen_height {
                    policy.viewport.height = height;
                }
                if let Some(upscale) = over.allow_upscale {
                    policy.allow_upscale = upscale;
                }
                if let Some(downscale) = over.allow_downscale {
                    policy.allow_downscale = downscale;
                }
            }

            policies.push(policy);
        }

        info!(
            "Assigned streaming policies to {} clients ({} overrides)",
            policies.len(),
            self.config.overrides.len()
        );
        Ok(policies)
    }
}
