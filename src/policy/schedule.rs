//! Application start scheduling.
//!
//! Start offsets are pure functions of the client index: client `i` starts
//! at `base_start + i * stagger`, so two runs with the same configuration
//! schedule identically and no two clients start in the same instant.

use serde::Serialize;
use std::time::Duration;

use log::info;

use crate::config::ScheduleConfig;
use crate::error::ScenarioError;
use crate::flows::{FlowId, FlowSet};

/// Timing rules shared by the flow planner and the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartPolicy {
    pub server_start: Duration,
    pub base_start: Duration,
    pub stagger: Duration,
    pub generic_stop: Duration,
}

impl From<&ScheduleConfig> for StartPolicy {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            server_start: config.server_start,
            base_start: config.base_start,
            stagger: config.stagger,
            generic_stop: config.generic_stop,
        }
    }
}

impl StartPolicy {
    /// Start offset of client `index`'s video application
    pub fn client_start(&self, index: usize) -> Duration {
        // Saturate rather than wrap for absurd client counts
        let steps = u32::try_from(index).unwrap_or(u32::MAX);
        self.base_start.saturating_add(self.stagger.saturating_mul(steps))
    }

    /// Start and stop of client `index`'s generic flows
    pub fn generic_window(&self, index: usize) -> Result<(Duration, Duration), ScenarioError> {
        let start = self.client_start(index);
        if self.generic_stop < start {
            return Err(ScenarioError::ScheduleInverted {
                what: format!("generic flows of client {}", index),
                start,
                stop: self.generic_stop,
            });
        }
        Ok((start, self.generic_stop))
    }
}

/// What a schedule entry starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ScheduleTarget {
    VideoServer,
    VideoClient(usize),
    Flow(FlowId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub target: ScheduleTarget,
    #[serde(with = "humantime_serde")]
    pub start: Duration,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub stop: Option<Duration>,
}

impl ScheduleEntry {
    pub fn new(
        target: ScheduleTarget,
        start: Duration,
        stop: Option<Duration>,
    ) -> Result<Self, ScenarioError> {
        if let Some(stop) = stop {
            if stop < start {
                return Err(ScenarioError::ScheduleInverted {
                    what: format!("{:?}", target),
                    start,
                    stop,
                });
            }
        }
        Ok(Self { target, start, stop })
    }
}

/// Start/stop registrations for every application in a scenario.
///
/// Entries are ordered server first, then video clients by index, then
/// generic flows in plan order.
pub fn build_schedule(
    policy: &StartPolicy,
    clients: usize,
    flows: &FlowSet,
) -> Result<Vec<ScheduleEntry>, ScenarioError> {
    let mut entries = Vec::with_capacity(1 + clients + flows.len());
    entries.push(ScheduleEntry::new(ScheduleTarget::VideoServer, policy.server_start, None)?);

    for index in 0..clients {
        entries.push(ScheduleEntry::new(
            ScheduleTarget::VideoClient(index),
            policy.client_start(index),
            None,
        )?);
    }

    for flow in flows.generic() {
        entries.push(ScheduleEntry::new(ScheduleTarget::Flow(flow.id), flow.start, flow.stop)?);
    }

    info!("Scheduled {} applications", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> StartPolicy {
        StartPolicy::from(&ScheduleConfig::default())
    }

    #[test]
    fn test_client_starts() {
        let policy = policy();
        assert_eq!(policy.client_start(0), Duration::from_secs(2));
        assert_eq!(policy.client_start(1), Duration::from_millis(2030));
        assert_eq!(policy.client_start(10), Duration::from_millis(2300));
    }

    #[test]
    fn test_generic_window_inverted() {
        let mut policy = policy();
        policy.generic_stop = Duration::from_millis(2050);
        assert!(policy.generic_window(1).is_ok());
        assert!(matches!(
            policy.generic_window(2),
            Err(ScenarioError::ScheduleInverted { .. })
        ));
    }

    #[test]
    fn test_video_starts_strictly_increase() {
        let policy = policy();
        let entries = build_schedule(&policy, 6, &FlowSet::default()).unwrap();
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[0].target, ScheduleTarget::VideoServer);
        assert_eq!(entries[0].start, Duration::from_secs(1));

        let starts: Vec<Duration> = entries[1..].iter().map(|e| e.start).collect();
        for pair in starts.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[1] - pair[0], Duration::from_millis(30));
        }
    }

    #[test]
    fn test_entry_rejects_stop_before_start() {
        let err = ScheduleEntry::new(
            ScheduleTarget::Flow(FlowId(0)),
            Duration::from_secs(3),
            Some(Duration::from_secs(2)),
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::ScheduleInverted { .. }));

        let open = ScheduleEntry::new(ScheduleTarget::VideoServer, Duration::from_secs(1), None);
        assert!(open.is_ok());
    }
}
