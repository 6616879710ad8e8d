//! Port allocation.
//!
//! Each generic direction owns the range `[base, base + clients)` and gives
//! port `base + i` to client `i`. The shared video port is treated as a
//! range of one. Ranges are checked for overlap once, up front, so that
//! enabling or disabling one direction never moves another's ports.

use serde::Serialize;

use crate::config::PortConfig;
use crate::error::ScenarioError;
use super::types::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortRange {
    pub direction: Direction,
    pub base: u16,
    pub len: u16,
}

impl PortRange {
    /// Inclusive last port, `None` for an empty range
    pub fn last(&self) -> Option<u16> {
        (self.len > 0).then(|| self.base + (self.len - 1))
    }

    fn overlaps(&self, other: &PortRange) -> bool {
        match (self.last(), other.last()) {
            (Some(a_last), Some(b_last)) => self.base <= b_last && other.base <= a_last,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortPlan {
    ranges: Vec<PortRange>,
}

impl PortPlan {
    /// Build the plan for the video port plus `directions`, each sized for
    /// `clients` clients
    pub fn new(
        ports: &PortConfig,
        directions: &[Direction],
        clients: usize,
    ) -> Result<Self, ScenarioError> {
        let mut ranges = vec![PortRange { direction: Direction::Video, base: ports.video, len: 1 }];

        for direction in directions {
            let base = match direction {
                Direction::Video => continue,
                Direction::Downlink => ports.downlink_base,
                Direction::Uplink => ports.uplink_base,
                Direction::Peer => ports.peer_base,
            };
            let overflow = || ScenarioError::PortRangeOverflow {
                direction: direction.as_str(),
                base,
                count: clients,
            };
            let len = u16::try_from(clients).map_err(|_| overflow())?;
            if len > 0 && base.checked_add(len - 1).is_none() {
                return Err(overflow());
            }
            ranges.push(PortRange { direction: *direction, base, len });
        }

        for (i, first) in ranges.iter().enumerate() {
            for second in &ranges[i + 1..] {
                if first.overlaps(second) {
                    return Err(ScenarioError::PortRangeCollision {
                        first: first.direction.as_str(),
                        first_range: (first.base, first.last().unwrap_or(first.base)),
                        second: second.direction.as_str(),
                        second_range: (second.base, second.last().unwrap_or(second.base)),
                    });
                }
            }
        }

        Ok(Self { ranges })
    }

    /// Port of `direction` for client `index`
    pub fn port(&self, direction: Direction, index: usize) -> Result<u16, ScenarioError> {
        let range = self
            .ranges
            .iter()
            .find(|range| range.direction == direction)
            .ok_or(ScenarioError::DirectionNotPlanned { direction: direction.as_str() })?;
        if direction == Direction::Video {
            return Ok(range.base);
        }
        let offset = u16::try_from(index)
            .ok()
            .filter(|offset| *offset < range.len)
            .ok_or(ScenarioError::ClientIndexOutOfRange {
                index,
                count: usize::from(range.len),
            })?;
        Ok(range.base + offset)
    }
}
