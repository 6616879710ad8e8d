//! Scenario construction errors.
//!
//! Every variant is fatal: scenario construction runs once, before simulated
//! time begins, and any failure aborts the build before the engine is touched.

use crate::topology::NodeId;

/// Errors raised while composing a scenario
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("placement exhausted: produced {produced} of {required} positions ({reason})")]
    PlacementExhausted {
        required: usize,
        produced: usize,
        reason: String,
    },

    #[error("inconsistent placement for node {node}: {reason}")]
    InconsistentPlacement { node: NodeId, reason: String },

    #[error("client index {index} out of range ({count} clients)")]
    ClientIndexOutOfRange { index: usize, count: usize },

    #[error("port range collision: {first} {first_range:?} overlaps {second} {second_range:?}")]
    PortRangeCollision {
        first: &'static str,
        first_range: (u16, u16),
        second: &'static str,
        second_range: (u16, u16),
    },

    #[error("port range for {direction} starting at {base} cannot hold {count} ports")]
    PortRangeOverflow {
        direction: &'static str,
        base: u16,
        count: usize,
    },

    #[error("no port range planned for {direction} flows")]
    DirectionNotPlanned { direction: &'static str },

    #[error("placement has {positions} positions for {nodes} positioned nodes")]
    PositionCountMismatch { nodes: usize, positions: usize },

    #[error("schedule inverted: {what} stops at {stop:?} before it starts at {start:?}")]
    ScheduleInverted {
        what: String,
        start: std::time::Duration,
        stop: std::time::Duration,
    },

    #[error(transparent)]
    Address(#[from] crate::ip::AddressError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScenarioError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ScenarioError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
