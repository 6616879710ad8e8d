//! Traffic flow planning.
//!
//! Turns a composed topology into the set of video and generic load flows,
//! with disjoint per-direction port ranges.

pub mod planner;
pub mod ports;
pub mod types;

pub use planner::{FlowPlanner, FlowSet};
pub use ports::{PortPlan, PortRange};
pub use types::{Direction, DirectionSet, Flow, FlowId, ProtocolClass, TrafficProfile};
