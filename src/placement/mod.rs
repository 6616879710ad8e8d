//! Node placement.
//!
//! This module computes where access points and clients stand, optionally
//! constrained by building geometry, and logs client positions for later
//! correlation with observed performance.

pub mod building;
pub mod planner;
pub mod position_log;

pub use building::{locate_in, Building, IndoorLocation, Position, RoomCell};
pub use planner::{PlacedPosition, Placement, PlacementPlanner, Slot};
pub use position_log::write_position_log;
