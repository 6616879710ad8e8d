//! Client streaming policies and application scheduling.

pub mod assigner;
pub mod schedule;

pub use assigner::{ClientPolicy, PolicyAssigner, Viewport};
pub use schedule::{build_schedule, ScheduleEntry, ScheduleTarget, StartPolicy};
