//! Network topology module.
//!
//! This module creates the scenario's node groups, binds their positions,
//! attaches clients to access points and lays out addresses and routes.

pub mod composer;
pub mod types;

pub use composer::TopologyComposer;
pub use types::{Attachment, BackhaulLink, Node, NodeId, Role, Route, RouteKind, Topology};
