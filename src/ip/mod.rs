//! IP address allocation and management module.
//!
//! Handles the two address plans of the scenario: the client subnet served
//! by the packet gateway and the wide-area link between the gateway and the
//! remote host.

pub mod allocator;
pub mod registry;

use std::net::Ipv4Addr;

use crate::topology::NodeId;

pub use allocator::{Subnet, SubnetAllocator};
pub use registry::AddressRegistry;

/// Subnet clients are addressed from
pub const CLIENT_SUBNET: Subnet = Subnet::new(Ipv4Addr::new(7, 0, 0, 0), 8);

/// Subnet of the gateway <-> remote host link
pub const BACKHAUL_SUBNET: Subnet = Subnet::new(Ipv4Addr::new(1, 0, 0, 0), 8);

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("subnet {subnet} has no free host addresses")]
    Exhausted { subnet: Subnet },

    #[error("address {addr} already belongs to node {owner}, cannot assign it to node {node}")]
    Conflict { addr: Ipv4Addr, owner: NodeId, node: NodeId },

    #[error("node {node} already has address {existing}")]
    AlreadyAddressed { node: NodeId, existing: Ipv4Addr },
}
