//! Address registry.
//!
//! Tracks which node owns which address so that no address is handed out
//! twice and every node receives at most one.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::topology::NodeId;
use super::AddressError;

#[derive(Debug, Default)]
pub struct AddressRegistry {
    /// Address -> owning node
    owners: HashMap<Ipv4Addr, NodeId>,
    /// Node -> address, for the one-address-per-node check
    assigned: HashMap<NodeId, Ipv4Addr>,
}

impl AddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `node` owns `addr`
    pub fn register(&mut self, addr: Ipv4Addr, node: NodeId) -> Result<(), AddressError> {
        if let Some(owner) = self.owners.get(&addr) {
            if *owner != node {
                return Err(AddressError::Conflict { addr, owner: *owner, node });
            }
            return Ok(());
        }
        if let Some(existing) = self.assigned.get(&node) {
            return Err(AddressError::AlreadyAddressed { node, existing: *existing });
        }
        self.owners.insert(addr, node);
        self.assigned.insert(node, addr);
        Ok(())
    }

    /// Number of addresses handed out
    pub(crate) fn len(&self) -> usize {
        self.owners.len()
    }
}
