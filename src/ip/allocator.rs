//! Sequential address allocation inside a subnet.
//!
//! Mirrors how the EPC hands out addresses: the first host address of the
//! client subnet is reserved for the default gateway and clients receive the
//! following addresses in attachment order.

use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;

use super::AddressError;

/// IPv4 network given by base address and prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Subnet {
    pub base: Ipv4Addr,
    pub prefix: u8,
}

impl Subnet {
    pub const fn new(base: Ipv4Addr, prefix: u8) -> Self {
        Self { base, prefix }
    }

    pub fn mask(&self) -> Ipv4Addr {
        let bits = if self.prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(self.prefix)) };
        Ipv4Addr::from(bits)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = u32::from(self.mask());
        u32::from(addr) & mask == u32::from(self.base) & mask
    }

    /// Host address `offset` positions after the network address
    pub fn host(&self, offset: u32) -> Option<Ipv4Addr> {
        let host_bits = 32 - u32::from(self.prefix);
        // Offset 0 is the network address and the top offset is broadcast
        let max_offset = if host_bits >= 32 { u32::MAX } else { (1u32 << host_bits) - 1 };
        if offset == 0 || offset >= max_offset {
            return None;
        }
        let network = u32::from(self.base) & u32::from(self.mask());
        Some(Ipv4Addr::from(network + offset))
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

/// Hands out host addresses of one subnet in increasing order
#[derive(Debug)]
pub struct SubnetAllocator {
    subnet: Subnet,
    next_offset: u32,
}

impl SubnetAllocator {
    pub fn new(subnet: Subnet) -> Self {
        Self { subnet, next_offset: 1 }
    }

    /// Start allocating after the first `reserved` host addresses
    pub fn with_reserved(subnet: Subnet, reserved: u32) -> Self {
        Self { subnet, next_offset: 1 + reserved }
    }

    pub fn allocate(&mut self) -> Result<Ipv4Addr, AddressError> {
        let addr = self
            .subnet
            .host(self.next_offset)
            .ok_or(AddressError::Exhausted { subnet: self.subnet })?;
        self.next_offset += 1;
        Ok(addr)
    }
}
