//! ## vaktprov-core::interface
//! Virtual network interfaces declared by a scenario.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use vaktprov_protocols::MacAddr;

use crate::error::ScenarioError;

/// A named port of the device under test. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl Interface {
    /// Builds an interface, rejecting non-contiguous netmasks.
    pub fn new(
        name: impl Into<String>,
        mac: MacAddr,
        ip: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> Result<Self, ScenarioError> {
        let name = name.into();
        if Ipv4Network::with_netmask(ip, netmask).is_err() {
            return Err(ScenarioError::InvalidNetmask { name, netmask });
        }
        Ok(Self {
            name,
            mac,
            ip,
            netmask,
        })
    }

    /// Network prefix of the interface address.
    pub fn network(&self) -> Ipv4Network {
        match Ipv4Network::with_netmask(self.ip, self.netmask) {
            Ok(net) => Ipv4Network::new(net.network(), net.prefix()).unwrap_or(net),
            // Only reachable for hand-built values that skipped `new`.
            Err(_) => Ipv4Network::from(self.ip),
        }
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.network().contains(addr)
    }
}

/// Ordered set of interfaces, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceRegistry {
    entries: Vec<Interface>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, interface: Interface) -> Result<(), ScenarioError> {
        if self.contains(&interface.name) {
            return Err(ScenarioError::DuplicateInterface(interface.name));
        }
        self.entries.push(interface);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.entries.iter().find(|i| i.name == name)
    }

    pub fn by_ip(&self, ip: Ipv4Addr) -> Option<&Interface> {
        self.entries.iter().find(|i| i.ip == ip)
    }

    pub fn by_mac(&self, mac: MacAddr) -> Option<&Interface> {
        self.entries.iter().find(|i| i.mac == mac)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a InterfaceRegistry {
    type Item = &'a Interface;
    type IntoIter = std::slice::Iter<'a, Interface>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
