// file: src/inventory/store.rs
// version: 1.0.0
// guid: c92e5b17-8a4d-4f61-9d3b-5e0a7c1f2d84

//! Address-keyed host store
//!
//! Enumeration is always lexicographic by address; that order is the index
//! basis for every index-based host selection.

use super::{Credential, Host};
use crate::error::{MultirouterError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Mapping from host address to its connection identity
#[derive(Debug, Clone, Default)]
pub struct HostInventory {
    hosts: BTreeMap<String, Host>,
}

impl HostInventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory from a list of hosts; later entries overwrite earlier ones
    pub fn from_hosts(hosts: impl IntoIterator<Item = Host>) -> Self {
        let mut inventory = Self::new();
        for host in hosts {
            inventory.add(host);
        }
        inventory
    }

    /// Insert a host, silently replacing any entry with the same address
    pub fn add(&mut self, host: Host) {
        debug!("Inventory add: {}", host.address());
        self.hosts.insert(host.address().to_string(), host);
    }

    /// Remove every listed address; unknown addresses are ignored
    pub fn remove<S: AsRef<str>>(&mut self, addresses: &[S]) {
        for address in addresses {
            if self.hosts.remove(address.as_ref()).is_some() {
                debug!("Inventory remove: {}", address.as_ref());
            }
        }
    }

    pub fn get(&self, address: &str) -> Option<&Host> {
        self.hosts.get(address)
    }

    /// Credential stored for a host
    pub fn get_credential(&self, address: &str) -> Result<&Credential> {
        self.hosts
            .get(address)
            .map(Host::credential)
            .ok_or_else(|| MultirouterError::unknown_host(address))
    }

    pub fn contains(&self, address: &str) -> bool {
        self.hosts.contains_key(address)
    }

    /// Addresses in canonical (lexicographic) order
    pub fn list_sorted(&self) -> Vec<String> {
        self.hosts.keys().cloned().collect()
    }

    /// Hosts in canonical order, for configuring a session pool
    pub fn hosts_sorted(&self) -> Vec<Host> {
        self.hosts.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
