// file: src/config/inventory.rs
// version: 1.0.0
// guid: e7c2a9f4-3b18-4d60-a5e1-9f0b6d2c8a47

//! Inventory file structures

use crate::error::MultirouterError;
use crate::inventory::{Credential, Host, HostInventory, DEFAULT_SSH_PORT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Top-level inventory document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryFile {
    pub hosts: Vec<HostEntry>,
}

/// One host as written in the inventory file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEntry {
    /// Host address
    pub host: String,
    /// Login user
    pub user: String,
    /// Login password, also used for sudo
    pub password: String,
    /// Path to a private key used for login instead of the password
    #[serde(default)]
    pub sshkey: Option<String>,
    /// SSH port (defaults to 22)
    #[serde(default)]
    pub port: Option<u16>,
}

impl InventoryFile {
    /// Validate the inventory
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = BTreeSet::new();
        for entry in &self.hosts {
            entry.validate()?;
            if !seen.insert(entry.host.as_str()) {
                return Err(MultirouterError::config(format!(
                    "Duplicate host in inventory: {}",
                    entry.host
                )));
            }
        }
        Ok(())
    }

    /// Build the in-memory inventory
    pub fn into_inventory(self) -> HostInventory {
        HostInventory::from_hosts(self.hosts.into_iter().map(HostEntry::into_host))
    }
}

impl HostEntry {
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(MultirouterError::validation("Host address cannot be empty"));
        }
        if self.user.trim().is_empty() {
            return Err(MultirouterError::validation(format!(
                "User cannot be empty for host {}",
                self.host
            )));
        }
        if self.port == Some(0) {
            return Err(MultirouterError::validation(format!(
                "Invalid port 0 for host {}",
                self.host
            )));
        }
        Ok(())
    }

    pub fn into_host(self) -> Host {
        let credential = match self.sshkey {
            Some(key) => Credential::with_key(self.user, self.password, key),
            None => Credential::new(self.user, self.password),
        };
        Host::with_port(self.host, credential, self.port.unwrap_or(DEFAULT_SSH_PORT))
    }
}
