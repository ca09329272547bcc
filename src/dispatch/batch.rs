// file: src/dispatch/batch.rs
// version: 1.0.0
// guid: 6b9d2e41-0c7a-4f85-b3e2-a1f4c8d05e27

//! Inventory-aligned command batches
//!
//! A batch carries one entry per fleet host, in sorted fleet order, each
//! entry keyed by its address. An empty command means the host is skipped.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub address: String,
    pub command: String,
}

/// Commands for one dispatch, aligned with the full host list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBatch {
    /// The same command on every host
    Uniform { hosts: Vec<String>, command: String },
    /// A command per host, blank where the host is excluded
    PerHost(Vec<BatchEntry>),
}

impl CommandBatch {
    /// Same command everywhere
    pub fn uniform(all_hosts: &[String], command: &str) -> Self {
        Self::Uniform {
            hosts: all_hosts.to_vec(),
            command: command.to_string(),
        }
    }

    /// `command` for hosts in `targets`, blank for the rest
    pub fn sparse(all_hosts: &[String], targets: &BTreeSet<String>, command: &str) -> Self {
        Self::PerHost(
            all_hosts
                .iter()
                .map(|address| BatchEntry {
                    address: address.clone(),
                    command: if targets.contains(address) {
                        command.to_string()
                    } else {
                        String::new()
                    },
                })
                .collect(),
        )
    }

    /// A distinct command per host; hosts absent from `commands` are blank
    pub fn per_host(all_hosts: &[String], commands: &BTreeMap<String, String>) -> Self {
        Self::PerHost(
            all_hosts
                .iter()
                .map(|address| BatchEntry {
                    address: address.clone(),
                    command: commands.get(address).cloned().unwrap_or_default(),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Uniform { hosts, .. } => hosts.len(),
            Self::PerHost(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, Self::Uniform { .. })
    }

    /// `(address, command)` pairs in fleet order
    pub fn entries(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Uniform { hosts, command } => hosts
                .iter()
                .map(|h| (h.as_str(), command.as_str()))
                .collect(),
            Self::PerHost(entries) => entries
                .iter()
                .map(|e| (e.address.as_str(), e.command.as_str()))
                .collect(),
        }
    }

    /// Addresses in fleet order
    pub fn addresses(&self) -> Vec<&str> {
        self.entries().into_iter().map(|(address, _)| address).collect()
    }

    /// Hosts that actually receive a command
    pub fn targets(&self) -> BTreeSet<String> {
        self.entries()
            .into_iter()
            .filter(|(_, command)| !command.is_empty())
            .map(|(address, _)| address.to_string())
            .collect()
    }

    pub fn command_for(&self, address: &str) -> Option<&str> {
        self.entries()
            .into_iter()
            .find(|(a, _)| *a == address)
            .map(|(_, command)| command)
    }
}
