// file: src/fleet/context.rs
// version: 1.0.0
// guid: 2a6f0d83-b1e7-4c59-8f2a-7c4e9b0d1a36

//! Fleet context state machine
//!
//! The fleet is either unscoped (every command targets all hosts) or scoped
//! to a sorted subset of the inventory. The active list is always a subset
//! of the full list.

use crate::error::{MultirouterError, Result};
use tracing::debug;

/// Whether a narrowed context is in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Unscoped,
    Scoped,
}

/// Full host list and the currently targeted subset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetContext {
    all_hosts: Vec<String>,
    active_hosts: Vec<String>,
    changed: bool,
}

impl FleetContext {
    /// Create an unscoped context over the given addresses
    pub fn new<S: AsRef<str>>(addresses: &[S]) -> Self {
        let mut all_hosts: Vec<String> = addresses.iter().map(|a| a.as_ref().to_string()).collect();
        all_hosts.sort();
        all_hosts.dedup();
        Self {
            active_hosts: all_hosts.clone(),
            all_hosts,
            changed: false,
        }
    }

    pub fn all_hosts(&self) -> &[String] {
        &self.all_hosts
    }

    pub fn active_hosts(&self) -> &[String] {
        &self.active_hosts
    }

    /// True while a context has been set and not reset
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn state(&self) -> ContextState {
        if self.changed {
            ContextState::Scoped
        } else {
            ContextState::Unscoped
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.all_hosts.binary_search_by(|h| h.as_str().cmp(address)).is_ok()
    }

    /// Add a host to the fleet. A scoped context does not see it until selected.
    pub fn add_host(&mut self, address: &str) {
        if let Err(pos) = self.all_hosts.binary_search_by(|h| h.as_str().cmp(address)) {
            self.all_hosts.insert(pos, address.to_string());
        }
        if !self.changed {
            self.active_hosts = self.all_hosts.clone();
        }
    }

    /// Remove hosts from the fleet and from a scoped context
    pub fn remove_hosts<S: AsRef<str>>(&mut self, addresses: &[S]) {
        let doomed = |h: &String| addresses.iter().any(|a| a.as_ref() == h);
        self.all_hosts.retain(|h| !doomed(h));
        if self.changed {
            self.active_hosts.retain(|h| !doomed(h));
        } else {
            self.active_hosts = self.all_hosts.clone();
        }
    }

    /// Scope the context to the given addresses.
    ///
    /// Validation runs over the whole list before anything changes.
    pub fn set_context<S: AsRef<str>>(&mut self, addresses: &[S]) -> Result<()> {
        if addresses.is_empty() {
            return Err(MultirouterError::context("no hosts given"));
        }
        for address in addresses {
            if !self.contains(address.as_ref()) {
                return Err(MultirouterError::context(format!(
                    "Host {} not in host list",
                    address.as_ref()
                )));
            }
        }

        let mut active: Vec<String> = addresses.iter().map(|a| a.as_ref().to_string()).collect();
        active.sort();
        active.dedup();

        debug!("Context set to {:?}", active);
        self.active_hosts = active;
        self.changed = true;
        Ok(())
    }

    /// Scope the context by positions in the sorted full host list
    pub fn set_context_by_indices(&mut self, indices: &[i64]) -> Result<()> {
        let hosts = self
            .resolve_indices(indices)
            .map_err(MultirouterError::context)?;
        self.set_context(&hosts)
    }

    /// Scope the context to every host
    pub fn set_context_all(&mut self) {
        self.active_hosts = self.all_hosts.clone();
        self.changed = true;
    }

    /// Return to the unscoped state
    pub fn reset(&mut self) {
        self.active_hosts = self.all_hosts.clone();
        self.changed = false;
    }

    /// Map indices onto the sorted full host list.
    ///
    /// Fails with a message if any index falls outside the list.
    pub fn resolve_indices(&self, indices: &[i64]) -> std::result::Result<Vec<String>, String> {
        resolve_indices_in(&self.all_hosts, indices)
    }
}

/// Map indices onto an arbitrary sorted host list
pub(crate) fn resolve_indices_in(
    hosts: &[String],
    indices: &[i64],
) -> std::result::Result<Vec<String>, String> {
    let (Some(min), Some(max)) = (indices.iter().min(), indices.iter().max()) else {
        return Err("no indices given".to_string());
    };
    if *min < 0 || *max >= hosts.len() as i64 {
        return Err("Indices out of range".to_string());
    }
    let mut resolved: Vec<String> = indices.iter().map(|&i| hosts[i as usize].clone()).collect();
    resolved.sort();
    resolved.dedup();
    Ok(resolved)
}
