// file: src/lib.rs
// version: 3.0.0
// guid: d82472d1-7f0f-4eb4-b0a3-6e1547103eb4

//! # Multirouter
//!
//! Manages iptables rule sets on a fleet of routers over parallel SSH
//! sessions. Commands run on every host in the active context at once;
//! results come back ordered by host address.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fleet;
pub mod inventory;
pub mod logging;
pub mod network;
pub mod rules;

pub use error::{MultirouterError, Result};

/// Version information for the utility
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
