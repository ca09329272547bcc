// file: src/rules/mod.rs
// version: 1.0.0
// guid: b3e9d07a-2f64-4c18-9a5e-61c0f8b4d2a7

//! iptables rule set management across the fleet

pub mod confirm;
pub mod manager;
pub mod report;
pub mod script;
pub mod tables;

pub use confirm::{Confirm, FixedToken, StdinConfirm, COMMIT_TOKEN};
pub use manager::RuleSetManager;
pub use tables::TableSet;
