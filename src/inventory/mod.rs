// file: src/inventory/mod.rs
// version: 1.0.0
// guid: 0b7e2d94-5a1c-4f36-8e29-c6d3a1f07b52

//! Host inventory: credentials, hosts and the address-keyed store

pub mod host;
pub mod store;

pub use host::{Credential, Host, DEFAULT_SSH_PORT};
pub use store::HostInventory;
