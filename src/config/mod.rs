// file: src/config/mod.rs
// version: 2.0.0
// guid: a1b2c3d4-e5f6-7a8b-9c0d-1e2f3a4b5c6d

//! Configuration module for multirouter
//!
//! Handles loading and validation of the JSON host inventory.

pub mod inventory;
pub mod loader;

pub use inventory::{HostEntry, InventoryFile};
pub use loader::ConfigLoader;
