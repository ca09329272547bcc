// file: src/fleet/mod.rs
// version: 1.0.0
// guid: 5d2c8e71-0f3a-4b96-a7e4-91b6d0c3f258

//! Fleet targeting: the active context and host selections

pub mod context;
pub mod selection;

pub use context::{ContextState, FleetContext};
pub use selection::{Selection, Target};
