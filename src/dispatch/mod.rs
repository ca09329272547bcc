// file: src/dispatch/mod.rs
// version: 1.0.0
// guid: d41e7a08-93c5-4f2b-a6d1-0b8e5c2f7a93

//! Command dispatch: inventory-aligned batches and host-correlated results

pub mod batch;
pub mod dispatcher;
pub mod result;

pub use batch::CommandBatch;
pub use dispatcher::Dispatcher;
pub use result::ExecutionResult;
