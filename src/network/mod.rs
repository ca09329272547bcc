// file: src/network/mod.rs
// version: 2.0.0
// guid: 9e1d4b67-2c8f-4a30-b5d6-83f0e7a2c194

//! Session transport: the pool contract, session handles and the SSH pool

pub mod pool;
pub mod session;
pub mod ssh;

#[cfg(test)]
pub mod mock;

pub use pool::SessionPool;
pub use session::{input_channel, InputStream, Session, SessionInput, SessionOutput};
pub use ssh::SshSessionPool;
