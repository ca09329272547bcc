// file: src/network/pool.rs
// version: 1.0.0
// guid: 4f8a2c19-d7e3-4b05-9a61-c2e8b0f5d437

//! Contract for a pool that runs one batch of commands across many hosts

use super::Session;
use crate::dispatch::CommandBatch;
use crate::inventory::Host;
use crate::Result;

/// Runs command batches concurrently across a configured host list
///
/// Batches are positionally aligned with [`SessionPool::hosts`]; a pool must
/// keep that list in the order it was configured with.
#[async_trait::async_trait]
pub trait SessionPool: Send + Sync {
    /// Replace the host list and per-host connection identity
    fn configure(&mut self, hosts: Vec<Host>);

    /// Addresses in configured order
    fn hosts(&self) -> Vec<String>;

    /// Start one session per non-empty batch entry and return immediately.
    ///
    /// When `sudo` is set the remote command runs under privilege escalation
    /// and each session waits for the secret on its input stream.
    fn submit(&self, batch: &CommandBatch, sudo: bool) -> Result<Vec<Session>>;

    /// Wait until every session has finished or failed
    async fn join(&self, sessions: &mut [Session]) {
        for session in sessions.iter_mut() {
            session.wait().await;
        }
    }
}
