// file: src/dispatch/dispatcher.rs
// version: 1.0.0
// guid: 8c3f1a6e-5d92-4b07-a8e3-e4b0d7f2c916

//! Parallel command dispatch with privilege injection

use super::{CommandBatch, ExecutionResult};
use crate::error::{MultirouterError, Result};
use crate::fleet::FleetContext;
use crate::inventory::HostInventory;
use crate::network::{SessionInput, SessionPool};
use std::collections::BTreeSet;
use std::io::Write;
use tracing::{debug, info, warn};

/// Runs one logical command against a set of hosts and correlates the results
pub struct Dispatcher<P: SessionPool> {
    pool: P,
}

impl<P: SessionPool> Dispatcher<P> {
    pub fn new(pool: P) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Reconfigure the pool so its host array matches the inventory's sorted order
    pub fn sync_hosts(&mut self, inventory: &HostInventory) {
        self.pool.configure(inventory.hosts_sorted());
    }

    /// Run `command` on `targets`.
    ///
    /// Every target must belong to the fleet; nothing is submitted otherwise.
    /// Results come back sorted by host address.
    pub async fn dispatch<S: AsRef<str>>(
        &self,
        inventory: &HostInventory,
        fleet: &FleetContext,
        command: &str,
        targets: &[S],
        requires_privilege: bool,
    ) -> Result<Vec<ExecutionResult>> {
        let targets: BTreeSet<String> = targets.iter().map(|t| t.as_ref().to_string()).collect();
        if let Some(unknown) = targets.iter().find(|t| !fleet.contains(t)) {
            return Err(MultirouterError::unknown_host(unknown.clone()));
        }

        let all_hosts = fleet.all_hosts();
        let batch = if targets.len() == all_hosts.len() {
            CommandBatch::uniform(all_hosts, command)
        } else {
            CommandBatch::sparse(all_hosts, &targets, command)
        };
        debug!(
            "Built {} batch for {} of {} hosts",
            if batch.is_uniform() { "uniform" } else { "sparse" },
            targets.len(),
            all_hosts.len()
        );

        self.dispatch_batch(inventory, batch, requires_privilege).await
    }

    /// Submit a prepared batch and collect results for its non-blank entries
    pub async fn dispatch_batch(
        &self,
        inventory: &HostInventory,
        batch: CommandBatch,
        requires_privilege: bool,
    ) -> Result<Vec<ExecutionResult>> {
        let pool_hosts = self.pool.hosts();
        if batch.addresses() != pool_hosts {
            return Err(MultirouterError::validation(
                "command batch is not aligned with the session pool hosts",
            ));
        }

        let targets = batch.targets();
        if targets.is_empty() {
            debug!("Nothing to dispatch");
            return Ok(Vec::new());
        }

        // Resolve every secret before anything leaves this process
        let secrets = if requires_privilege {
            targets
                .iter()
                .map(|host| {
                    inventory
                        .get_credential(host)
                        .map(|c| (host.clone(), c.password().to_string()))
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        info!(
            "Dispatching to {} host(s){}",
            targets.len(),
            if requires_privilege { " with sudo" } else { "" }
        );
        let mut sessions = self.pool.submit(&batch, requires_privilege)?;

        // Passwords go out to the whole batch before waiting on any host; a
        // sudo prompt on one host must not hold up the others.
        for session in sessions.iter_mut() {
            let Some((_, password)) = secrets.iter().find(|(host, _)| host == session.host()) else {
                continue;
            };
            let host = session.host().to_string();
            if let Err(e) = send_secret(session.stdin(), password) {
                warn!("Could not send sudo password to {}: {}", host, e);
            }
        }

        self.pool.join(&mut sessions).await;

        let mut results: Vec<ExecutionResult> = sessions
            .into_iter()
            .filter(|s| targets.contains(s.host()))
            .map(|s| {
                let host = s.host().to_string();
                ExecutionResult::from_output(host, s.into_output())
            })
            .collect();
        results.sort_by(|a, b| a.host.cmp(&b.host));

        for e in results.iter().filter_map(|r| r.error.as_ref()) {
            warn!("{}", e);
        }

        Ok(results)
    }
}

fn send_secret(stdin: &mut SessionInput, secret: &str) -> std::io::Result<()> {
    stdin.write_all(secret.as_bytes())?;
    stdin.write_all(b"\n")?;
    stdin.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Credential, Host};
    use crate::network::mock::ScriptedPool;

    const HOSTS: [&str; 4] = ["10.0.0.4", "10.0.0.1", "10.0.0.3", "10.0.0.2"];

    fn setup(pool: ScriptedPool) -> (HostInventory, FleetContext, Dispatcher<ScriptedPool>) {
        let inventory = HostInventory::from_hosts(
            HOSTS
                .iter()
                .map(|h| Host::new(*h, Credential::new("admin", format!("pw-{}", h)))),
        );
        let fleet = FleetContext::new(&inventory.list_sorted());
        let mut dispatcher = Dispatcher::new(pool);
        dispatcher.sync_hosts(&inventory);
        (inventory, fleet, dispatcher)
    }

    #[tokio::test]
    async fn test_full_fleet_uses_uniform_batch() {
        // Arrange
        let pool = ScriptedPool::default();
        let (inventory, fleet, dispatcher) = setup(pool.clone());

        // Act
        let results = dispatcher
            .dispatch(&inventory, &fleet, "uptime", fleet.all_hosts(), false)
            .await
            .unwrap();

        // Assert
        assert_eq!(results.len(), 4);
        let submissions = pool.submissions();
        assert_eq!(submissions.len(), 1);
        assert!(submissions[0].batch.is_uniform());
        assert!(!submissions[0].sudo);
    }

    #[tokio::test]
    async fn test_sparse_batch_results_only_for_targets() {
        let pool = ScriptedPool::default();
        let (inventory, fleet, dispatcher) = setup(pool.clone());

        let results = dispatcher
            .dispatch(&inventory, &fleet, "iptables -S", &["10.0.0.3", "10.0.0.1"], false)
            .await
            .unwrap();

        let hosts: Vec<&str> = results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.3"]);
        let submissions = pool.submissions();
        let batch = &submissions[0].batch;
        assert!(!batch.is_uniform());
        assert_eq!(
            batch.entries(),
            vec![
                ("10.0.0.1", "iptables -S"),
                ("10.0.0.2", ""),
                ("10.0.0.3", "iptables -S"),
                ("10.0.0.4", ""),
            ]
        );
    }

    #[tokio::test]
    async fn test_results_sorted_despite_reverse_completion() {
        let pool = ScriptedPool::default();
        let (inventory, fleet, dispatcher) = setup(pool.clone());

        let results = dispatcher
            .dispatch(&inventory, &fleet, "hostname", fleet.all_hosts(), false)
            .await
            .unwrap();

        let completion = pool.completion_order();
        assert_eq!(completion.first().map(String::as_str), Some("10.0.0.4"));
        let hosts: Vec<&str> = results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]);
    }

    #[tokio::test]
    async fn test_results_sorted_when_sessions_returned_out_of_order() {
        // Arrange
        let pool = ScriptedPool::default().with_reversed_sessions();
        let (inventory, fleet, dispatcher) = setup(pool.clone());

        // Act
        let results = dispatcher
            .dispatch(&inventory, &fleet, "iptables -L", &["10.0.0.4", "10.0.0.2", "10.0.0.1"], true)
            .await
            .unwrap();

        // Assert
        let hosts: Vec<&str> = results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "10.0.0.4"]);
        assert!(results.iter().all(ExecutionResult::is_success));
        assert_eq!(pool.stdin_for("10.0.0.4").as_deref(), Some("pw-10.0.0.4\n"));
    }

    #[tokio::test]
    async fn test_privileged_dispatch_injects_each_password() {
        // Arrange
        let pool = ScriptedPool::default();
        let (inventory, fleet, dispatcher) = setup(pool.clone());

        // Act
        let results = dispatcher
            .dispatch(&inventory, &fleet, "iptables -L", &["10.0.0.2", "10.0.0.4"], true)
            .await
            .unwrap();

        // Assert
        assert!(results.iter().all(ExecutionResult::is_success));
        assert_eq!(pool.stdin_for("10.0.0.2").as_deref(), Some("pw-10.0.0.2\n"));
        assert_eq!(pool.stdin_for("10.0.0.4").as_deref(), Some("pw-10.0.0.4\n"));
        assert_eq!(pool.stdin_for("10.0.0.1"), None);
        assert!(pool.submissions()[0].sudo);
    }

    #[tokio::test]
    async fn test_unprivileged_dispatch_sends_no_password() {
        let pool = ScriptedPool::default();
        let (inventory, fleet, dispatcher) = setup(pool.clone());

        dispatcher
            .dispatch(&inventory, &fleet, "uptime", &["10.0.0.1"], false)
            .await
            .unwrap();

        assert_eq!(pool.stdin_for("10.0.0.1"), None);
    }

    #[tokio::test]
    async fn test_unreachable_host_does_not_abort_batch() {
        let pool = ScriptedPool::default().with_unreachable("10.0.0.2");
        let (inventory, fleet, dispatcher) = setup(pool.clone());

        let results = dispatcher
            .dispatch(&inventory, &fleet, "iptables -S", fleet.all_hosts(), true)
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        let failed: Vec<&str> = results
            .iter()
            .filter(|r| r.error.is_some())
            .map(|r| r.host.as_str())
            .collect();
        assert_eq!(failed, vec!["10.0.0.2"]);
        assert!(results
            .iter()
            .filter(|r| r.host != "10.0.0.2")
            .all(ExecutionResult::is_success));
    }

    #[tokio::test]
    async fn test_unknown_target_fails_before_submission() {
        let pool = ScriptedPool::default();
        let (inventory, fleet, dispatcher) = setup(pool.clone());

        let err = dispatcher
            .dispatch(&inventory, &fleet, "uptime", &["10.9.9.9"], false)
            .await
            .unwrap_err();

        assert!(matches!(err, MultirouterError::UnknownHost(_)));
        assert!(pool.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_misaligned_batch_rejected() {
        let pool = ScriptedPool::default();
        let (inventory, _fleet, dispatcher) = setup(pool.clone());
        let batch = CommandBatch::uniform(&["10.0.0.1".to_string()], "uptime");

        let err = dispatcher
            .dispatch_batch(&inventory, batch, false)
            .await
            .unwrap_err();

        assert!(matches!(err, MultirouterError::Validation(_)));
        assert!(pool.submissions().is_empty());
    }
}
