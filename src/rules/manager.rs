// file: src/rules/manager.rs
// version: 1.0.0
// guid: c4a7e1b9-0d38-4f6a-9e25-7b2f8d3c0a16

//! Rule set manager: listing, raw commands, snapshots and restores
//!
//! Owns the inventory, the fleet context and the dispatcher, and keeps the
//! three in lock-step when hosts are added or removed.

use super::confirm::{Confirm, StdinConfirm, COMMIT_TOKEN};
use super::report::Report;
use super::script::{list_command, parse_snapshot, replay_script, save_command};
use super::TableSet;
use crate::dispatch::{CommandBatch, Dispatcher, ExecutionResult};
use crate::error::{MultirouterError, Result};
use crate::fleet::context::resolve_indices_in;
use crate::fleet::{FleetContext, Selection, Target};
use crate::inventory::{Host, HostInventory};
use crate::network::SessionPool;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Shown before `load` asks for the commit token
pub const LOAD_WARNING: &str = "\nAre you absolutely sure you know what you're doing?\nThis could lock you out.\nType `COMMIT` to proceed: ";

pub struct RuleSetManager<P: SessionPool> {
    inventory: HostInventory,
    fleet: FleetContext,
    dispatcher: Dispatcher<P>,
    tables: TableSet,
    confirm: Box<dyn Confirm>,
    out: Box<dyn Write + Send>,
    colorize: bool,
}

impl<P: SessionPool> RuleSetManager<P> {
    /// Create a manager over an inventory; the pool is reconfigured to match it
    pub fn new(inventory: HostInventory, pool: P) -> Self {
        let fleet = FleetContext::new(&inventory.list_sorted());
        let mut dispatcher = Dispatcher::new(pool);
        dispatcher.sync_hosts(&inventory);
        Self {
            inventory,
            fleet,
            dispatcher,
            tables: TableSet::default(),
            confirm: Box::new(StdinConfirm),
            out: Box::new(std::io::stdout()),
            colorize: true,
        }
    }

    pub fn with_tables(mut self, tables: TableSet) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_confirm(mut self, confirm: Box<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = out;
        self
    }

    pub fn with_colors(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    pub fn inventory(&self) -> &HostInventory {
        &self.inventory
    }

    pub fn fleet(&self) -> &FleetContext {
        &self.fleet
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    // Hosts

    pub fn add_host(&mut self, host: Host) {
        info!("Adding host {}", host.address());
        let address = host.address().to_string();
        self.inventory.add(host);
        self.fleet.add_host(&address);
        self.dispatcher.sync_hosts(&self.inventory);
    }

    pub fn remove_hosts<S: AsRef<str>>(&mut self, addresses: &[S]) {
        info!("Removing {} host(s)", addresses.len());
        self.inventory.remove(addresses);
        self.fleet.remove_hosts(addresses);
        self.dispatcher.sync_hosts(&self.inventory);
    }

    /// Remove hosts by position in the sorted inventory; positions past the end are ignored
    pub fn remove_hosts_by_indices(&mut self, indices: &[i64]) {
        let sorted = self.inventory.list_sorted();
        let doomed: Vec<String> = sorted
            .iter()
            .enumerate()
            .filter(|(i, _)| indices.contains(&(*i as i64)))
            .map(|(_, h)| h.clone())
            .collect();
        self.remove_hosts(&doomed);
    }

    // Context

    pub fn set_context<S: AsRef<str>>(&mut self, addresses: &[S]) -> Result<()> {
        self.fleet.set_context(addresses)
    }

    pub fn set_context_by_indices(&mut self, indices: &[i64]) -> Result<()> {
        self.fleet.set_context_by_indices(indices)
    }

    pub fn set_context_selection(&mut self, selection: &Selection) -> Result<()> {
        match selection {
            Selection::ByAddress(set) => {
                let hosts: Vec<&String> = set.iter().collect();
                self.fleet.set_context(&hosts)
            }
            Selection::ByIndex(set) => {
                let indices: Vec<i64> = set.iter().copied().collect();
                self.fleet.set_context_by_indices(&indices)
            }
        }
    }

    pub fn set_context_all(&mut self) {
        self.fleet.set_context_all();
    }

    pub fn reset_context(&mut self) {
        self.fleet.reset();
    }

    // Tables

    pub fn add_tables<S: AsRef<str>>(&mut self, tables: &[S]) {
        self.tables.add(tables);
    }

    pub fn remove_tables<S: AsRef<str>>(&mut self, tables: &[S]) {
        self.tables.remove(tables);
    }

    // Display

    pub fn print_hosts(&mut self) -> Result<()> {
        let hosts = self.fleet.all_hosts().to_vec();
        Report::new(&self.tables, self.colorize).write_numbered(&mut *self.out, "Hosts", &hosts)?;
        Ok(())
    }

    pub fn print_context(&mut self) -> Result<()> {
        if self.fleet.is_changed() {
            let hosts = self.fleet.active_hosts().to_vec();
            Report::new(&self.tables, self.colorize).write_numbered(&mut *self.out, "Context", &hosts)?;
        } else {
            writeln!(self.out, "\nContext not set\n")?;
        }
        Ok(())
    }

    pub fn print_tables(&mut self) -> Result<()> {
        Report::new(&self.tables, self.colorize).write_numbered(
            &mut *self.out,
            "Tables",
            self.tables.as_slice(),
        )?;
        Ok(())
    }

    // Rules

    /// List rules for every managed table on the targeted hosts
    pub async fn list_rules(&mut self, verbose: bool, target: &Target) -> Result<Vec<ExecutionResult>> {
        let hosts = self.resolve_list_targets(target)?;
        let command = list_command(&self.tables, verbose);
        self.run_on(&command, true, &hosts).await
    }

    /// Run an arbitrary shell command on the targeted hosts
    pub async fn run_raw(&mut self, command: &str, sudo: bool, target: &Target) -> Result<Vec<ExecutionResult>> {
        let hosts = self.resolve_run_targets(target)?;
        self.run_on(command, sudo, &hosts).await
    }

    /// Run `iptables <args>` under sudo.
    ///
    /// Without a scoped context, a fleet of more than one host needs an
    /// explicit selection or [`Target::All`].
    pub async fn run_iptables(&mut self, args: &str, target: &Target) -> Result<Vec<ExecutionResult>> {
        if *target == Target::Context && !self.fleet.is_changed() && self.inventory.len() > 1 {
            return Err(MultirouterError::selection(
                "context not set: specify the hosts (either address or number) or 'all'",
            ));
        }
        let command = format!("iptables {}", args.trim());
        self.run_raw(&command, true, target).await
    }

    /// Snapshot every active host's rules into `<directory>/<host>.txt`
    pub async fn save(&mut self, directory: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(directory)?;
        let hosts = self.fleet.active_hosts().to_vec();
        let command = save_command(&self.tables);
        let results = self
            .dispatcher
            .dispatch(&self.inventory, &self.fleet, &command, &hosts, true)
            .await?;

        let mut written = Vec::new();
        let mut failed = Vec::new();
        for result in results {
            if result.error.is_some() || result.exit_status != Some(0) {
                warn!("Not saving snapshot for {}", result.host);
                failed.push(result);
                continue;
            }
            let path = directory.join(format!("{}.txt", result.host));
            let mut contents = String::new();
            for line in &result.stdout {
                contents.push_str(line);
                contents.push('\n');
            }
            fs::write(&path, contents)?;
            written.push(path);
        }

        Report::new(&self.tables, self.colorize).write_results(&mut *self.out, &failed)?;
        writeln!(
            self.out,
            "\nSaved {} snapshot(s) to {}\n",
            written.len(),
            directory.display()
        )?;
        info!("Saved {} snapshots to {}", written.len(), directory.display());
        Ok(written)
    }

    /// Map `<host>.txt` files in a directory to their host addresses
    pub fn snapshot_files(directory: &Path) -> Result<BTreeMap<String, PathBuf>> {
        let mut files = BTreeMap::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            if let Some(host) = path.file_stem().and_then(|s| s.to_str()) {
                files.insert(host.to_string(), path.clone());
            }
        }
        Ok(files)
    }

    /// Replace rule sets on every inventory host that has a snapshot file.
    ///
    /// Nothing is sent unless the confirmation token is exactly `COMMIT`;
    /// otherwise this returns [`MultirouterError::DestructiveActionAborted`].
    pub async fn load(&mut self, files: &BTreeMap<String, PathBuf>) -> Result<Vec<ExecutionResult>> {
        let mut scripts = BTreeMap::new();
        for (host, path) in files {
            if !self.fleet.contains(host) {
                warn!("Skipping snapshot for unknown host {}", host);
                continue;
            }
            let text = fs::read_to_string(path)?;
            let blocks = parse_snapshot(&text)?;
            scripts.insert(host.clone(), replay_script(&blocks));
        }

        if scripts.is_empty() {
            writeln!(self.out, "\nNo snapshot matches a known host\n")?;
            return Ok(Vec::new());
        }

        let token = self.confirm.obtain_token(LOAD_WARNING)?;
        if token != COMMIT_TOKEN {
            warn!("Load aborted at confirmation");
            writeln!(self.out, "\nNo worries. Better safe than sorry.\n")?;
            return Err(MultirouterError::DestructiveActionAborted);
        }

        info!("Loading snapshots onto {} host(s)", scripts.len());
        let batch = CommandBatch::per_host(self.fleet.all_hosts(), &scripts);
        let results = self
            .dispatcher
            .dispatch_batch(&self.inventory, batch, true)
            .await?;
        self.report(&results)?;
        Ok(results)
    }

    async fn run_on(&mut self, command: &str, sudo: bool, hosts: &[String]) -> Result<Vec<ExecutionResult>> {
        let results = self
            .dispatcher
            .dispatch(&self.inventory, &self.fleet, command, hosts, sudo)
            .await?;
        self.report(&results)?;
        Ok(results)
    }

    fn report(&mut self, results: &[ExecutionResult]) -> Result<()> {
        Report::new(&self.tables, self.colorize).write_results(&mut *self.out, results)?;
        Ok(())
    }

    /// Hosts for commands: selections resolve against the whole fleet
    fn resolve_run_targets(&self, target: &Target) -> Result<Vec<String>> {
        match target {
            Target::Context => Ok(self.fleet.active_hosts().to_vec()),
            Target::All => Ok(self.fleet.all_hosts().to_vec()),
            Target::Hosts(Selection::ByAddress(set)) => Ok(set.iter().cloned().collect()),
            Target::Hosts(Selection::ByIndex(set)) => {
                let indices: Vec<i64> = set.iter().copied().collect();
                resolve_indices_in(self.fleet.all_hosts(), &indices).map_err(MultirouterError::selection)
            }
        }
    }

    /// Hosts for listings: selections are narrowed to the active context
    fn resolve_list_targets(&self, target: &Target) -> Result<Vec<String>> {
        let active = self.fleet.active_hosts();
        match target {
            Target::Context => Ok(active.to_vec()),
            Target::All => Ok(self.fleet.all_hosts().to_vec()),
            Target::Hosts(Selection::ByAddress(set)) => {
                Ok(active.iter().filter(|h| set.contains(*h)).cloned().collect())
            }
            Target::Hosts(Selection::ByIndex(set)) => {
                let indices: Vec<i64> = set.iter().copied().collect();
                resolve_indices_in(active, &indices).map_err(MultirouterError::selection)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Credential;
    use crate::network::mock::ScriptedPool;
    use crate::rules::FixedToken;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn host(address: &str) -> Host {
        Host::new(address, Credential::new("admin", format!("pw-{}", address)))
    }

    fn manager(pool: ScriptedPool, token: &str) -> (RuleSetManager<ScriptedPool>, SharedBuffer) {
        let inventory = HostInventory::from_hosts(vec![
            host("10.0.0.1"),
            host("10.0.0.2"),
            host("10.0.0.3"),
        ]);
        let out = SharedBuffer::default();
        let manager = RuleSetManager::new(inventory, pool)
            .with_confirm(Box::new(FixedToken::new(token)))
            .with_output(Box::new(out.clone()))
            .with_colors(false);
        (manager, out)
    }

    #[tokio::test]
    async fn test_list_rules_respects_context() {
        // Arrange
        let pool = ScriptedPool::default();
        let (mut manager, out) = manager(pool.clone(), "COMMIT");
        manager.set_context_by_indices(&[0, 2]).unwrap();

        // Act
        let results = manager.list_rules(true, &Target::Context).await.unwrap();

        // Assert
        let hosts: Vec<&str> = results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.3"]);
        let submissions = pool.submissions();
        let submission = &submissions[0];
        assert!(submission.sudo);
        assert_eq!(submission.batch.command_for("10.0.0.2"), Some(""));
        assert!(submission
            .batch
            .command_for("10.0.0.1")
            .unwrap()
            .contains("iptables -L -t nat --line-numbers -v"));
        let text = out.text();
        assert!(text.find("10.0.0.1").unwrap() < text.find("10.0.0.3").unwrap());
    }

    #[tokio::test]
    async fn test_list_rules_intersects_explicit_hosts_with_context() {
        let pool = ScriptedPool::default();
        let (mut manager, _out) = manager(pool, "COMMIT");
        manager.set_context(&["10.0.0.2", "10.0.0.3"]).unwrap();

        let target = Target::Hosts(Selection::classify(&["10.0.0.1", "10.0.0.3"]).unwrap());
        let results = manager.list_rules(false, &target).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].host, "10.0.0.3");
    }

    #[tokio::test]
    async fn test_run_iptables_by_index_against_full_fleet() {
        let pool = ScriptedPool::default();
        let (mut manager, _out) = manager(pool.clone(), "COMMIT");
        manager.set_context(&["10.0.0.1"]).unwrap();

        let target = Target::Hosts(Selection::classify(&["2"]).unwrap());
        let results = manager.run_iptables("-A INPUT -j ACCEPT ", &target).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].host, "10.0.0.3");
        let submissions = pool.submissions();
        assert_eq!(
            submissions[0].batch.command_for("10.0.0.3"),
            Some("iptables -A INPUT -j ACCEPT")
        );
        assert_eq!(pool.stdin_for("10.0.0.3").as_deref(), Some("pw-10.0.0.3\n"));
    }

    #[tokio::test]
    async fn test_run_iptables_out_of_range_index() {
        let pool = ScriptedPool::default();
        let (mut manager, _out) = manager(pool.clone(), "COMMIT");

        let target = Target::Hosts(Selection::classify(&["0", "3"]).unwrap());
        let err = manager.run_iptables("-L", &target).await.unwrap_err();

        assert!(matches!(err, MultirouterError::Selection(_)));
        assert!(pool.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_run_iptables_requires_selection_when_unscoped() {
        let pool = ScriptedPool::default();
        let (mut manager, _out) = manager(pool.clone(), "COMMIT");

        let err = manager.run_iptables("-L", &Target::Context).await.unwrap_err();
        assert!(matches!(err, MultirouterError::Selection(_)));

        let results = manager.run_iptables("-L", &Target::All).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(pool.submissions()[0].batch.is_uniform());
    }

    #[tokio::test]
    async fn test_run_raw_without_sudo() {
        let pool = ScriptedPool::default();
        let (mut manager, out) = manager(pool.clone(), "COMMIT");

        manager.run_raw("uptime", false, &Target::Context).await.unwrap();

        assert!(!pool.submissions()[0].sudo);
        assert_eq!(pool.stdin_for("10.0.0.1"), None);
        assert!(out.text().contains("ran: uptime"));
    }

    #[tokio::test]
    async fn test_save_writes_only_active_hosts() {
        // Arrange
        let pool = ScriptedPool::default()
            .with_stdout("10.0.0.2", &["", "filter", "-P INPUT ACCEPT"])
            .with_stdout("10.0.0.3", &["", "filter", "-P INPUT DROP"]);
        let (mut manager, _out) = manager(pool, "COMMIT");
        manager.set_context(&["10.0.0.2", "10.0.0.3"]).unwrap();
        let dir = TempDir::new().unwrap();

        // Act
        let written = manager.save(dir.path()).await.unwrap();

        // Assert
        assert_eq!(written.len(), 2);
        assert!(!dir.path().join("10.0.0.1.txt").exists());
        let text = fs::read_to_string(dir.path().join("10.0.0.3.txt")).unwrap();
        assert_eq!(text, "\nfilter\n-P INPUT DROP\n");
    }

    #[tokio::test]
    async fn test_save_skips_unreachable_host() {
        let pool = ScriptedPool::default().with_unreachable("10.0.0.1");
        let (mut manager, out) = manager(pool, "COMMIT");
        let dir = TempDir::new().unwrap();

        let written = manager.save(dir.path()).await.unwrap();

        assert_eq!(written.len(), 2);
        assert!(!dir.path().join("10.0.0.1.txt").exists());
        assert!(out.text().contains("unreachable"));
    }

    #[tokio::test]
    async fn test_load_aborted_sends_nothing() {
        // Arrange
        let pool = ScriptedPool::default();
        let (mut manager, out) = manager(pool.clone(), "abort");
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("10.0.0.1.txt");
        fs::write(&path, "\nfilter\n-A INPUT -j DROP\n").unwrap();
        let files = RuleSetManager::<ScriptedPool>::snapshot_files(dir.path()).unwrap();

        // Act
        let err = manager.load(&files).await.unwrap_err();

        // Assert
        assert!(matches!(err, MultirouterError::DestructiveActionAborted));
        assert!(pool.submissions().is_empty());
        assert!(out.text().contains("Better safe than sorry"));
    }

    #[tokio::test]
    async fn test_load_confirmed_replays_known_hosts_only() {
        let pool = ScriptedPool::default();
        let (mut manager, _out) = manager(pool.clone(), "COMMIT");
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("10.0.0.2.txt"), "\nfilter\n-A INPUT -j DROP\n").unwrap();
        fs::write(dir.path().join("192.168.9.9.txt"), "\nnat\n").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        let files = RuleSetManager::<ScriptedPool>::snapshot_files(dir.path()).unwrap();

        let results = manager.load(&files).await.unwrap();

        assert_eq!(results.len(), 1);
        let submissions = pool.submissions();
        let batch = &submissions[0].batch;
        assert!(submissions[0].sudo);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.command_for("10.0.0.1"), Some(""));
        assert_eq!(
            batch.command_for("10.0.0.2"),
            Some("iptables -t filter -F && iptables -t filter -A INPUT -j DROP")
        );
        assert_eq!(pool.stdin_for("10.0.0.2").as_deref(), Some("pw-10.0.0.2\n"));
    }

    #[tokio::test]
    async fn test_add_and_remove_hosts_keep_pool_aligned() {
        let pool = ScriptedPool::default();
        let (mut manager, _out) = manager(pool, "COMMIT");
        manager.set_context(&["10.0.0.3"]).unwrap();

        manager.add_host(host("10.0.0.0"));
        manager.remove_hosts_by_indices(&[1]);

        assert_eq!(manager.inventory().list_sorted(), ["10.0.0.0", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(manager.dispatcher().pool().hosts(), manager.inventory().list_sorted());
        assert_eq!(manager.fleet().active_hosts(), ["10.0.0.3"]);

        let results = manager.run_raw("true", false, &Target::All).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_print_context_unscoped() {
        let (mut manager, out) = manager(ScriptedPool::default(), "COMMIT");
        manager.print_context().unwrap();
        assert!(out.text().contains("Context not set"));
    }
}
