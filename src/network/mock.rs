// file: src/network/mock.rs
// version: 1.0.0
// guid: 0e5c9b27-a4f1-4d83-b6e0-7f2d3a8c1b64

//! Scripted session pool for tests
//!
//! Sessions finish in reverse submission order so callers cannot rely on
//! completion order, and can be handed back in reverse as well. Clones share
//! their recordings.

use super::{input_channel, Session, SessionOutput, SessionPool};
use crate::dispatch::CommandBatch;
use crate::inventory::Host;
use crate::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Submission {
    pub batch: CommandBatch,
    pub sudo: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPool {
    hosts: Vec<String>,
    stdout: HashMap<String, Vec<String>>,
    unreachable: BTreeSet<String>,
    reverse_sessions: bool,
    submissions: Arc<Mutex<Vec<Submission>>>,
    stdin: Arc<Mutex<BTreeMap<String, String>>>,
    completion_order: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPool {
    pub fn new(hosts: &[&str]) -> Self {
        let mut hosts: Vec<String> = hosts.iter().map(|h| h.to_string()).collect();
        hosts.sort();
        Self {
            hosts,
            ..Self::default()
        }
    }

    /// Fixed stdout for a host; others echo their command
    pub fn with_stdout(mut self, host: &str, lines: &[&str]) -> Self {
        self.stdout
            .insert(host.to_string(), lines.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_unreachable(mut self, host: &str) -> Self {
        self.unreachable.insert(host.to_string());
        self
    }

    /// Return sessions from `submit` in reverse host order
    pub fn with_reversed_sessions(mut self) -> Self {
        self.reverse_sessions = true;
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn stdin_for(&self, host: &str) -> Option<String> {
        self.stdin.lock().unwrap().get(host).cloned()
    }

    pub fn completion_order(&self) -> Vec<String> {
        self.completion_order.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SessionPool for ScriptedPool {
    fn configure(&mut self, hosts: Vec<Host>) {
        self.hosts = hosts.iter().map(|h| h.address().to_string()).collect();
    }

    fn hosts(&self) -> Vec<String> {
        self.hosts.clone()
    }

    fn submit(&self, batch: &CommandBatch, sudo: bool) -> Result<Vec<Session>> {
        assert_eq!(batch.addresses(), self.hosts, "batch misaligned with pool");
        self.submissions.lock().unwrap().push(Submission {
            batch: batch.clone(),
            sudo,
        });

        let entries = batch.entries();
        let total = entries.len() as u64;
        let mut sessions = Vec::new();
        for (i, (address, command)) in entries.into_iter().enumerate() {
            if command.is_empty() {
                continue;
            }
            let (input, mut stream) = input_channel();
            let host = address.to_string();
            let command = command.to_string();
            let unreachable = self.unreachable.contains(&host);
            let stdout = self.stdout.get(&host).cloned();
            let stdin = Arc::clone(&self.stdin);
            let order = Arc::clone(&self.completion_order);
            let delay = Duration::from_millis((total - i as u64) * 5);

            let task = tokio::spawn(async move {
                if unreachable {
                    return SessionOutput::failed("connection refused");
                }
                if sudo {
                    match tokio::time::timeout(Duration::from_secs(2), stream.recv()).await {
                        Ok(Some(bytes)) => {
                            stdin
                                .lock()
                                .unwrap()
                                .insert(host.clone(), String::from_utf8_lossy(&bytes).to_string());
                        }
                        _ => return SessionOutput::failed("sudo password never arrived"),
                    }
                }
                tokio::time::sleep(delay).await;
                order.lock().unwrap().push(host.clone());
                let lines = stdout.unwrap_or_else(|| vec![format!("ran: {}", command)]);
                SessionOutput::completed(lines, vec![], 0)
            });
            sessions.push(Session::new(address, input, task));
        }
        if self.reverse_sessions {
            sessions.reverse();
        }
        Ok(sessions)
    }
}
