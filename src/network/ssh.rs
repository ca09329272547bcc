// file: src/network/ssh.rs
// version: 2.0.0
// guid: a6d0f3c8-1e5b-4972-8c4d-b7e2f9a0136c

//! SSH session pool for fleet-wide command execution

use super::{input_channel, InputStream, Session, SessionOutput, SessionPool};
use crate::dispatch::CommandBatch;
use crate::error::MultirouterError;
use crate::inventory::Host;
use crate::Result;
use ssh2::Session as Ssh2Session;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const DRAIN_POLL_MS: u64 = 5;

/// Session pool backed by one blocking ssh2 connection per host and batch
///
/// There is no per-session timeout: a host that never answers keeps the
/// whole batch waiting in `join`.
#[derive(Debug, Clone, Default)]
pub struct SshSessionPool {
    hosts: Vec<Host>,
}

impl SshSessionPool {
    /// Create a pool over hosts in canonical order
    pub fn new(hosts: Vec<Host>) -> Self {
        Self { hosts }
    }
}

#[async_trait::async_trait]
impl SessionPool for SshSessionPool {
    fn configure(&mut self, hosts: Vec<Host>) {
        debug!("SSH pool configured for {} hosts", hosts.len());
        self.hosts = hosts;
    }

    fn hosts(&self) -> Vec<String> {
        self.hosts.iter().map(|h| h.address().to_string()).collect()
    }

    fn submit(&self, batch: &CommandBatch, sudo: bool) -> Result<Vec<Session>> {
        if batch.len() != self.hosts.len() {
            return Err(MultirouterError::transport(format!(
                "batch has {} entries but the pool has {} hosts",
                batch.len(),
                self.hosts.len()
            )));
        }

        let mut sessions = Vec::new();
        for (host, (address, command)) in self.hosts.iter().zip(batch.entries()) {
            if host.address() != address {
                return Err(MultirouterError::transport(format!(
                    "batch entry {} does not line up with pool host {}",
                    address,
                    host.address()
                )));
            }
            if command.is_empty() {
                continue;
            }

            let (input, stream) = input_channel();
            let host = host.clone();
            let command = if sudo {
                wrap_sudo(command)
            } else {
                command.to_string()
            };
            let task =
                tokio::task::spawn_blocking(move || run_remote(&host, &command, sudo, stream));
            sessions.push(Session::new(address, input, task));
        }

        info!("Submitted {} SSH sessions", sessions.len());
        Ok(sessions)
    }
}

/// Run a command under `sudo`, reading the password from stdin without a prompt
pub fn wrap_sudo(command: &str) -> String {
    format!("sudo -S -p '' sh -c '{}'", command.replace('\'', r"'\''"))
}

fn run_remote(host: &Host, command: &str, sudo: bool, input: InputStream) -> SessionOutput {
    let session = match connect(host) {
        Ok(session) => session,
        Err(e) => {
            warn!("{}", e);
            return SessionOutput::failed(failure_reason(e));
        }
    };

    let output = match execute(&session, host.address(), command, sudo, input) {
        Ok(output) => output,
        Err(e) => {
            warn!("Command on {} failed: {}", host.address(), e);
            SessionOutput::failed(failure_reason(e))
        }
    };

    let _ = session.disconnect(None, "", None);
    output
}

/// Reason text for a failed session; the host is added back by the caller
fn failure_reason(error: MultirouterError) -> String {
    match error {
        MultirouterError::UnreachableHost { reason, .. } => reason,
        other => other.to_string(),
    }
}

fn connect(host: &Host) -> Result<Ssh2Session> {
    let address = host.address();
    let credential = host.credential();
    debug!("Connecting to {} as {}", host.socket_addr(), credential.user());

    let tcp = TcpStream::connect(host.socket_addr())
        .map_err(|e| MultirouterError::unreachable(address, format!("connect failed: {}", e)))?;

    let mut session = Ssh2Session::new().map_err(|e| {
        MultirouterError::unreachable(address, format!("failed to create SSH session: {}", e))
    })?;

    session.set_tcp_stream(tcp);
    session
        .handshake()
        .map_err(|e| MultirouterError::unreachable(address, format!("SSH handshake failed: {}", e)))?;

    let auth = match credential.key_ref() {
        Some(key) => session.userauth_pubkey_file(credential.user(), None, Path::new(key), None),
        None => session.userauth_password(credential.user(), credential.password()),
    };
    auth.map_err(|e| {
        MultirouterError::unreachable(address, format!("SSH authentication failed: {}", e))
    })?;

    if !session.authenticated() {
        return Err(MultirouterError::unreachable(address, "SSH authentication failed"));
    }

    Ok(session)
}

fn execute(
    session: &Ssh2Session,
    address: &str,
    command: &str,
    sudo: bool,
    mut input: InputStream,
) -> Result<SessionOutput> {
    let ssh_err = |what: &str, e: ssh2::Error| {
        MultirouterError::transport(format!("{} on {}: {}", what, address, e))
    };

    let mut channel = session
        .channel_session()
        .map_err(|e| ssh_err("failed to create SSH channel", e))?;
    channel
        .exec(command)
        .map_err(|e| ssh_err("failed to execute command", e))?;

    if sudo {
        // sudo blocks on its password before producing any output
        if let Some(secret) = input.blocking_recv() {
            channel.write_all(&secret)?;
            channel.flush()?;
        }
        channel
            .send_eof()
            .map_err(|e| ssh_err("failed to close stdin", e))?;
    }

    // Non-blocking while draining so a full stderr window cannot stall stdout
    session.set_blocking(false);
    let drained = drain_streams(channel.stream(0), channel.stderr());
    session.set_blocking(true);
    let (stdout, stderr) = drained?;
    let stdout = String::from_utf8_lossy(&stdout);
    let stderr = String::from_utf8_lossy(&stderr);

    channel
        .wait_close()
        .map_err(|e| ssh_err("failed to close SSH channel", e))?;
    let exit_status = channel
        .exit_status()
        .map_err(|e| ssh_err("failed to get exit status", e))?;

    if exit_status != 0 {
        warn!("Command on {} exited with {}", address, exit_status);
    }

    Ok(SessionOutput::completed(
        stdout.lines().map(str::to_string).collect(),
        stderr.lines().map(str::to_string).collect(),
        exit_status,
    ))
}

/// Read two streams to EOF, alternating between them.
///
/// `WouldBlock` from either side moves on to the other one.
fn drain_streams<O: Read, E: Read>(mut out: O, mut err: E) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut out_open = true;
    let mut err_open = true;
    let mut buf = [0u8; 8192];

    while out_open || err_open {
        let mut progressed = false;
        for (open, reader, sink) in [
            (&mut out_open, &mut out as &mut dyn Read, &mut stdout),
            (&mut err_open, &mut err as &mut dyn Read, &mut stderr),
        ] {
            if !*open {
                continue;
            }
            match reader.read(&mut buf) {
                Ok(0) => *open = false,
                Ok(n) => {
                    sink.extend_from_slice(&buf[..n]);
                    progressed = true;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => progressed = true,
                Err(e) => return Err(e),
            }
        }
        if !progressed && (out_open || err_open) {
            thread::sleep(Duration::from_millis(DRAIN_POLL_MS));
        }
    }

    Ok((stdout, stderr))
}
