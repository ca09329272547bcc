// file: src/network/session.rs
// version: 1.0.0
// guid: 81c3e5a0-6b4d-4f92-8e17-d0a9f2c6b3e5

//! Per-host session handle with a writable input stream

use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What a finished session produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_status: Option<i32>,
    /// Set when the session could not be established or broke down
    pub error: Option<String>,
}

impl SessionOutput {
    /// A command that ran to completion
    pub fn completed(stdout: Vec<String>, stderr: Vec<String>, exit_status: i32) -> Self {
        Self {
            stdout,
            stderr,
            exit_status: Some(exit_status),
            error: None,
        }
    }

    /// A session that never produced command output
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Writable end of a session's standard input
///
/// Bytes are buffered until `flush`, which hands them to the session.
#[derive(Debug)]
pub struct SessionInput {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    buffer: Vec<u8>,
}

impl Write for SessionInput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.buffer);
        self.tx
            .send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "session input closed"))
    }
}

/// Readable end of a session's standard input, held by the session worker
#[derive(Debug)]
pub struct InputStream {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl InputStream {
    /// Wait for the next flushed chunk from async code
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Wait for the next flushed chunk from a blocking worker thread
    pub fn blocking_recv(&mut self) -> Option<Vec<u8>> {
        self.rx.blocking_recv()
    }
}

/// Create a connected input pair
pub fn input_channel() -> (SessionInput, InputStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        SessionInput {
            tx,
            buffer: Vec::new(),
        },
        InputStream { rx },
    )
}

/// A running (or finished) command on one host
#[derive(Debug)]
pub struct Session {
    host: String,
    input: SessionInput,
    task: Option<JoinHandle<SessionOutput>>,
    output: Option<SessionOutput>,
}

impl Session {
    pub fn new(host: impl Into<String>, input: SessionInput, task: JoinHandle<SessionOutput>) -> Self {
        Self {
            host: host.into(),
            input,
            task: Some(task),
            output: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Standard input of the remote command
    pub fn stdin(&mut self) -> &mut SessionInput {
        &mut self.input
    }

    /// Wait for the session to finish; a panicked or cancelled worker becomes a failed output
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            let output = match task.await {
                Ok(output) => output,
                Err(e) => SessionOutput::failed(format!("session worker failed: {}", e)),
            };
            self.output = Some(output);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.output.is_some()
    }

    /// Output after `wait`; a session that was never joined reports a failure
    pub fn into_output(self) -> SessionOutput {
        self.output
            .unwrap_or_else(|| SessionOutput::failed("session was not joined"))
    }
}
