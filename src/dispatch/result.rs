// file: src/dispatch/result.rs
// version: 1.0.0
// guid: f2a8c5d1-47e0-4b63-9d8f-3c6b1e0a7d52

use crate::error::MultirouterError;
use crate::network::SessionOutput;

/// Outcome of one command on one host
#[derive(Debug)]
pub struct ExecutionResult {
    pub host: String,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_status: Option<i32>,
    /// Set when the host could not be reached; stdout is empty in that case
    pub error: Option<MultirouterError>,
}

impl ExecutionResult {
    pub fn from_output(host: impl Into<String>, output: SessionOutput) -> Self {
        let host = host.into();
        let error = output
            .error
            .map(|reason| MultirouterError::unreachable(host.clone(), reason));
        Self {
            host,
            stdout: output.stdout,
            stderr: output.stderr,
            exit_status: output.exit_status,
            error,
        }
    }

    /// Reached the host and the command exited 0
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.exit_status == Some(0)
    }

    /// Stdout joined back into text
    pub fn output_text(&self) -> String {
        self.stdout.join("\n")
    }
}
