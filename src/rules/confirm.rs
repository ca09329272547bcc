// file: src/rules/confirm.rs
// version: 1.0.0
// guid: 91f4c2d8-6e0b-4a75-b3c9-e8a1d7f05b26

//! Confirmation gate for destructive operations

use crate::Result;
use std::io::{self, BufRead, Write};

/// Literal the operator must type before rule sets are replaced
pub const COMMIT_TOKEN: &str = "COMMIT";

/// Source of a confirmation token
pub trait Confirm: Send {
    /// Show `prompt` and return the operator's answer without its line ending
    fn obtain_token(&mut self, prompt: &str) -> Result<String>;
}

/// Reads the token from standard input
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn obtain_token(&mut self, prompt: &str) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Always answers with the same token
#[derive(Debug, Clone)]
pub struct FixedToken(pub String);

impl FixedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Confirm for FixedToken {
    fn obtain_token(&mut self, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}
