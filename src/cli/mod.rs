// file: src/cli/mod.rs
// version: 2.0.0
// guid: e5f6g7h8-i9j0-1234-5678-901234efghij

//! Command line interface and interactive shell

pub mod args;
pub mod shell;

pub use args::Cli;
pub use shell::{parse_command, Command, LineSource, Shell, StdinLines};
