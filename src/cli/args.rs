// file: src/cli/args.rs
// version: 2.0.0
// guid: f6g7h8i9-j0k1-2345-6789-012345fghijk

//! Command line argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "multirouter")]
#[command(about = "Manage iptables rule sets on a fleet of routers over SSH")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// JSON inventory file listing the hosts to manage
    pub inventory: PathBuf,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(short, long)]
    pub quiet: bool,

    /// Disable coloured output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Tables to manage instead of the defaults (repeatable)
    #[arg(short, long = "table", value_name = "TABLE")]
    pub tables: Vec<String>,
}
