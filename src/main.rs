// file: src/main.rs
// version: 2.0.0
// guid: h8i9j0k1-l2m3-4567-8901-234567hijklm

//! Multirouter - Main entry point

use clap::Parser;
use multirouter::{
    cli::{Cli, Shell, StdinLines},
    config::ConfigLoader,
    logging::{init_logger, with_operation_span},
    network::SshSessionPool,
    rules::{RuleSetManager, TableSet},
    Result,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logger(cli.verbose, cli.quiet)?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    let loader = ConfigLoader::new();
    let inventory = with_operation_span("load_inventory", || {
        loader.load_inventory(&cli.inventory)
    })?;
    info!("Managing {} hosts", inventory.len());

    let tables = if cli.tables.is_empty() {
        TableSet::default()
    } else {
        TableSet::new(&cli.tables)
    };

    let pool = SshSessionPool::new(inventory.hosts_sorted());
    let manager = RuleSetManager::new(inventory, pool)
        .with_tables(tables)
        .with_colors(!cli.no_color);

    Shell::new(manager).run(&mut StdinLines).await
}
