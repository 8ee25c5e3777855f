// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use catoledger::{Ledger, cli, commands, config};

fn init_logging() {
    let filter = EnvFilter::try_from_env(config::LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let path = config::db_path()?;
    let mut ledger = Ledger::open(&path)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", path.display());
        }
        Some(("account", sub)) => commands::accounts::handle(&mut ledger, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut ledger, sub)?,
        Some(("portfolio", sub)) => commands::portfolio::handle(&mut ledger, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&ledger, sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(&mut ledger, sub)?,
        Some(("config", sub)) => commands::config::handle(&mut ledger, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
