// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::transactions::query_rows;
use crate::ledger::Ledger;
use crate::utils::TIMESTAMP_FMT;
use anyhow::{Result, bail};

pub fn handle(ledger: &Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(ledger, sub),
        _ => Ok(()),
    }
}

fn export_transactions(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();
    if fmt != "csv" && fmt != "json" {
        bail!("Unknown format: {} (use csv|json)", fmt);
    }

    let rows = query_rows(ledger, sub)?;
    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id",
                "timestamp",
                "account",
                "amount",
                "kind",
                "category",
                "description",
                "tags",
                "linked_transaction_id",
            ])?;
            for r in &rows {
                let t = &r.transaction;
                wtr.write_record([
                    t.id.to_string(),
                    t.timestamp.format(TIMESTAMP_FMT).to_string(),
                    r.account_name.clone(),
                    t.amount.to_string(),
                    t.kind.as_str().to_string(),
                    t.category.clone(),
                    t.description.clone(),
                    t.tags.clone().unwrap_or_default(),
                    t.linked_transaction_id
                        .map(|l| l.to_string())
                        .unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        _ => {
            std::fs::write(out, serde_json::to_string_pretty(&rows)?)?;
        }
    }
    println!("Exported {} transactions to {}", rows.len(), out);
    Ok(())
}
