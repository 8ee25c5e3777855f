// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::Ledger;
use crate::models::{Account, NewAccount};
use crate::utils::{fmt_money, id_for_account, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result};

pub fn handle(ledger: &mut Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let initial = parse_decimal(sub.get_one::<String>("initial").unwrap())?;
            let typ = sub.get_one::<String>("type").unwrap();
            let currency = sub.get_one::<String>("currency").cloned();
            let id = ledger
                .create_account(NewAccount {
                    name: name.clone(),
                    initial_balance: initial,
                    account_type: typ.clone(),
                    currency,
                })
                .with_context(|| format!("Create account '{}'", name))?;
            let acct = ledger.get_account(id)?;
            println!(
                "Added account '{}' (#{}, balance {})",
                acct.name,
                acct.id,
                fmt_money(&acct.balance, &acct.currency)
            );
        }
        Some(("list", sub)) => {
            let data = ledger.list_accounts(!sub.get_flag("all"))?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                println!("{}", account_table(&data));
            }
        }
        Some(("show", sub)) => {
            let id = id_for_account(ledger, sub.get_one::<String>("account").unwrap())?;
            let acct = ledger.get_account(id)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &acct)? {
                println!("{}", account_table(std::slice::from_ref(&acct)));
            }
        }
        Some(("rename", sub)) => {
            let id = id_for_account(ledger, sub.get_one::<String>("account").unwrap())?;
            let name = sub.get_one::<String>("name").unwrap();
            ledger.rename_account(id, name)?;
            println!("Renamed account #{} to '{}'", id, name.trim());
        }
        Some(("deactivate", sub)) => {
            let id = id_for_account(ledger, sub.get_one::<String>("account").unwrap())?;
            ledger.deactivate_account(id)?;
            println!("Deactivated account #{}", id);
        }
        Some(("reactivate", sub)) => {
            let id = id_for_account(ledger, sub.get_one::<String>("account").unwrap())?;
            ledger.reactivate_account(id)?;
            println!("Reactivated account #{}", id);
        }
        Some(("rm", sub)) => {
            let key = sub.get_one::<String>("account").unwrap();
            let id = id_for_account(ledger, key)?;
            ledger
                .delete_account(id)
                .with_context(|| format!("Remove account '{}'", key))?;
            println!("Removed account '{}'", key);
        }
        _ => {}
    }
    Ok(())
}

fn account_table(data: &[Account]) -> comfy_table::Table {
    let rows = data
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.name.clone(),
                a.account_type.clone(),
                fmt_money(&a.balance, &a.currency),
                a.created_at.format("%Y-%m-%d").to_string(),
                if a.active { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    pretty_table(&["Id", "Name", "Type", "Balance", "Created", "Active"], rows)
}
