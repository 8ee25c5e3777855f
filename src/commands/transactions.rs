// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::Ledger;
use crate::models::{NewTransaction, TransactionFilter, TransactionKind, TransactionRow, TransactionUpdate};
use crate::utils::{
    fmt_money, id_for_account, maybe_print_json, parse_date, parse_decimal, parse_timestamp,
    pretty_table, TIMESTAMP_FMT,
};
use anyhow::{Context, Result, anyhow};

pub fn handle(ledger: &mut Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(ledger, sub)?,
        Some(("list", sub)) => list(ledger, sub)?,
        Some(("show", sub)) => show(ledger, sub)?,
        Some(("edit", sub)) => edit(ledger, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            if ledger.delete_transaction(id)? {
                println!("Deleted transaction #{}", id);
            } else {
                println!("No transaction #{}", id);
            }
        }
        Some(("transfer", sub)) => transfer(ledger, sub)?,
        Some(("rm-transfer", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let removed = ledger.delete_transfer(id)?;
            println!("Deleted transfer legs {:?}", removed);
        }
        Some(("correct", sub)) => correct(ledger, sub)?,
        _ => {}
    }
    Ok(())
}

fn parse_kind(raw: Option<&String>) -> Result<Option<TransactionKind>> {
    raw.map(|k| TransactionKind::parse(k).ok_or_else(|| anyhow!("Unknown kind '{}'", k)))
        .transpose()
}

fn parse_when(raw: Option<&String>) -> Result<Option<chrono::NaiveDateTime>> {
    raw.map(|d| parse_timestamp(d)).transpose()
}

fn add(ledger: &mut Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let account_key = sub.get_one::<String>("account").unwrap();
    let account_id = id_for_account(ledger, account_key)?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let new = NewTransaction {
        account_id,
        amount,
        category: sub.get_one::<String>("category").cloned().unwrap_or_default(),
        description: sub.get_one::<String>("description").cloned().unwrap_or_default(),
        timestamp: parse_when(sub.get_one::<String>("date"))?,
        kind: parse_kind(sub.get_one::<String>("kind"))?,
        tags: sub.get_one::<String>("tags").cloned(),
    };
    let id = ledger.register_transaction(new)?;
    let acct = ledger.get_account(account_id)?;
    println!(
        "Recorded #{} {} on '{}' (balance {})",
        id,
        amount,
        acct.name,
        fmt_money(&acct.balance, &acct.currency)
    );
    Ok(())
}

/// Filter from `--account/--from/--to/--category/--limit/--offset`.
pub fn filter_from_args(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<TransactionFilter> {
    let account_id = match sub.get_one::<String>("account") {
        Some(key) => Some(id_for_account(ledger, key)?),
        None => None,
    };
    Ok(TransactionFilter {
        account_id,
        from: sub.get_one::<String>("from").map(|d| parse_date(d)).transpose()?,
        to: sub.get_one::<String>("to").map(|d| parse_date(d)).transpose()?,
        category: sub.get_one::<String>("category").cloned(),
        limit: sub.get_one::<u32>("limit").copied(),
        offset: sub.get_one::<u32>("offset").copied(),
    })
}

pub fn query_rows(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let filter = filter_from_args(ledger, sub)?;
    Ok(ledger.list_transactions(&filter)?)
}

fn list(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(ledger, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!("{}", row_table(&data));
    }
    Ok(())
}

fn show(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let row = ledger.get_transaction(*sub.get_one::<i64>("id").unwrap())?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &row)? {
        println!("{}", row_table(std::slice::from_ref(&row)));
    }
    Ok(())
}

fn row_table(data: &[TransactionRow]) -> comfy_table::Table {
    let rows = data
        .iter()
        .map(|r| {
            let t = &r.transaction;
            vec![
                t.id.to_string(),
                t.timestamp.format(TIMESTAMP_FMT).to_string(),
                r.account_name.clone(),
                t.amount.to_string(),
                t.kind.to_string(),
                t.category.clone(),
                t.description.clone(),
                t.linked_transaction_id
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    pretty_table(
        &["Id", "When", "Account", "Amount", "Kind", "Category", "Description", "Link"],
        rows,
    )
}

fn edit(ledger: &mut Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let current = ledger.get_transaction(id)?.transaction;
    let account_id = match sub.get_one::<String>("account") {
        Some(key) => id_for_account(ledger, key)?,
        None => current.account_id,
    };
    let amount = match sub.get_one::<String>("amount") {
        Some(raw) => parse_decimal(raw)?,
        None => current.amount,
    };
    let upd = TransactionUpdate {
        account_id,
        amount,
        category: sub
            .get_one::<String>("category")
            .cloned()
            .unwrap_or(current.category),
        description: sub
            .get_one::<String>("description")
            .cloned()
            .unwrap_or(current.description),
        timestamp: parse_when(sub.get_one::<String>("date"))?.unwrap_or(current.timestamp),
        tags: sub.get_one::<String>("tags").cloned().or(current.tags),
        kind: parse_kind(sub.get_one::<String>("kind"))?,
        linked_transaction_id: None,
    };
    ledger
        .update_transaction(id, upd)
        .with_context(|| format!("Edit transaction #{}", id))?;
    println!("Updated transaction #{}", id);
    Ok(())
}

fn transfer(ledger: &mut Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let from = id_for_account(ledger, sub.get_one::<String>("from").unwrap())?;
    let to = id_for_account(ledger, sub.get_one::<String>("to").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let description = sub.get_one::<String>("description").unwrap();
    let receipt = ledger.execute_transfer(
        from,
        to,
        amount,
        description,
        parse_when(sub.get_one::<String>("date"))?,
    )?;
    println!(
        "Transferred {} (legs #{} -> #{})",
        amount, receipt.outgoing_id, receipt.incoming_id
    );
    Ok(())
}

fn correct(ledger: &mut Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let id = id_for_account(ledger, sub.get_one::<String>("account").unwrap())?;
    let desired = parse_decimal(sub.get_one::<String>("balance").unwrap())?;
    match ledger.correct_balance(id, desired, parse_when(sub.get_one::<String>("date"))?)? {
        Some(tid) => println!("Posted correction #{}", tid),
        None => println!("Balance already matches, nothing to correct"),
    }
    Ok(())
}
