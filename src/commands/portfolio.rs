// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::Ledger;
use crate::models::{NewPosition, PositionMetadata, PositionView, Trade};
use crate::utils::{id_for_account, maybe_print_json, parse_date, parse_decimal, parse_timestamp, pretty_table};
use anyhow::Result;

pub fn handle(ledger: &mut Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("buy", sub)) => buy(ledger, sub)?,
        Some(("sell", sub)) => sell(ledger, sub)?,
        Some(("value", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let price = parse_decimal(sub.get_one::<String>("price").unwrap())?;
            let as_of = sub.get_one::<String>("date").map(|d| parse_date(d)).transpose()?;
            ledger.mark_to_market(id, price, as_of)?;
            println!("Position #{} valued at {}", id, price);
        }
        Some(("edit", sub)) => edit(ledger, sub)?,
        Some(("close", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let written_off = ledger.close_position(id)?;
            println!("Closed position #{} (cost basis written off: {:.2})", id, written_off);
        }
        Some(("list", sub)) => {
            let data = ledger.list_positions(!sub.get_flag("all"))?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                println!("{}", position_table(&data));
            }
        }
        Some(("history", sub)) => {
            let data = ledger.portfolio_history()?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|s| vec![s.date.to_string(), format!("{:.2}", s.total_value)])
                    .collect();
                println!("{}", pretty_table(&["Date", "Value"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

fn trade_from_args(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<Trade> {
    Ok(Trade {
        quantity: parse_decimal(sub.get_one::<String>("quantity").unwrap())?,
        unit_price: parse_decimal(sub.get_one::<String>("price").unwrap())?,
        fees: parse_decimal(sub.get_one::<String>("fees").unwrap())?,
        timestamp: sub
            .get_one::<String>("date")
            .map(|d| parse_timestamp(d))
            .transpose()?,
        cash_account_id: sub
            .get_one::<String>("cash-account")
            .map(|k| id_for_account(ledger, k))
            .transpose()?,
    })
}

fn buy(ledger: &mut Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let key = sub.get_one::<String>("instrument").unwrap();
    let trade = trade_from_args(ledger, sub)?;
    let holding_account_id = sub
        .get_one::<String>("holding-account")
        .map(|k| id_for_account(ledger, k))
        .transpose()?;
    let new = NewPosition {
        instrument_name: sub.get_one::<String>("name").unwrap_or(key).clone(),
        symbol: sub.get_one::<String>("symbol").cloned(),
        asset_type: sub.get_one::<String>("type").cloned().unwrap_or_default(),
        currency: sub.get_one::<String>("currency").cloned(),
        holding_account_id,
        notes: sub.get_one::<String>("notes").cloned().unwrap_or_default(),
    };
    let id = ledger.open_or_buy(key, new, trade)?;
    let v = ledger.get_position(id)?;
    println!(
        "Position #{} {}: qty {} avg cost {:.4}",
        id, v.position.instrument_name, v.position.quantity, v.position.average_unit_cost
    );
    Ok(())
}

fn sell(ledger: &mut Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let trade = trade_from_args(ledger, sub)?;
    let out = ledger.sell(id, trade)?;
    println!(
        "Sold from #{}: realized P/L {:.2}, remaining qty {}",
        id, out.realized_pl, out.remaining_quantity
    );
    Ok(())
}

fn edit(ledger: &mut Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let current = ledger.get_position(id)?.position;
    let mut meta = PositionMetadata::from(&current);
    if let Some(v) = sub.get_one::<String>("name") {
        meta.instrument_name = v.clone();
    }
    if let Some(v) = sub.get_one::<String>("symbol") {
        meta.symbol = Some(v.clone());
    }
    if let Some(v) = sub.get_one::<String>("type") {
        meta.asset_type = v.clone();
    }
    if let Some(v) = sub.get_one::<String>("currency") {
        meta.currency = v.clone();
    }
    if let Some(v) = sub.get_one::<String>("holding-account") {
        meta.holding_account_id = Some(id_for_account(ledger, v)?);
    }
    if let Some(v) = sub.get_one::<String>("notes") {
        meta.notes = v.clone();
    }
    ledger.update_metadata(id, meta)?;
    println!("Updated position #{}", id);
    Ok(())
}

fn position_table(data: &[PositionView]) -> comfy_table::Table {
    let rows = data
        .iter()
        .map(|v| {
            let p = &v.position;
            vec![
                p.id.to_string(),
                p.instrument_name.clone(),
                p.symbol.clone().unwrap_or_default(),
                p.quantity.to_string(),
                format!("{:.4}", p.average_unit_cost),
                format!("{:.2}", p.total_cost_basis),
                format!("{:.2}", v.current_value),
                format!("{:.2}", v.pl_absolute),
                v.pl_percent.to_string(),
                p.currency.clone(),
            ]
        })
        .collect();
    pretty_table(
        &["Id", "Instrument", "Symbol", "Qty", "Avg cost", "Basis", "Value", "P/L", "P/L %", "CCY"],
        rows,
    )
}
