// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rust_decimal::Decimal;

use crate::errors::LedgerError;
use crate::ledger::Ledger;

pub const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time, truncated to whole seconds.
pub fn now() -> NaiveDateTime {
    let t = Local::now().naive_local();
    t.with_nanosecond(0).unwrap_or(t)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Accepts `YYYY-MM-DD HH:MM:SS` as-is; a bare `YYYY-MM-DD` gets the current
/// time of day so same-day entries keep their entry order.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FMT) {
        return Ok(ts);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| {
        format!(
            "Invalid timestamp '{}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
            s
        )
    })?;
    Ok(date.and_time(now().time()))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    Ok(parse_amount(s)?)
}

/// Parse user-entered money; commas are accepted as the decimal separator.
pub fn parse_amount(s: &str) -> std::result::Result<Decimal, LedgerError> {
    let cleaned = s.trim().replace(',', ".");
    if cleaned.is_empty() {
        return Err(LedgerError::validation("amount is missing"));
    }
    cleaned
        .parse::<Decimal>()
        .map_err(|_| LedgerError::validation(format!("Invalid decimal '{}'", s.trim())))
}

/// Resolve an account given by name, falling back to a numeric id.
pub fn id_for_account(ledger: &Ledger, key: &str) -> Result<i64> {
    let key = key.trim();
    if let Ok(account) = ledger.get_account_by_name(key) {
        return Ok(account.id);
    }
    if let Ok(id) = key.parse::<i64>() {
        if let Ok(account) = ledger.get_account(id) {
            return Ok(account.id);
        }
    }
    anyhow::bail!("Account '{}' not found", key)
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{:.2} {}", d.round_dp(2), ccy)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
