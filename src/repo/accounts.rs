// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

use super::decimal_at;
use crate::errors::{self, in_range};
use crate::models::Account;

const COLUMNS: &str = "id, name, balance, type, currency, created_at, active";

fn map_row(r: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: r.get(0)?,
        name: r.get(1)?,
        balance: decimal_at(r, 2)?,
        account_type: r.get(3)?,
        currency: r.get(4)?,
        created_at: r.get(5)?,
        active: r.get(6)?,
    })
}

/// New accounts always start at zero; opening balances are posted as
/// transactions by the ledger.
pub fn insert(
    conn: &Connection,
    name: &str,
    account_type: &str,
    currency: &str,
    created_at: NaiveDateTime,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO accounts(name, balance, type, currency, created_at, active)
         VALUES (?1, '0', ?2, ?3, ?4, 1)",
        params![name, account_type, currency, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Account>> {
    let mut stmt = conn.prepare_cached(&format!("SELECT {} FROM accounts WHERE id=?1", COLUMNS))?;
    stmt.query_row(params![id], map_row).optional()
}

pub fn get_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Account>> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {} FROM accounts WHERE name=?1", COLUMNS))?;
    stmt.query_row(params![name.trim()], map_row).optional()
}

pub fn list(conn: &Connection, active_only: bool) -> rusqlite::Result<Vec<Account>> {
    let sql = if active_only {
        format!("SELECT {} FROM accounts WHERE active=1 ORDER BY name", COLUMNS)
    } else {
        format!("SELECT {} FROM accounts ORDER BY name", COLUMNS)
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_row)?;
    rows.collect()
}

pub fn rename(conn: &Connection, id: i64, name: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE accounts SET name=?1 WHERE id=?2",
        params![name, id],
    )
}

pub fn set_active(conn: &Connection, id: i64, active: bool) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE accounts SET active=?1 WHERE id=?2",
        params![active, id],
    )
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM accounts WHERE id=?1", params![id])
}

pub fn balance(conn: &Connection, id: i64) -> rusqlite::Result<Option<Decimal>> {
    let mut stmt = conn.prepare_cached("SELECT balance FROM accounts WHERE id=?1")?;
    stmt.query_row(params![id], |r| decimal_at(r, 0)).optional()
}

pub fn set_balance(conn: &Connection, id: i64, balance: Decimal) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE accounts SET balance=?1 WHERE id=?2",
        params![balance.to_string(), id],
    )
}

/// Add `delta` to the stored balance. Returns the new balance, or `None` when
/// the account does not exist. Overflow is refused before the write.
pub fn apply_delta(
    conn: &Connection,
    id: i64,
    delta: Decimal,
) -> errors::Result<Option<Decimal>> {
    let Some(current) = balance(conn, id)? else {
        return Ok(None);
    };
    let updated = in_range(current.checked_add(delta))?;
    set_balance(conn, id, updated)?;
    Ok(Some(updated))
}

pub fn transaction_count(conn: &Connection, id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE account_id=?1",
        params![id],
        |r| r.get(0),
    )
}
