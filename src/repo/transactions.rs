// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use rust_decimal::Decimal;

use super::decimal_at;
use crate::errors::{self, in_range};
use crate::models::{Transaction, TransactionFilter, TransactionKind, TransactionRow};

const COLUMNS: &str = "t.id, t.account_id, t.timestamp, t.description, t.amount, t.category, \
                       t.tags, t.kind, t.linked_transaction_id";

/// Column values for an insert or a full overwrite.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub account_id: i64,
    pub timestamp: NaiveDateTime,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    pub tags: Option<String>,
    pub kind: TransactionKind,
    pub linked_transaction_id: Option<i64>,
}

fn map_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        account_id: r.get(1)?,
        timestamp: r.get(2)?,
        description: r.get(3)?,
        amount: decimal_at(r, 4)?,
        category: r.get(5)?,
        tags: r.get(6)?,
        kind: r.get(7)?,
        linked_transaction_id: r.get(8)?,
    })
}

fn map_joined(r: &Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        transaction: map_row(r)?,
        account_name: r.get(9)?,
    })
}

pub fn insert(conn: &Connection, rec: &TransactionRecord) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO transactions(account_id, timestamp, description, amount, category, tags, kind, linked_transaction_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            rec.account_id,
            rec.timestamp,
            rec.description,
            rec.amount.to_string(),
            rec.category,
            rec.tags,
            rec.kind,
            rec.linked_transaction_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, rec: &TransactionRecord) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE transactions SET account_id=?1, timestamp=?2, description=?3, amount=?4,
             category=?5, tags=?6, kind=?7, linked_transaction_id=?8
         WHERE id=?9",
        params![
            rec.account_id,
            rec.timestamp,
            rec.description,
            rec.amount.to_string(),
            rec.category,
            rec.tags,
            rec.kind,
            rec.linked_transaction_id,
            id
        ],
    )
}

pub fn set_link(conn: &Connection, id: i64, linked: Option<i64>) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE transactions SET linked_transaction_id=?1 WHERE id=?2",
        params![linked, id],
    )
}

pub fn set_amount(conn: &Connection, id: i64, amount: Decimal) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE transactions SET amount=?1 WHERE id=?2",
        params![amount.to_string(), id],
    )
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM transactions WHERE id=?1", params![id])
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Transaction>> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {} FROM transactions t WHERE t.id=?1", COLUMNS))?;
    stmt.query_row(params![id], map_row).optional()
}

pub fn get_row(conn: &Connection, id: i64) -> rusqlite::Result<Option<TransactionRow>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {}, a.name FROM transactions t JOIN accounts a ON t.account_id=a.id WHERE t.id=?1",
        COLUMNS
    ))?;
    stmt.query_row(params![id], map_joined).optional()
}

/// Rows pointing at `id` through `linked_transaction_id`.
pub fn linked_to(conn: &Connection, id: i64) -> rusqlite::Result<Vec<Transaction>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM transactions t WHERE t.linked_transaction_id=?1 ORDER BY t.id",
        COLUMNS
    ))?;
    let rows = stmt.query_map(params![id], map_row)?;
    rows.collect()
}

pub fn list_by_kinds(
    conn: &Connection,
    kinds: &[TransactionKind],
) -> rusqlite::Result<Vec<Transaction>> {
    let placeholders = (1..=kinds.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM transactions t WHERE t.kind IN ({}) ORDER BY t.id",
        COLUMNS, placeholders
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(kinds.iter()), map_row)?;
    rows.collect()
}

/// Sum of every amount posted against the account.
pub fn sum_for_account(conn: &Connection, account_id: i64) -> errors::Result<Decimal> {
    let mut stmt = conn.prepare_cached("SELECT amount FROM transactions WHERE account_id=?1")?;
    let rows = stmt.query_map(params![account_id], |r| decimal_at(r, 0))?;
    let mut total = Decimal::ZERO;
    for amount in rows {
        total = in_range(total.checked_add(amount?))?;
    }
    Ok(total)
}

/// Newest first (timestamp, then id) so limit/offset pages are stable.
pub fn list(conn: &Connection, filter: &TransactionFilter) -> rusqlite::Result<Vec<TransactionRow>> {
    let mut sql = format!(
        "SELECT {}, a.name FROM transactions t JOIN accounts a ON t.account_id=a.id WHERE 1=1",
        COLUMNS
    );
    let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(aid) = filter.account_id {
        sql.push_str(&format!(" AND t.account_id = ?{}", param_values.len() + 1));
        param_values.push(Box::new(aid));
    }
    if let Some(from) = filter.from {
        sql.push_str(&format!(
            " AND date(t.timestamp) >= date(?{})",
            param_values.len() + 1
        ));
        param_values.push(Box::new(from));
    }
    if let Some(to) = filter.to {
        sql.push_str(&format!(
            " AND date(t.timestamp) <= date(?{})",
            param_values.len() + 1
        ));
        param_values.push(Box::new(to));
    }
    if let Some(cat) = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        sql.push_str(&format!(" AND t.category LIKE ?{}", param_values.len() + 1));
        param_values.push(Box::new(format!("%{}%", cat)));
    }

    sql.push_str(" ORDER BY t.timestamp DESC, t.id DESC");

    match (filter.limit, filter.offset) {
        (Some(l), Some(o)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", l, o)),
        (Some(l), None) => sql.push_str(&format!(" LIMIT {}", l)),
        (None, Some(o)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", o)),
        (None, None) => {}
    }

    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_ref.as_slice(), map_joined)?;
    rows.collect()
}
