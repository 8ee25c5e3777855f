// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

use super::decimal_at;
use crate::errors::{self, in_range};
use crate::models::{PortfolioSnapshot, Position, PositionMetadata};

const COLUMNS: &str = "id, instrument_name, symbol, asset_type, quantity, avg_unit_cost, \
                       total_cost_basis, current_unit_value, current_value_date, \
                       holding_account_id, currency, first_purchase_date, last_modified, notes, active";

fn map_row(r: &Row<'_>) -> rusqlite::Result<Position> {
    Ok(Position {
        id: r.get(0)?,
        instrument_name: r.get(1)?,
        symbol: r.get(2)?,
        asset_type: r.get(3)?,
        quantity: decimal_at(r, 4)?,
        average_unit_cost: decimal_at(r, 5)?,
        total_cost_basis: decimal_at(r, 6)?,
        current_unit_value: decimal_at(r, 7)?,
        current_value_date: r.get(8)?,
        holding_account_id: r.get(9)?,
        currency: r.get(10)?,
        first_purchase_date: r.get(11)?,
        last_modified: r.get(12)?,
        notes: r.get(13)?,
        active: r.get(14)?,
    })
}

/// Inserts every field of `p` except `id`.
pub fn insert(conn: &Connection, p: &Position) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO investments(instrument_name, symbol, asset_type, quantity, avg_unit_cost,
             total_cost_basis, current_unit_value, current_value_date, holding_account_id,
             currency, first_purchase_date, last_modified, notes, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            p.instrument_name,
            p.symbol,
            p.asset_type,
            p.quantity.to_string(),
            p.average_unit_cost.to_string(),
            p.total_cost_basis.to_string(),
            p.current_unit_value.to_string(),
            p.current_value_date,
            p.holding_account_id,
            p.currency,
            p.first_purchase_date,
            p.last_modified,
            p.notes,
            p.active
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Position>> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {} FROM investments WHERE id=?1", COLUMNS))?;
    stmt.query_row(params![id], map_row).optional()
}

/// Active position matching `key` on symbol first, then on instrument name.
pub fn find_active_by_key(conn: &Connection, key: &str) -> rusqlite::Result<Option<Position>> {
    let key = key.trim();
    let mut by_symbol = conn.prepare_cached(&format!(
        "SELECT {} FROM investments
         WHERE active=1 AND symbol IS NOT NULL AND symbol = ?1 COLLATE NOCASE
         ORDER BY id LIMIT 1",
        COLUMNS
    ))?;
    if let Some(p) = by_symbol.query_row(params![key], map_row).optional()? {
        return Ok(Some(p));
    }
    let mut by_name = conn.prepare_cached(&format!(
        "SELECT {} FROM investments
         WHERE active=1 AND instrument_name = ?1 COLLATE NOCASE
         ORDER BY id LIMIT 1",
        COLUMNS
    ))?;
    by_name.query_row(params![key], map_row).optional()
}

pub fn list(conn: &Connection, active_only: bool) -> rusqlite::Result<Vec<Position>> {
    let sql = if active_only {
        format!(
            "SELECT {} FROM investments WHERE active=1 ORDER BY instrument_name COLLATE NOCASE, id",
            COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM investments ORDER BY active DESC, instrument_name COLLATE NOCASE, id",
            COLUMNS
        )
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_row)?;
    rows.collect()
}

/// Writes the holding fields (quantity, cost, market value, activity).
pub fn save_holding(conn: &Connection, p: &Position) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE investments SET quantity=?1, avg_unit_cost=?2, total_cost_basis=?3,
             current_unit_value=?4, current_value_date=?5, last_modified=?6, active=?7
         WHERE id=?8",
        params![
            p.quantity.to_string(),
            p.average_unit_cost.to_string(),
            p.total_cost_basis.to_string(),
            p.current_unit_value.to_string(),
            p.current_value_date,
            p.last_modified,
            p.active,
            p.id
        ],
    )
}

pub fn set_market_value(
    conn: &Connection,
    id: i64,
    unit_value: Decimal,
    as_of: NaiveDate,
    modified: NaiveDateTime,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE investments SET current_unit_value=?1, current_value_date=?2, last_modified=?3
         WHERE id=?4",
        params![unit_value.to_string(), as_of, modified, id],
    )
}

pub fn update_metadata(
    conn: &Connection,
    id: i64,
    meta: &PositionMetadata,
    modified: NaiveDateTime,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE investments SET instrument_name=?1, symbol=?2, asset_type=?3, currency=?4,
             holding_account_id=?5, notes=?6, last_modified=?7
         WHERE id=?8",
        params![
            meta.instrument_name,
            meta.symbol,
            meta.asset_type,
            meta.currency,
            meta.holding_account_id,
            meta.notes,
            modified,
            id
        ],
    )
}

/// Σ quantity × current unit value over active positions.
pub fn active_total_value(conn: &Connection) -> errors::Result<Decimal> {
    list(conn, true)?.iter().try_fold(Decimal::ZERO, |total, p| {
        in_range(
            p.quantity
                .checked_mul(p.current_unit_value)
                .and_then(|value| total.checked_add(value)),
        )
    })
}

pub fn upsert_history(conn: &Connection, date: NaiveDate, total: Decimal) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO portfolio_history(date, total_value) VALUES (?1, ?2)
         ON CONFLICT(date) DO UPDATE SET total_value=excluded.total_value",
        params![date, total.to_string()],
    )?;
    Ok(())
}

pub fn history(conn: &Connection) -> rusqlite::Result<Vec<PortfolioSnapshot>> {
    let mut stmt =
        conn.prepare_cached("SELECT date, total_value FROM portfolio_history ORDER BY date")?;
    let rows = stmt.query_map([], |r| {
        Ok(PortfolioSnapshot {
            date: r.get(0)?,
            total_value: decimal_at(r, 1)?,
        })
    })?;
    rows.collect()
}
