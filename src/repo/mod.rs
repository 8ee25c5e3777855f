// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Typed access to the three ledger tables. Rows become structs here and
//! nowhere else; every function takes a plain `&Connection`, so the engine can
//! pass a `rusqlite::Transaction` and keep multi-row writes atomic.

pub mod accounts;
pub mod investments;
pub mod transactions;

use rusqlite::Row;
use rusqlite::types::Type;
use rust_decimal::Decimal;

/// Amounts are stored as exact decimal strings.
pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str_exact(raw.trim())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
