// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error types surfaced by the ledger engine.
//!
//! The CLI wraps these in `anyhow`; library callers can match on the kind to
//! tell bad input apart from store constraint failures and broken invariants.

use rusqlite::ErrorCode;
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Bad or missing input, or a business rule the operation refuses.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced account, transaction or position does not exist.
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    /// The store rejected the write (unique name, foreign key, check).
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Stored state disagrees with the ledger invariants.
    #[error("Ledger inconsistency: {0}")]
    Consistency(String),

    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// True for input problems caught before anything was written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_) | LedgerError::NotFound { .. }
        )
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, LedgerError::Integrity(_))
    }

    pub fn is_consistency(&self) -> bool {
        matches!(self, LedgerError::Consistency(_))
    }
}

/// Unwraps a checked `Decimal` operation; overflow is bad input, not a panic.
pub fn in_range(value: Option<Decimal>) -> Result<Decimal> {
    value.ok_or_else(|| LedgerError::validation("amount out of range"))
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
                LedgerError::Integrity(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => LedgerError::Storage(err),
        }
    }
}

impl From<rust_decimal::Error> for LedgerError {
    fn from(err: rust_decimal::Error) -> Self {
        LedgerError::Validation(format!("invalid decimal: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn unique_violation_maps_to_integrity() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t(name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: LedgerError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_integrity());
        assert!(err.to_string().contains("UNIQUE"));
    }

    #[test]
    fn other_sqlite_errors_map_to_storage() {
        let conn = Connection::open_in_memory().unwrap();
        let err: LedgerError = conn
            .execute("INSERT INTO missing VALUES (1)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert!(!err.is_validation());
    }

    #[test]
    fn not_found_counts_as_validation() {
        let err = LedgerError::not_found("Account", 42);
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Account 42 not found");
    }

    #[test]
    fn overflow_is_a_validation_error() {
        assert_eq!(in_range(Decimal::ONE.checked_add(Decimal::ONE)).unwrap(), Decimal::TWO);
        let err = in_range(Decimal::MAX.checked_add(Decimal::ONE)).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Validation failed: amount out of range");
    }
}
