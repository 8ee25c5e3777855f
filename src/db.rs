// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result as AnyResult};
use rusqlite::Connection;
use std::path::Path;

use crate::errors::Result;

pub fn open(path: &Path) -> AnyResult<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Create data dir {}", dir.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn).with_context(|| format!("Initialize schema at {}", path.display()))?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE CHECK(length(trim(name)) > 0),
        balance TEXT NOT NULL DEFAULT '0', -- running total, only the ledger writes it
        type TEXT NOT NULL DEFAULT '',
        currency TEXT NOT NULL DEFAULT 'EUR',
        created_at TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1 CHECK(active IN (0, 1))
    );
    CREATE INDEX IF NOT EXISTS idx_accounts_name ON accounts(name);

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        amount TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '',
        tags TEXT,
        kind TEXT NOT NULL CHECK(kind IN (
            'Entrata', 'Uscita', 'GirocontoOut', 'GirocontoIn', 'SaldoIniziale',
            'Correzione', 'AcquistoInvestimento', 'VenditaInvestimento'
        )),
        linked_transaction_id INTEGER,
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE RESTRICT ON UPDATE CASCADE,
        FOREIGN KEY(linked_transaction_id) REFERENCES transactions(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp DESC);
    CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_linked ON transactions(linked_transaction_id);

    CREATE TABLE IF NOT EXISTS investments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        instrument_name TEXT NOT NULL,
        symbol TEXT,
        asset_type TEXT NOT NULL DEFAULT '',
        quantity TEXT NOT NULL DEFAULT '0',
        avg_unit_cost TEXT NOT NULL DEFAULT '0',
        total_cost_basis TEXT NOT NULL DEFAULT '0',
        current_unit_value TEXT NOT NULL DEFAULT '0',
        current_value_date TEXT,
        holding_account_id INTEGER,
        currency TEXT NOT NULL DEFAULT 'EUR',
        first_purchase_date TEXT NOT NULL,
        last_modified TEXT NOT NULL,
        notes TEXT NOT NULL DEFAULT '',
        active INTEGER NOT NULL DEFAULT 1 CHECK(active IN (0, 1)),
        FOREIGN KEY(holding_account_id) REFERENCES accounts(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_investments_symbol ON investments(symbol);

    -- total value of active positions, one row per day
    CREATE TABLE IF NOT EXISTS portfolio_history(
        date TEXT PRIMARY KEY,
        total_value TEXT NOT NULL
    );
    "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent_and_enforces_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fk, 1);
        let err = conn
            .execute(
                "INSERT INTO transactions(account_id, timestamp, amount, kind)
                 VALUES (99, '2025-01-01 00:00:00', '1', 'Entrata')",
                [],
            )
            .unwrap_err();
        assert!(err.to_string().contains("FOREIGN KEY"));
    }

    #[test]
    fn unknown_kind_is_rejected_by_the_store() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO accounts(name, created_at) VALUES ('A', '2025-01-01 00:00:00')",
            [],
        )
        .unwrap();
        let err = conn
            .execute(
                "INSERT INTO transactions(account_id, timestamp, amount, kind)
                 VALUES (1, '2025-01-01 00:00:00', '1', 'Giroconto')",
                [],
            )
            .unwrap_err();
        assert!(err.to_string().contains("CHECK"));
    }

    #[test]
    fn open_creates_file_and_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.sqlite");
        let conn = open(&path).unwrap();
        drop(conn);
        assert!(path.exists());
    }
}
