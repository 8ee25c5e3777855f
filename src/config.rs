// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Where the ledger lives and the user-tunable settings stored alongside it.

use anyhow::{Context, Result as AnyResult};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::errors::{LedgerError, Result};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Catoledger", "catoledger"));

pub const DB_ENV: &str = "CATOLEDGER_DB";
pub const LOG_ENV: &str = "CATOLEDGER_LOG";

pub const KEY_DEFAULT_CURRENCY: &str = "default_currency";
pub const KEY_ALLOW_OVERDRAFT: &str = "allow_overdraft";
pub const KEY_CORRECTION_EPSILON: &str = "correction_epsilon";

pub const SETTING_KEYS: &[&str] = &[
    KEY_DEFAULT_CURRENCY,
    KEY_ALLOW_OVERDRAFT,
    KEY_CORRECTION_EPSILON,
];

/// Database file: `$CATOLEDGER_DB` when set, else the platform data dir.
pub fn db_path() -> AnyResult<PathBuf> {
    if let Ok(p) = std::env::var(DB_ENV) {
        let trimmed = p.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("catoledger.sqlite"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub default_currency: String,
    /// When false, transfers may not take the source balance below zero.
    pub allow_overdraft: bool,
    /// Balance corrections smaller than this are skipped.
    pub correction_epsilon: Decimal,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_currency: "EUR".to_string(),
            allow_overdraft: true,
            correction_epsilon: Decimal::new(1, 3),
        }
    }
}

impl Settings {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut settings = Settings::default();
        for key in SETTING_KEYS {
            if let Some(raw) = get_setting(conn, key)? {
                settings.apply(key, &raw)?;
            }
        }
        Ok(settings)
    }

    /// Validate and set one key in memory.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            KEY_DEFAULT_CURRENCY => {
                if value.is_empty() {
                    return Err(LedgerError::validation("default_currency cannot be empty"));
                }
                self.default_currency = value.to_uppercase();
            }
            KEY_ALLOW_OVERDRAFT => {
                self.allow_overdraft = parse_bool(value).ok_or_else(|| {
                    LedgerError::validation(format!(
                        "allow_overdraft expects true/false, got '{}'",
                        value
                    ))
                })?;
            }
            KEY_CORRECTION_EPSILON => {
                let eps = value.parse::<Decimal>().map_err(|_| {
                    LedgerError::validation(format!("Invalid decimal '{}'", value))
                })?;
                if eps.is_sign_negative() {
                    return Err(LedgerError::validation(
                        "correction_epsilon cannot be negative",
                    ));
                }
                self.correction_epsilon = eps;
            }
            other => {
                return Err(LedgerError::validation(format!(
                    "Unknown setting '{}' (expected one of: {})",
                    other,
                    SETTING_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_DEFAULT_CURRENCY, self.default_currency.clone()),
            (KEY_ALLOW_OVERDRAFT, self.allow_overdraft.to_string()),
            (KEY_CORRECTION_EPSILON, self.correction_epsilon.to_string()),
        ]
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn put_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE settings(key TEXT PRIMARY KEY, value TEXT NOT NULL);")
            .unwrap();
        conn
    }

    #[test]
    fn defaults_when_table_is_empty() {
        let s = Settings::load(&conn()).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.default_currency, "EUR");
        assert!(s.allow_overdraft);
        assert_eq!(s.correction_epsilon.to_string(), "0.001");
    }

    #[test]
    fn stored_values_override_defaults() {
        let c = conn();
        put_setting(&c, KEY_DEFAULT_CURRENCY, "usd").unwrap();
        put_setting(&c, KEY_ALLOW_OVERDRAFT, "no").unwrap();
        let s = Settings::load(&c).unwrap();
        assert_eq!(s.default_currency, "USD");
        assert!(!s.allow_overdraft);
    }

    #[test]
    fn apply_rejects_unknown_keys_and_bad_values() {
        let mut s = Settings::default();
        assert!(s.apply("colour", "blue").unwrap_err().is_validation());
        assert!(s.apply(KEY_ALLOW_OVERDRAFT, "maybe").is_err());
        assert!(s.apply(KEY_CORRECTION_EPSILON, "-1").is_err());
        assert!(s.apply(KEY_CORRECTION_EPSILON, "abc").is_err());
        assert_eq!(s, Settings::default());
    }
}
