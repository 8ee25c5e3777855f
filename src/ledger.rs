// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The ledger engine: accounts, transactions, transfers and corrections.
//!
//! Every stored balance equals the sum of the amounts posted against its
//! account. Each mutation runs inside one `rusqlite::Transaction`; an early
//! return drops the guard and rolls back, so a failed operation writes
//! nothing.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{self, Settings};
use crate::db;
use crate::errors::{LedgerError, Result, in_range};
use crate::models::{
    Account, NewAccount, NewTransaction, Transaction, TransactionFilter, TransactionKind,
    TransactionRow, TransactionUpdate, TransferReceipt,
};
use crate::repo::{accounts, transactions};
use crate::repo::transactions::TransactionRecord;
use crate::utils;

pub const TRANSFER_CATEGORY: &str = "Giroconto";
pub const CORRECTION_CATEGORY: &str = "Correzione Saldo";
pub const OPENING_CATEGORY: &str = "Sistema";
pub const OPENING_DESCRIPTION: &str = "Saldo iniziale";

pub struct Ledger {
    pub(crate) conn: Connection,
    pub(crate) settings: Settings,
}

impl Ledger {
    /// Open (creating if needed) the database file at `path`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = db::open(path)?;
        Ok(Self::from_connection(conn)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Takes ownership of `conn`, ensures the schema exists and loads settings.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        db::init_schema(&conn)?;
        let settings = Settings::load(&conn)?;
        Ok(Self { conn, settings })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate, persist and apply one setting.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.settings.clone();
        updated.apply(key, value)?;
        let stored = updated
            .pairs()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .unwrap_or_else(|| value.trim().to_string());
        config::put_setting(&self.conn, key, &stored)?;
        info!(key, value = %stored, "setting updated");
        self.settings = updated;
        Ok(())
    }

    // ---- accounts ----

    /// Creates the account at zero and posts the opening balance as a
    /// SaldoIniziale transaction in the same store transaction.
    pub fn create_account(&mut self, new: NewAccount) -> Result<i64> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("account name cannot be empty"));
        }
        let currency = new
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.settings.default_currency.as_str())
            .to_uppercase();
        let created_at = utils::now();

        let tx = self.conn.transaction()?;
        let id = match accounts::insert(&tx, name, new.account_type.trim(), &currency, created_at)
        {
            Ok(id) => id,
            Err(e) => {
                let err = LedgerError::from(e);
                warn!(name, error = %err, "account creation rejected");
                return Err(err);
            }
        };
        if !new.initial_balance.is_zero() {
            post(
                &tx,
                &TransactionRecord {
                    account_id: id,
                    timestamp: created_at,
                    description: OPENING_DESCRIPTION.to_string(),
                    amount: new.initial_balance,
                    category: OPENING_CATEGORY.to_string(),
                    tags: None,
                    kind: TransactionKind::InitialBalance,
                    linked_transaction_id: None,
                },
            )?;
        }
        tx.commit()?;
        info!(id, name, initial = %new.initial_balance, "account created");
        Ok(id)
    }

    pub fn rename_account(&mut self, id: i64, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("account name cannot be empty"));
        }
        if accounts::rename(&self.conn, id, name)? == 0 {
            return Err(LedgerError::not_found("Account", id));
        }
        info!(id, name, "account renamed");
        Ok(())
    }

    pub fn deactivate_account(&mut self, id: i64) -> Result<()> {
        self.set_account_active(id, false)
    }

    pub fn reactivate_account(&mut self, id: i64) -> Result<()> {
        self.set_account_active(id, true)
    }

    fn set_account_active(&mut self, id: i64, active: bool) -> Result<()> {
        if accounts::set_active(&self.conn, id, active)? == 0 {
            return Err(LedgerError::not_found("Account", id));
        }
        info!(id, active, "account activity changed");
        Ok(())
    }

    /// Hard delete. The store refuses while any transaction references the
    /// account, which surfaces as an integrity error.
    pub fn delete_account(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        if accounts::get(&tx, id)?.is_none() {
            return Err(LedgerError::not_found("Account", id));
        }
        if let Err(e) = accounts::delete(&tx, id) {
            let err = LedgerError::from(e);
            let count = accounts::transaction_count(&tx, id).unwrap_or_default();
            warn!(id, transactions = count, error = %err, "account delete rejected");
            return Err(err);
        }
        tx.commit()?;
        info!(id, "account deleted");
        Ok(())
    }

    pub fn get_account(&self, id: i64) -> Result<Account> {
        accounts::get(&self.conn, id)?.ok_or_else(|| LedgerError::not_found("Account", id))
    }

    pub fn get_account_by_name(&self, name: &str) -> Result<Account> {
        accounts::get_by_name(&self.conn, name)?
            .ok_or_else(|| LedgerError::not_found("Account", format!("'{}'", name.trim())))
    }

    pub fn list_accounts(&self, active_only: bool) -> Result<Vec<Account>> {
        Ok(accounts::list(&self.conn, active_only)?)
    }

    // ---- transactions ----

    /// Insert a transaction and apply its amount to the account balance.
    /// Transfer legs are only created by [`Ledger::execute_transfer`].
    pub fn register_transaction(&mut self, new: NewTransaction) -> Result<i64> {
        let kind = new
            .kind
            .unwrap_or_else(|| TransactionKind::infer(new.amount));
        if kind.is_transfer() {
            return Err(LedgerError::validation(
                "transfer legs are created by execute_transfer, not register_transaction",
            ));
        }
        let record = TransactionRecord {
            account_id: new.account_id,
            timestamp: new.timestamp.unwrap_or_else(utils::now),
            description: new.description.trim().to_string(),
            amount: new.amount,
            category: new.category.trim().to_string(),
            tags: normalize_tags(new.tags),
            kind,
            linked_transaction_id: None,
        };

        let tx = self.conn.transaction()?;
        let id = post(&tx, &record)?;
        tx.commit()?;
        info!(id, account = record.account_id, amount = %record.amount, %kind, "transaction registered");
        Ok(id)
    }

    /// Move `amount` from `source` to `dest` as two mutually linked legs.
    pub fn execute_transfer(
        &mut self,
        source: i64,
        dest: i64,
        amount: Decimal,
        description: &str,
        timestamp: Option<NaiveDateTime>,
    ) -> Result<TransferReceipt> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "transfer amount must be positive, got {}",
                amount
            )));
        }
        if source == dest {
            return Err(LedgerError::validation(
                "source and destination accounts must differ",
            ));
        }
        let timestamp = timestamp.unwrap_or_else(utils::now);
        let description = description.trim();

        let tx = self.conn.transaction()?;
        let src = accounts::get(&tx, source)?.ok_or_else(|| LedgerError::not_found("Account", source))?;
        let dst = accounts::get(&tx, dest)?.ok_or_else(|| LedgerError::not_found("Account", dest))?;
        if !self.settings.allow_overdraft && src.balance < amount {
            warn!(source, balance = %src.balance, %amount, "transfer would overdraw");
            return Err(LedgerError::validation(format!(
                "insufficient funds in '{}': balance {} is below {}",
                src.name, src.balance, amount
            )));
        }

        let outgoing_id = post(
            &tx,
            &TransactionRecord {
                account_id: source,
                timestamp,
                description: format!("{} (-> {})", description, dst.name),
                amount: -amount,
                category: TRANSFER_CATEGORY.to_string(),
                tags: None,
                kind: TransactionKind::TransferOut,
                linked_transaction_id: None,
            },
        )?;
        let incoming_id = post(
            &tx,
            &TransactionRecord {
                account_id: dest,
                timestamp,
                description: format!("{} (<- {})", description, src.name),
                amount,
                category: TRANSFER_CATEGORY.to_string(),
                tags: None,
                kind: TransactionKind::TransferIn,
                linked_transaction_id: Some(outgoing_id),
            },
        )?;
        transactions::set_link(&tx, outgoing_id, Some(incoming_id))?;
        tx.commit()?;

        info!(source, dest, %amount, outgoing_id, incoming_id, "transfer executed");
        Ok(TransferReceipt {
            outgoing_id,
            incoming_id,
        })
    }

    /// Reverse the stored amount from the old account, overwrite the row,
    /// then apply the new amount to the (possibly different) new account.
    ///
    /// On a transfer leg the direction is fixed, the amount keeps the leg's
    /// sign and the counterpart is rewritten to the opposite amount in the
    /// same store transaction.
    pub fn update_transaction(&mut self, id: i64, upd: TransactionUpdate) -> Result<()> {
        let tx = self.conn.transaction()?;
        let old = transactions::get(&tx, id)?
            .ok_or_else(|| LedgerError::not_found("Transaction", id))?;
        if accounts::get(&tx, upd.account_id)?.is_none() {
            return Err(LedgerError::not_found("Account", upd.account_id));
        }

        let kind = match upd.kind {
            Some(k) => k,
            None => match old.kind {
                TransactionKind::Income | TransactionKind::Expense => {
                    TransactionKind::infer(upd.amount)
                }
                other => other,
            },
        };
        if kind.is_transfer() != old.kind.is_transfer()
            || (old.kind.is_transfer() && kind != old.kind)
        {
            return Err(LedgerError::validation(format!(
                "cannot change kind {} to {}: transfer legs are managed as pairs",
                old.kind, kind
            )));
        }

        let partner = if old.kind.is_transfer() {
            check_leg_sign(kind, upd.amount)?;
            let partner = partner_of(&tx, &old)?;
            if let Some(l) = upd.linked_transaction_id {
                if partner.as_ref().map(|p| p.id) != Some(l) {
                    return Err(LedgerError::validation(format!(
                        "transfer leg {} cannot be relinked to {}",
                        id, l
                    )));
                }
            }
            if let Some(p) = &partner {
                if p.account_id == upd.account_id {
                    return Err(LedgerError::validation(
                        "source and destination accounts must differ",
                    ));
                }
            }
            partner
        } else {
            None
        };
        let linked = match upd.linked_transaction_id {
            Some(l) if l == id => {
                return Err(LedgerError::validation("a transaction cannot link to itself"));
            }
            Some(l) => {
                if transactions::get(&tx, l)?.is_none() {
                    return Err(LedgerError::not_found("Transaction", l));
                }
                Some(l)
            }
            None => old.linked_transaction_id,
        };

        shift_balance(&tx, old.account_id, -old.amount)?;
        transactions::update(
            &tx,
            id,
            &TransactionRecord {
                account_id: upd.account_id,
                timestamp: upd.timestamp,
                description: upd.description.trim().to_string(),
                amount: upd.amount,
                category: upd.category.trim().to_string(),
                tags: normalize_tags(upd.tags),
                kind,
                linked_transaction_id: linked,
            },
        )?;
        shift_balance(&tx, upd.account_id, upd.amount)?;
        if let Some(p) = partner {
            let mirrored = -upd.amount;
            if mirrored != p.amount {
                let delta = in_range(mirrored.checked_sub(p.amount))?;
                transactions::set_amount(&tx, p.id, mirrored)?;
                shift_balance(&tx, p.account_id, delta)?;
                debug!(id = p.id, old_amount = %p.amount, amount = %mirrored, "counterpart leg mirrored");
            }
        }
        tx.commit()?;

        debug!(id, old_account = old.account_id, old_amount = %old.amount, "reversed previous amount");
        info!(id, account = upd.account_id, amount = %upd.amount, %kind, "transaction updated");
        Ok(())
    }

    /// Delete one row and reverse its amount. A transfer leg takes its
    /// counterpart with it. Returns `false` when no such transaction exists.
    pub fn delete_transaction(&mut self, id: i64) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let Some(old) = transactions::get(&tx, id)? else {
            debug!(id, "delete of missing transaction ignored");
            return Ok(false);
        };
        if old.kind.is_transfer() {
            let removed = remove_transfer(&tx, &old)?;
            tx.commit()?;
            info!(id, ?removed, "transfer deleted through one leg");
            return Ok(true);
        }
        remove(&tx, &old)?;
        tx.commit()?;
        info!(id, account = old.account_id, amount = %old.amount, "transaction deleted");
        Ok(true)
    }

    /// Given either leg of a transfer, delete both legs and reverse both
    /// balances. Returns the ids removed.
    pub fn delete_transfer(&mut self, id: i64) -> Result<Vec<i64>> {
        let tx = self.conn.transaction()?;
        let leg = transactions::get(&tx, id)?
            .ok_or_else(|| LedgerError::not_found("Transaction", id))?;
        if !leg.kind.is_transfer() {
            return Err(LedgerError::validation(format!(
                "transaction {} is a {}, not a transfer leg",
                id, leg.kind
            )));
        }
        let removed = remove_transfer(&tx, &leg)?;
        tx.commit()?;
        info!(?removed, "transfer deleted");
        Ok(removed)
    }

    pub fn get_transaction(&self, id: i64) -> Result<TransactionRow> {
        transactions::get_row(&self.conn, id)?
            .ok_or_else(|| LedgerError::not_found("Transaction", id))
    }

    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<TransactionRow>> {
        Ok(transactions::list(&self.conn, filter)?)
    }

    /// Post a Correzione so the balance becomes exactly `desired`. Returns
    /// `None` when the difference is below the configured epsilon.
    pub fn correct_balance(
        &mut self,
        account_id: i64,
        desired: Decimal,
        timestamp: Option<NaiveDateTime>,
    ) -> Result<Option<i64>> {
        let tx = self.conn.transaction()?;
        let account = accounts::get(&tx, account_id)?
            .ok_or_else(|| LedgerError::not_found("Account", account_id))?;
        let delta = in_range(desired.checked_sub(account.balance))?;
        if delta.abs() < self.settings.correction_epsilon {
            debug!(account_id, %delta, "correction below epsilon, nothing to do");
            return Ok(None);
        }
        let id = post(
            &tx,
            &TransactionRecord {
                account_id,
                timestamp: timestamp.unwrap_or_else(utils::now),
                description: format!(
                    "Correzione manuale saldo (da {:.2} a {:.2})",
                    account.balance.round_dp(2),
                    desired.round_dp(2)
                ),
                amount: delta,
                category: CORRECTION_CATEGORY.to_string(),
                tags: None,
                kind: TransactionKind::Correction,
                linked_transaction_id: None,
            },
        )?;
        tx.commit()?;
        info!(account_id, old = %account.balance, new = %desired, id, "balance corrected");
        Ok(Some(id))
    }
}

/// Insert `rec` and apply its amount to the owning account.
pub(crate) fn post(conn: &Connection, rec: &TransactionRecord) -> Result<i64> {
    if accounts::balance(conn, rec.account_id)?.is_none() {
        return Err(LedgerError::not_found("Account", rec.account_id));
    }
    let id = transactions::insert(conn, rec)?;
    let balance = shift_balance(conn, rec.account_id, rec.amount)?;
    debug!(id, account = rec.account_id, amount = %rec.amount, %balance, "posted");
    Ok(id)
}

fn remove(conn: &Connection, t: &Transaction) -> Result<()> {
    transactions::delete(conn, t.id)?;
    shift_balance(conn, t.account_id, -t.amount)?;
    Ok(())
}

/// Remove a transfer leg together with its counterpart, if it still has one.
fn remove_transfer(conn: &Connection, leg: &Transaction) -> Result<Vec<i64>> {
    let partner = partner_of(conn, leg)?;
    let mut removed = vec![leg.id];
    remove(conn, leg)?;
    match partner {
        Some(p) => {
            remove(conn, &p)?;
            removed.push(p.id);
        }
        None => warn!(id = leg.id, "transfer leg had no counterpart"),
    }
    Ok(removed)
}

/// The other leg of a transfer: the row this leg links to, or for a
/// one-sided link the transfer row pointing back at it.
fn partner_of(conn: &Connection, leg: &Transaction) -> Result<Option<Transaction>> {
    let found = match leg.linked_transaction_id {
        Some(pid) => transactions::get(conn, pid)?,
        None => transactions::linked_to(conn, leg.id)?
            .into_iter()
            .find(|t| t.kind.is_transfer()),
    };
    Ok(found.filter(|t| t.kind.is_transfer()))
}

fn check_leg_sign(kind: TransactionKind, amount: Decimal) -> Result<()> {
    let ok = match kind {
        TransactionKind::TransferOut => amount < Decimal::ZERO,
        _ => amount > Decimal::ZERO,
    };
    if ok {
        Ok(())
    } else {
        Err(LedgerError::validation(format!(
            "{} amount must be {}, got {}",
            kind,
            if kind == TransactionKind::TransferOut { "negative" } else { "positive" },
            amount
        )))
    }
}

fn shift_balance(conn: &Connection, account_id: i64, delta: Decimal) -> Result<Decimal> {
    accounts::apply_delta(conn, account_id, delta)?
        .ok_or_else(|| LedgerError::not_found("Account", account_id))
}

fn normalize_tags(tags: Option<String>) -> Option<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    })
    .filter(|t| !t.is_empty())
}
