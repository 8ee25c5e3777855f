// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Investment positions at weighted-average cost.
//!
//! A buy folds its full cost (price plus fees) into the cost basis and
//! recomputes the average; a sell is costed at the existing average and never
//! changes it. Cash legs, the position row and the daily portfolio value are
//! written in one store transaction.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::errors::{LedgerError, Result, in_range};
use crate::ledger::{Ledger, post};
use crate::models::{
    NewPosition, PlPercent, PortfolioSnapshot, Position, PositionMetadata, PositionView,
    SaleOutcome, Trade, TransactionKind,
};
use crate::repo::transactions::TransactionRecord;
use crate::repo::{accounts, investments};
use crate::utils;

pub const INVESTMENT_CATEGORY: &str = "Investimenti";

/// Quantities at or below this are treated as a fully closed holding.
pub fn quantity_epsilon() -> Decimal {
    Decimal::new(1, 8)
}

fn validate_trade(trade: &Trade) -> Result<()> {
    if trade.quantity <= Decimal::ZERO {
        return Err(LedgerError::validation("quantity must be positive"));
    }
    if trade.unit_price < Decimal::ZERO {
        return Err(LedgerError::validation("unit price cannot be negative"));
    }
    if trade.fees < Decimal::ZERO {
        return Err(LedgerError::validation("fees cannot be negative"));
    }
    Ok(())
}

/// Fold a purchase into `p`. Returns the gross cost (quantity × price + fees).
/// Nothing in `p` changes when the figures overflow.
pub fn apply_buy(p: &mut Position, trade: &Trade, at: NaiveDateTime) -> Result<Decimal> {
    let cost = in_range(
        trade
            .quantity
            .checked_mul(trade.unit_price)
            .and_then(|gross| gross.checked_add(trade.fees)),
    )?;
    let (held, basis) = if p.active {
        (p.quantity, p.total_cost_basis)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    let quantity = in_range(held.checked_add(trade.quantity))?;
    let basis = in_range(basis.checked_add(cost))?;
    let average = in_range(basis.checked_div(quantity))?;

    p.quantity = quantity;
    p.total_cost_basis = basis;
    p.average_unit_cost = average;
    p.current_unit_value = trade.unit_price;
    p.current_value_date = Some(at.date());
    p.last_modified = at;
    p.active = true;
    Ok(cost)
}

/// Take a sale out of `p` at its current average cost.
pub fn apply_sell(p: &mut Position, trade: &Trade, at: NaiveDateTime) -> Result<SaleOutcome> {
    if !p.active {
        return Err(LedgerError::validation(format!(
            "position {} is closed",
            p.id
        )));
    }
    if trade.quantity > p.quantity.saturating_add(quantity_epsilon()) {
        return Err(LedgerError::validation(format!(
            "cannot sell {} units, only {} held",
            trade.quantity, p.quantity
        )));
    }

    let average = p.average_unit_cost;
    let cost_of_shares_sold = in_range(trade.quantity.checked_mul(average))?;
    let gross = in_range(trade.quantity.checked_mul(trade.unit_price))?;
    if trade.fees > gross {
        return Err(LedgerError::validation(format!(
            "fees {} exceed the sale proceeds {}",
            trade.fees, gross
        )));
    }
    let net_proceeds = gross - trade.fees;
    let realized_pl = in_range(net_proceeds.checked_sub(cost_of_shares_sold))?;
    let remaining = p.quantity - trade.quantity;

    if remaining <= quantity_epsilon() {
        p.quantity = Decimal::ZERO;
        p.total_cost_basis = Decimal::ZERO;
        p.average_unit_cost = Decimal::ZERO;
        p.active = false;
    } else {
        p.total_cost_basis = in_range(p.total_cost_basis.checked_sub(cost_of_shares_sold))?;
        p.quantity = remaining;
    }
    p.current_unit_value = trade.unit_price;
    p.current_value_date = Some(at.date());
    p.last_modified = at;

    Ok(SaleOutcome {
        realized_pl,
        remaining_quantity: p.quantity,
        average_unit_cost: average,
        net_proceeds,
        cost_of_shares_sold,
    })
}

pub fn view(position: Position) -> Result<PositionView> {
    let current_value = in_range(position.quantity.checked_mul(position.current_unit_value))?;
    let pl_absolute = in_range(current_value.checked_sub(position.total_cost_basis))?;
    let pl_percent = if !position.total_cost_basis.is_zero() {
        PlPercent::Finite(in_range(
            pl_absolute
                .checked_div(position.total_cost_basis)
                .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED)),
        )?)
    } else if current_value > Decimal::ZERO {
        PlPercent::Infinite
    } else {
        PlPercent::Finite(Decimal::ZERO)
    };
    Ok(PositionView {
        position,
        current_value,
        pl_absolute,
        pl_percent,
    })
}

fn clean_symbol(symbol: Option<String>) -> Option<String> {
    symbol
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

fn ensure_account(conn: &Connection, id: Option<i64>) -> Result<()> {
    if let Some(id) = id {
        if accounts::get(conn, id)?.is_none() {
            return Err(LedgerError::not_found("Account", id));
        }
    }
    Ok(())
}

fn load(conn: &Connection, id: i64) -> Result<Position> {
    investments::get(conn, id)?.ok_or_else(|| LedgerError::not_found("Position", id))
}

fn snapshot(conn: &Connection) -> Result<Decimal> {
    let total = investments::active_total_value(conn)?;
    investments::upsert_history(conn, utils::today(), total)?;
    debug!(%total, "portfolio value recorded");
    Ok(total)
}

fn cash_leg(
    conn: &Connection,
    account_id: i64,
    amount: Decimal,
    kind: TransactionKind,
    p: &Position,
    at: NaiveDateTime,
) -> Result<i64> {
    let verb = match kind {
        TransactionKind::InvestmentBuy => "Acquisto",
        _ => "Vendita",
    };
    post(
        conn,
        &TransactionRecord {
            account_id,
            timestamp: at,
            description: format!("{} {} (posizione #{})", verb, p.instrument_name, p.id),
            amount,
            category: INVESTMENT_CATEGORY.to_string(),
            tags: None,
            kind,
            linked_transaction_id: None,
        },
    )
}

fn buy_into(conn: &Connection, p: &mut Position, trade: &Trade, at: NaiveDateTime) -> Result<()> {
    let cost = apply_buy(p, trade, at)?;
    investments::save_holding(conn, p)?;
    if let Some(account_id) = trade.cash_account_id {
        if cost > Decimal::ZERO {
            cash_leg(conn, account_id, -cost, TransactionKind::InvestmentBuy, p, at)?;
        }
    }
    snapshot(conn)?;
    Ok(())
}

impl Ledger {
    /// First purchase of a new instrument.
    pub fn create_position(&mut self, new: NewPosition, trade: Trade) -> Result<i64> {
        validate_trade(&trade)?;
        let name = new.instrument_name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("instrument name cannot be empty"));
        }
        let at = trade.timestamp.unwrap_or_else(utils::now);
        let currency = new
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.settings.default_currency.as_str())
            .to_uppercase();

        let tx = self.conn.transaction()?;
        ensure_account(&tx, new.holding_account_id)?;
        let mut p = Position {
            id: 0,
            instrument_name: name.to_string(),
            symbol: clean_symbol(new.symbol),
            asset_type: new.asset_type.trim().to_string(),
            quantity: Decimal::ZERO,
            average_unit_cost: Decimal::ZERO,
            total_cost_basis: Decimal::ZERO,
            current_unit_value: Decimal::ZERO,
            current_value_date: None,
            holding_account_id: new.holding_account_id,
            currency,
            first_purchase_date: at.date(),
            last_modified: at,
            notes: new.notes.trim().to_string(),
            active: true,
        };
        p.id = investments::insert(&tx, &p)?;
        buy_into(&tx, &mut p, &trade, at)?;
        tx.commit()?;

        info!(id = p.id, name = %p.instrument_name, qty = %p.quantity, avg = %p.average_unit_cost, "position opened");
        Ok(p.id)
    }

    /// Additional purchase; reactivates a closed position.
    pub fn buy_more(&mut self, id: i64, trade: Trade) -> Result<Position> {
        validate_trade(&trade)?;
        let at = trade.timestamp.unwrap_or_else(utils::now);

        let tx = self.conn.transaction()?;
        let mut p = load(&tx, id)?;
        buy_into(&tx, &mut p, &trade, at)?;
        tx.commit()?;

        info!(id, qty = %p.quantity, avg = %p.average_unit_cost, "position increased");
        Ok(p)
    }

    /// Buy into the active position whose symbol or name matches `key`,
    /// opening one from `new` when none does.
    pub fn open_or_buy(&mut self, key: &str, new: NewPosition, trade: Trade) -> Result<i64> {
        match investments::find_active_by_key(&self.conn, key)? {
            Some(existing) => self.buy_more(existing.id, trade).map(|p| p.id),
            None => self.create_position(new, trade),
        }
    }

    pub fn sell(&mut self, id: i64, trade: Trade) -> Result<SaleOutcome> {
        validate_trade(&trade)?;
        let at = trade.timestamp.unwrap_or_else(utils::now);

        let tx = self.conn.transaction()?;
        let mut p = load(&tx, id)?;
        let outcome = apply_sell(&mut p, &trade, at)?;
        investments::save_holding(&tx, &p)?;
        if let Some(account_id) = trade.cash_account_id {
            if !outcome.net_proceeds.is_zero() {
                cash_leg(
                    &tx,
                    account_id,
                    outcome.net_proceeds,
                    TransactionKind::InvestmentSell,
                    &p,
                    at,
                )?;
            }
        }
        snapshot(&tx)?;
        tx.commit()?;

        info!(
            id,
            sold = %trade.quantity,
            realized = %outcome.realized_pl,
            remaining = %outcome.remaining_quantity,
            "position sold"
        );
        Ok(outcome)
    }

    /// Update the unit market value only; quantity, cost and cash are untouched.
    pub fn mark_to_market(
        &mut self,
        id: i64,
        unit_value: Decimal,
        as_of: Option<NaiveDate>,
    ) -> Result<()> {
        if unit_value < Decimal::ZERO {
            return Err(LedgerError::validation("market value cannot be negative"));
        }
        let as_of = as_of.unwrap_or_else(utils::today);

        let tx = self.conn.transaction()?;
        if investments::set_market_value(&tx, id, unit_value, as_of, utils::now())? == 0 {
            return Err(LedgerError::not_found("Position", id));
        }
        snapshot(&tx)?;
        tx.commit()?;
        info!(id, %unit_value, %as_of, "position marked to market");
        Ok(())
    }

    pub fn update_metadata(&mut self, id: i64, meta: PositionMetadata) -> Result<()> {
        let name = meta.instrument_name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("instrument name cannot be empty"));
        }
        let currency = meta.currency.trim().to_uppercase();
        if currency.is_empty() {
            return Err(LedgerError::validation("currency cannot be empty"));
        }
        let cleaned = PositionMetadata {
            instrument_name: name.to_string(),
            symbol: clean_symbol(meta.symbol),
            asset_type: meta.asset_type.trim().to_string(),
            currency,
            holding_account_id: meta.holding_account_id,
            notes: meta.notes.trim().to_string(),
        };

        let tx = self.conn.transaction()?;
        load(&tx, id)?;
        ensure_account(&tx, cleaned.holding_account_id)?;
        investments::update_metadata(&tx, id, &cleaned, utils::now())?;
        tx.commit()?;
        info!(id, name = %cleaned.instrument_name, "position metadata updated");
        Ok(())
    }

    /// Write off the remaining holding with no cash movement. Returns the
    /// cost basis written off.
    pub fn close_position(&mut self, id: i64) -> Result<Decimal> {
        let tx = self.conn.transaction()?;
        let mut p = load(&tx, id)?;
        let written_off = p.total_cost_basis;
        p.quantity = Decimal::ZERO;
        p.total_cost_basis = Decimal::ZERO;
        p.average_unit_cost = Decimal::ZERO;
        p.active = false;
        p.last_modified = utils::now();
        investments::save_holding(&tx, &p)?;
        snapshot(&tx)?;
        tx.commit()?;
        info!(id, %written_off, "position closed");
        Ok(written_off)
    }

    pub fn list_positions(&self, active_only: bool) -> Result<Vec<PositionView>> {
        investments::list(&self.conn, active_only)?
            .into_iter()
            .map(view)
            .collect()
    }

    pub fn get_position(&self, id: i64) -> Result<PositionView> {
        load(&self.conn, id).and_then(view)
    }

    pub fn portfolio_history(&self) -> Result<Vec<PortfolioSnapshot>> {
        Ok(investments::history(&self.conn)?)
    }
}
