// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub balance: Decimal,
    pub account_type: String,
    pub currency: String,
    pub created_at: NaiveDateTime,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub name: String,
    pub initial_balance: Decimal,
    pub account_type: String,
    /// Falls back to the configured default currency.
    pub currency: Option<String>,
}

/// What a transaction row represents. The stored tag is the Italian name the
/// ledger has always used, so existing databases keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Income,
    Expense,
    TransferOut,
    TransferIn,
    InitialBalance,
    Correction,
    InvestmentBuy,
    InvestmentSell,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "Entrata",
            Self::Expense => "Uscita",
            Self::TransferOut => "GirocontoOut",
            Self::TransferIn => "GirocontoIn",
            Self::InitialBalance => "SaldoIniziale",
            Self::Correction => "Correzione",
            Self::InvestmentBuy => "AcquistoInvestimento",
            Self::InvestmentSell => "VenditaInvestimento",
        }
    }

    /// Parses user input such as a `--kind` flag, case-insensitively. Besides
    /// the stored tags it takes English names and the older `Giroconto_Out` /
    /// `Giroconto_In` spellings. Those are input aliases only: every kind is
    /// written back through [`TransactionKind::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "entrata" | "income" => Some(Self::Income),
            "uscita" | "expense" => Some(Self::Expense),
            "girocontoout" | "giroconto_out" | "transfer-out" | "transferout" => {
                Some(Self::TransferOut)
            }
            "girocontoin" | "giroconto_in" | "transfer-in" | "transferin" => Some(Self::TransferIn),
            "saldoiniziale" | "initial-balance" | "initialbalance" => Some(Self::InitialBalance),
            "correzione" | "correction" => Some(Self::Correction),
            "acquistoinvestimento" | "investment-buy" | "investmentbuy" => {
                Some(Self::InvestmentBuy)
            }
            "venditainvestimento" | "investment-sell" | "investmentsell" => {
                Some(Self::InvestmentSell)
            }
            _ => None,
        }
    }

    pub fn all() -> &'static [TransactionKind] {
        &[
            Self::Income,
            Self::Expense,
            Self::TransferOut,
            Self::TransferIn,
            Self::InitialBalance,
            Self::Correction,
            Self::InvestmentBuy,
            Self::InvestmentSell,
        ]
    }

    /// Generic kind for a plain income/expense row with this amount.
    pub fn infer(amount: Decimal) -> Self {
        if amount < Decimal::ZERO {
            Self::Expense
        } else {
            Self::Income
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::TransferOut | Self::TransferIn)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        TransactionKind::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown transaction kind '{}'", s).into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub timestamp: NaiveDateTime,
    pub description: String,
    /// Signed: positive is money in, negative is money out.
    pub amount: Decimal,
    pub category: String,
    pub tags: Option<String>,
    pub kind: TransactionKind,
    pub linked_transaction_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub account_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewTransaction {
    pub account_id: i64,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub timestamp: Option<NaiveDateTime>,
    /// Defaults to Expense/Income by the sign of `amount`.
    pub kind: Option<TransactionKind>,
    pub tags: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub account_id: i64,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub timestamp: NaiveDateTime,
    pub tags: Option<String>,
    /// `None` keeps the stored kind, re-deriving Income/Expense from the new sign.
    pub kind: Option<TransactionKind>,
    /// `None` keeps the stored link.
    pub linked_transaction_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account_id: Option<i64>,
    /// Inclusive, compared on the date part of the timestamp.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Substring match on the category.
    pub category: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub outgoing_id: i64,
    pub incoming_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: i64,
    pub instrument_name: String,
    pub symbol: Option<String>,
    pub asset_type: String,
    pub quantity: Decimal,
    pub average_unit_cost: Decimal,
    pub total_cost_basis: Decimal,
    pub current_unit_value: Decimal,
    pub current_value_date: Option<NaiveDate>,
    pub holding_account_id: Option<i64>,
    pub currency: String,
    pub first_purchase_date: NaiveDate,
    pub last_modified: NaiveDateTime,
    pub notes: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewPosition {
    pub instrument_name: String,
    pub symbol: Option<String>,
    pub asset_type: String,
    pub currency: Option<String>,
    pub holding_account_id: Option<i64>,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct PositionMetadata {
    pub instrument_name: String,
    pub symbol: Option<String>,
    pub asset_type: String,
    pub currency: String,
    pub holding_account_id: Option<i64>,
    pub notes: String,
}

impl From<&Position> for PositionMetadata {
    fn from(p: &Position) -> Self {
        Self {
            instrument_name: p.instrument_name.clone(),
            symbol: p.symbol.clone(),
            asset_type: p.asset_type.clone(),
            currency: p.currency.clone(),
            holding_account_id: p.holding_account_id,
            notes: p.notes.clone(),
        }
    }
}

/// One buy or sell. `cash_account_id` names the account paying for a buy or
/// receiving the proceeds of a sell; without it no cash leg is recorded.
#[derive(Debug, Clone, Default)]
pub struct Trade {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub fees: Decimal,
    pub timestamp: Option<NaiveDateTime>,
    pub cash_account_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleOutcome {
    pub realized_pl: Decimal,
    pub remaining_quantity: Decimal,
    pub average_unit_cost: Decimal,
    pub net_proceeds: Decimal,
    pub cost_of_shares_sold: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlPercent {
    Finite(Decimal),
    /// Value on a holding that cost nothing.
    Infinite,
}

impl fmt::Display for PlPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlPercent::Finite(p) => write!(f, "{:+.2}%", p.round_dp(2)),
            PlPercent::Infinite => write!(f, "inf"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    #[serde(flatten)]
    pub position: Position,
    pub current_value: Decimal,
    pub pl_absolute: Decimal,
    pub pl_percent: PlPercent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub total_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kind_tags_round_trip_through_parse() {
        for kind in TransactionKind::all() {
            assert_eq!(TransactionKind::parse(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn underscore_transfer_aliases_store_as_canonical_tags() {
        let out = TransactionKind::parse("Giroconto_Out").unwrap();
        assert_eq!(out, TransactionKind::TransferOut);
        assert_eq!(out.as_str(), "GirocontoOut");
        let inc = TransactionKind::parse("Giroconto_In").unwrap();
        assert_eq!(inc, TransactionKind::TransferIn);
        assert_eq!(inc.as_str(), "GirocontoIn");
        assert_eq!(TransactionKind::parse("Giroconto"), None);
    }

    #[test]
    fn infer_uses_sign_only() {
        assert_eq!(TransactionKind::infer(dec!(-0.01)), TransactionKind::Expense);
        assert_eq!(TransactionKind::infer(Decimal::ZERO), TransactionKind::Income);
        assert_eq!(TransactionKind::infer(dec!(12)), TransactionKind::Income);
    }

    #[test]
    fn pl_percent_display() {
        assert_eq!(PlPercent::Finite(dec!(12.346)).to_string(), "+12.35%");
        assert_eq!(PlPercent::Finite(dec!(-3)).to_string(), "-3.00%");
        assert_eq!(PlPercent::Infinite.to_string(), "inf");
    }
}
