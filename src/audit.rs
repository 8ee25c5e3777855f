// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Consistency checks over stored state.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{info, warn};

use crate::errors::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::models::{Transaction, TransactionKind};
use crate::portfolio::quantity_epsilon;
use crate::repo::{accounts, investments, transactions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum AuditIssue {
    BalanceDrift {
        account_id: i64,
        account: String,
        stored: Decimal,
        computed: Decimal,
    },
    TransferLeg {
        transaction_id: i64,
        detail: String,
    },
    PositionState {
        position_id: i64,
        detail: String,
    },
}

impl fmt::Display for AuditIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditIssue::BalanceDrift {
                account,
                stored,
                computed,
                ..
            } => write!(
                f,
                "account '{}' stores {} but its transactions sum to {}",
                account, stored, computed
            ),
            AuditIssue::TransferLeg {
                transaction_id,
                detail,
            } => write!(f, "transfer leg {}: {}", transaction_id, detail),
            AuditIssue::PositionState {
                position_id,
                detail,
            } => write!(f, "position {}: {}", position_id, detail),
        }
    }
}

fn transfer_issues(legs: Vec<Transaction>) -> Vec<AuditIssue> {
    let by_id: HashMap<i64, &Transaction> = legs.iter().map(|t| (t.id, t)).collect();
    let mut referenced: HashSet<i64> = HashSet::new();
    for t in &legs {
        if let Some(pid) = t.linked_transaction_id {
            referenced.insert(pid);
        }
    }

    let mut issues = Vec::new();
    let mut seen_pairs = HashSet::new();
    for leg in &legs {
        let Some(pid) = leg.linked_transaction_id else {
            if !referenced.contains(&leg.id) {
                issues.push(AuditIssue::TransferLeg {
                    transaction_id: leg.id,
                    detail: "no counterpart leg".into(),
                });
            }
            continue;
        };
        let Some(partner) = by_id.get(&pid) else {
            issues.push(AuditIssue::TransferLeg {
                transaction_id: leg.id,
                detail: format!("linked row {} is not a transfer leg", pid),
            });
            continue;
        };
        if !seen_pairs.insert((leg.id.min(pid), leg.id.max(pid))) {
            continue;
        }
        if partner.kind == leg.kind {
            issues.push(AuditIssue::TransferLeg {
                transaction_id: leg.id,
                detail: format!("linked leg {} has the same direction ({})", pid, leg.kind),
            });
        }
        if leg.amount.checked_add(partner.amount) != Some(Decimal::ZERO) {
            issues.push(AuditIssue::TransferLeg {
                transaction_id: leg.id,
                detail: format!(
                    "amounts {} and {} do not cancel out",
                    leg.amount, partner.amount
                ),
            });
        }
    }
    issues
}

impl Ledger {
    /// Ok with the stored balance when it equals the sum of the account's
    /// transactions, a consistency error otherwise.
    pub fn verify_account(&self, account_id: i64) -> Result<Decimal> {
        let account = self.get_account(account_id)?;
        let computed = transactions::sum_for_account(&self.conn, account_id)?;
        if computed != account.balance {
            warn!(account_id, stored = %account.balance, %computed, "balance drift");
            return Err(LedgerError::Consistency(format!(
                "account '{}' stores {} but its transactions sum to {}",
                account.name, account.balance, computed
            )));
        }
        Ok(account.balance)
    }

    pub fn audit(&self) -> Result<Vec<AuditIssue>> {
        let mut issues = Vec::new();

        for account in accounts::list(&self.conn, false)? {
            let computed = transactions::sum_for_account(&self.conn, account.id)?;
            if computed != account.balance {
                issues.push(AuditIssue::BalanceDrift {
                    account_id: account.id,
                    account: account.name,
                    stored: account.balance,
                    computed,
                });
            }
        }

        let legs = transactions::list_by_kinds(
            &self.conn,
            &[TransactionKind::TransferOut, TransactionKind::TransferIn],
        )?;
        issues.extend(transfer_issues(legs));

        let eps = quantity_epsilon();
        for p in investments::list(&self.conn, false)? {
            if p.quantity < Decimal::ZERO {
                issues.push(AuditIssue::PositionState {
                    position_id: p.id,
                    detail: format!("negative quantity {}", p.quantity),
                });
            } else if p.active && p.quantity <= eps {
                issues.push(AuditIssue::PositionState {
                    position_id: p.id,
                    detail: "active with no quantity".into(),
                });
            } else if !p.active && p.quantity > eps {
                issues.push(AuditIssue::PositionState {
                    position_id: p.id,
                    detail: format!("inactive but still holds {}", p.quantity),
                });
            }
        }

        for issue in &issues {
            warn!(%issue, "audit finding");
        }
        Ok(issues)
    }

    /// Reset the stored balance to the sum of the account's transactions.
    /// Returns `(old, new)`.
    pub fn rebuild_balance(&mut self, account_id: i64) -> Result<(Decimal, Decimal)> {
        let tx = self.conn.transaction()?;
        let old = accounts::balance(&tx, account_id)?
            .ok_or_else(|| LedgerError::not_found("Account", account_id))?;
        let new = transactions::sum_for_account(&tx, account_id)?;
        accounts::set_balance(&tx, account_id, new)?;
        tx.commit()?;
        if old != new {
            info!(account_id, %old, %new, "balance rebuilt");
        }
        Ok((old, new))
    }
}
