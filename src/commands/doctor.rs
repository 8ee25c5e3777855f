// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::audit::AuditIssue;
use crate::ledger::Ledger;
use crate::utils::pretty_table;
use anyhow::Result;

pub fn handle(ledger: &mut Ledger, m: &clap::ArgMatches) -> Result<()> {
    let issues = ledger.audit()?;
    if issues.is_empty() {
        println!("doctor: no issues found");
        return Ok(());
    }

    let rows = issues
        .iter()
        .map(|i| {
            let kind = match i {
                AuditIssue::BalanceDrift { .. } => "balance_drift",
                AuditIssue::TransferLeg { .. } => "transfer_leg",
                AuditIssue::PositionState { .. } => "position_state",
            };
            vec![kind.to_string(), i.to_string()]
        })
        .collect();
    println!("{}", pretty_table(&["Issue", "Detail"], rows));

    if m.get_flag("fix") {
        for issue in &issues {
            if let AuditIssue::BalanceDrift { account_id, .. } = issue {
                let (old, new) = ledger.rebuild_balance(*account_id)?;
                println!("Rebuilt balance of account #{}: {} -> {}", account_id, old, new);
            }
        }
    }
    Ok(())
}
