// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::Ledger;
use crate::utils::pretty_table;
use anyhow::Result;

pub fn handle(ledger: &mut Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => {
            let rows = ledger
                .settings()
                .pairs()
                .into_iter()
                .map(|(k, v)| vec![k.to_string(), v])
                .collect();
            println!("{}", pretty_table(&["Key", "Value"], rows));
        }
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            let value = sub.get_one::<String>("value").unwrap();
            ledger.set_setting(key.trim(), value)?;
            println!("Set {} = {}", key.trim(), value.trim());
        }
        _ => {}
    }
    Ok(())
}
