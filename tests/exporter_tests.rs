// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use catoledger::models::{NewAccount, NewTransaction};
use catoledger::utils::parse_timestamp;
use catoledger::{Ledger, cli, commands::exporter};
use rust_decimal_macros::dec;
use tempfile::tempdir;

fn ledger() -> Ledger {
    let mut l = Ledger::open_in_memory().unwrap();
    let id = l
        .create_account(NewAccount {
            name: "Checking".into(),
            account_type: "bank".into(),
            currency: Some("USD".into()),
            ..Default::default()
        })
        .unwrap();
    l.register_transaction(NewTransaction {
        account_id: id,
        amount: dec!(-12.34),
        category: "Groceries".into(),
        description: "Corner Shop".into(),
        timestamp: Some(parse_timestamp("2025-01-02 08:30:00").unwrap()),
        tags: Some("weekly".into()),
        ..Default::default()
    })
    .unwrap();
    l
}

fn run(l: &Ledger, format: &str, out: &str) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from([
        "catoledger",
        "export",
        "transactions",
        "--format",
        format,
        "--out",
        out,
    ]);
    match matches.subcommand() {
        Some(("export", export_m)) => exporter::handle(l, export_m),
        _ => panic!("no export subcommand"),
    }
}

#[test]
fn export_transactions_writes_pretty_json() {
    let l = ledger();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.json");
    run(&l, "json", &out_path.to_string_lossy()).unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["account_name"], "Checking");
    assert_eq!(rows[0]["amount"], "-12.34");
    assert_eq!(rows[0]["category"], "Groceries");
    assert_eq!(rows[0]["description"], "Corner Shop");
    assert_eq!(rows[0]["tags"], "weekly");
}

#[test]
fn export_transactions_writes_csv() {
    let l = ledger();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.csv");
    run(&l, "CSV", &out_path.to_string_lossy()).unwrap();

    let mut rdr = csv::Reader::from_path(&out_path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[1], "timestamp");
    let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(&records[0][1], "2025-01-02 08:30:00");
    assert_eq!(&records[0][2], "Checking");
    assert_eq!(&records[0][3], "-12.34");
    assert_eq!(&records[0][4], "Uscita");
}

#[test]
fn export_transactions_rejects_unknown_format() {
    let l = ledger();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.unknown");
    assert!(run(&l, "xml", &out_path.to_string_lossy()).is_err());
    assert!(!out_path.exists());
}
