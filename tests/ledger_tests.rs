// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use catoledger::models::{
    NewAccount, NewTransaction, TransactionFilter, TransactionKind, TransactionUpdate,
};
use catoledger::{Ledger, config};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn account(l: &mut Ledger, name: &str, initial: Decimal) -> i64 {
    l.create_account(NewAccount {
        name: name.into(),
        initial_balance: initial,
        account_type: "bank".into(),
        ..Default::default()
    })
    .unwrap()
}

fn spend(l: &mut Ledger, account_id: i64, amount: Decimal, category: &str) -> i64 {
    l.register_transaction(NewTransaction {
        account_id,
        amount,
        category: category.into(),
        description: "test".into(),
        ..Default::default()
    })
    .unwrap()
}

fn balance(l: &Ledger, id: i64) -> Decimal {
    l.get_account(id).unwrap().balance
}

fn rows_for(l: &Ledger, id: i64) -> Vec<catoledger::models::TransactionRow> {
    l.list_transactions(&TransactionFilter {
        account_id: Some(id),
        ..Default::default()
    })
    .unwrap()
}

fn sum_of(l: &Ledger, id: i64) -> Decimal {
    rows_for(l, id).iter().map(|r| r.transaction.amount).sum()
}

#[test]
fn checking_savings_scenario() {
    let mut l = Ledger::open_in_memory().unwrap();
    let checking = account(&mut l, "Checking", dec!(1000));
    assert_eq!(balance(&l, checking), dec!(1000));
    let rows = rows_for(&l, checking);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].transaction.kind, TransactionKind::InitialBalance);

    spend(&mut l, checking, dec!(-200), "Groceries");
    assert_eq!(balance(&l, checking), dec!(800));
    assert_eq!(rows_for(&l, checking).len(), 2);

    let savings = account(&mut l, "Savings", Decimal::ZERO);
    let r = l
        .execute_transfer(checking, savings, dec!(300), "Monthly saving", None)
        .unwrap();
    assert_eq!(balance(&l, checking), dec!(500));
    assert_eq!(balance(&l, savings), dec!(300));

    let out = l.get_transaction(r.outgoing_id).unwrap().transaction;
    let inc = l.get_transaction(r.incoming_id).unwrap().transaction;
    assert_eq!(out.amount, dec!(-300));
    assert_eq!(inc.amount, dec!(300));
    assert_eq!(out.kind, TransactionKind::TransferOut);
    assert_eq!(inc.kind, TransactionKind::TransferIn);
    assert_eq!(out.linked_transaction_id, Some(inc.id));
    assert_eq!(inc.linked_transaction_id, Some(out.id));
    assert_eq!(out.description, "Monthly saving (-> Savings)");
    assert_eq!(inc.description, "Monthly saving (<- Checking)");
    assert!(l.audit().unwrap().is_empty());
}

#[test]
fn balance_tracks_sum_through_register_update_delete() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(50));
    let t1 = spend(&mut l, a, dec!(-12.34), "Food");
    let t2 = spend(&mut l, a, dec!(100), "Salary");
    assert_eq!(balance(&l, a), sum_of(&l, a));

    let old = l.get_transaction(t1).unwrap().transaction;
    l.update_transaction(
        t1,
        TransactionUpdate {
            account_id: a,
            amount: dec!(-20),
            category: old.category,
            description: old.description,
            timestamp: old.timestamp,
            tags: Some("weekly".into()),
            kind: None,
            linked_transaction_id: None,
        },
    )
    .unwrap();
    assert_eq!(balance(&l, a), dec!(130));
    assert_eq!(balance(&l, a), sum_of(&l, a));

    assert!(l.delete_transaction(t2).unwrap());
    assert_eq!(balance(&l, a), dec!(30));
    assert_eq!(balance(&l, a), sum_of(&l, a));
    l.verify_account(a).unwrap();
}

#[test]
fn update_moves_transaction_between_accounts() {
    let mut l = Ledger::open_in_memory().unwrap();
    let x = account(&mut l, "X", dec!(100));
    let y = account(&mut l, "Y", dec!(100));
    let t = spend(&mut l, x, dec!(-40), "Misc");
    assert_eq!(balance(&l, x), dec!(60));

    let old = l.get_transaction(t).unwrap().transaction;
    l.update_transaction(
        t,
        TransactionUpdate {
            account_id: y,
            amount: dec!(-70),
            category: old.category,
            description: old.description,
            timestamp: old.timestamp,
            tags: None,
            kind: None,
            linked_transaction_id: None,
        },
    )
    .unwrap();
    assert_eq!(balance(&l, x), dec!(100));
    assert_eq!(balance(&l, y), dec!(30));
    assert_eq!(l.get_transaction(t).unwrap().account_name, "Y");
}

#[test]
fn update_rederives_sign_kind() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", Decimal::ZERO);
    let t = spend(&mut l, a, dec!(-5), "Refund");
    let old = l.get_transaction(t).unwrap().transaction;
    l.update_transaction(
        t,
        TransactionUpdate {
            account_id: a,
            amount: dec!(5),
            category: old.category,
            description: old.description,
            timestamp: old.timestamp,
            tags: None,
            kind: None,
            linked_transaction_id: None,
        },
    )
    .unwrap();
    assert_eq!(
        l.get_transaction(t).unwrap().transaction.kind,
        TransactionKind::Income
    );
}

#[test]
fn failed_update_leaves_balances_untouched() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(10));
    let t = spend(&mut l, a, dec!(-3), "X");
    let old = l.get_transaction(t).unwrap().transaction;
    let err = l
        .update_transaction(
            t,
            TransactionUpdate {
                account_id: 999,
                amount: dec!(-8),
                category: old.category,
                description: old.description,
                timestamp: old.timestamp,
                tags: None,
                kind: None,
                linked_transaction_id: None,
            },
        )
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(balance(&l, a), dec!(7));
    assert_eq!(l.get_transaction(t).unwrap().transaction.amount, dec!(-3));
}

#[test]
fn delete_reverses_amount_and_hides_row() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(100));
    let t = spend(&mut l, a, dec!(50), "Gift");
    assert_eq!(balance(&l, a), dec!(150));
    assert!(l.delete_transaction(t).unwrap());
    assert_eq!(balance(&l, a), dec!(100));
    assert!(rows_for(&l, a).iter().all(|r| r.transaction.id != t));
    assert!(!l.delete_transaction(t).unwrap());
}

#[test]
fn deleting_initial_balance_is_symmetric() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(250));
    let opening = rows_for(&l, a)[0].transaction.id;
    assert!(l.delete_transaction(opening).unwrap());
    assert_eq!(balance(&l, a), Decimal::ZERO);
    l.verify_account(a).unwrap();
}

#[test]
fn correct_balance_is_exact_and_idempotent() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(350));
    let id = l.correct_balance(a, dec!(500), None).unwrap().unwrap();
    let row = l.get_transaction(id).unwrap().transaction;
    assert_eq!(row.amount, dec!(150));
    assert_eq!(row.kind, TransactionKind::Correction);
    assert_eq!(row.category, "Correzione Saldo");
    assert_eq!(row.description, "Correzione manuale saldo (da 350.00 a 500.00)");
    assert_eq!(balance(&l, a), dec!(500));

    assert_eq!(l.correct_balance(a, dec!(500), None).unwrap(), None);
    assert_eq!(l.correct_balance(a, dec!(500.0005), None).unwrap(), None);
    assert_eq!(rows_for(&l, a).len(), 2);
}

#[test]
fn transfer_validation_writes_nothing() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(10));
    let b = account(&mut l, "B", dec!(10));
    assert!(l.execute_transfer(a, b, Decimal::ZERO, "x", None).unwrap_err().is_validation());
    assert!(l.execute_transfer(a, b, dec!(-1), "x", None).unwrap_err().is_validation());
    assert!(l.execute_transfer(a, a, dec!(1), "x", None).unwrap_err().is_validation());
    assert!(l.execute_transfer(a, 999, dec!(1), "x", None).unwrap_err().is_validation());
    assert_eq!(rows_for(&l, a).len(), 1);
    assert_eq!(balance(&l, a), dec!(10));
    assert_eq!(balance(&l, b), dec!(10));
}

#[test]
fn overdraft_is_allowed_by_default_and_configurable() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(10));
    let b = account(&mut l, "B", Decimal::ZERO);
    l.execute_transfer(a, b, dec!(15), "over", None).unwrap();
    assert_eq!(balance(&l, a), dec!(-5));

    l.set_setting(config::KEY_ALLOW_OVERDRAFT, "false").unwrap();
    let err = l.execute_transfer(b, a, dec!(16), "too much", None).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(balance(&l, b), dec!(15));
    l.execute_transfer(b, a, dec!(15), "all of it", None).unwrap();
    assert_eq!(balance(&l, b), Decimal::ZERO);
}

#[test]
fn delete_transfer_removes_both_legs() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(100));
    let b = account(&mut l, "B", Decimal::ZERO);
    let r = l.execute_transfer(a, b, dec!(25), "x", None).unwrap();

    let mut removed = l.delete_transfer(r.incoming_id).unwrap();
    removed.sort();
    assert_eq!(removed, vec![r.outgoing_id, r.incoming_id]);
    assert_eq!(balance(&l, a), dec!(100));
    assert_eq!(balance(&l, b), Decimal::ZERO);

    let t = spend(&mut l, a, dec!(-1), "x");
    assert!(l.delete_transfer(t).unwrap_err().is_validation());
}

#[test]
fn deleting_account_with_history_is_an_integrity_error() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(10));
    let err = l.delete_account(a).unwrap_err();
    assert!(err.is_integrity());
    assert_eq!(balance(&l, a), dec!(10));
    assert_eq!(rows_for(&l, a).len(), 1);

    let empty = account(&mut l, "Empty", Decimal::ZERO);
    l.delete_account(empty).unwrap();
    assert!(l.get_account(empty).unwrap_err().is_validation());
}

#[test]
fn duplicate_names_are_integrity_errors() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", Decimal::ZERO);
    let b = account(&mut l, "B", Decimal::ZERO);
    let err = l
        .create_account(NewAccount {
            name: "A".into(),
            initial_balance: dec!(5),
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.is_integrity());
    assert!(l.rename_account(b, "A").unwrap_err().is_integrity());
    l.rename_account(a, "Alpha").unwrap();
    assert_eq!(l.get_account_by_name("Alpha").unwrap().id, a);
}

#[test]
fn deactivate_hides_from_active_list() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", Decimal::ZERO);
    account(&mut l, "B", Decimal::ZERO);
    l.deactivate_account(a).unwrap();
    assert_eq!(l.list_accounts(true).unwrap().len(), 1);
    assert_eq!(l.list_accounts(false).unwrap().len(), 2);
    l.reactivate_account(a).unwrap();
    assert_eq!(l.list_accounts(true).unwrap().len(), 2);
    assert!(l.deactivate_account(404).unwrap_err().is_validation());
}

#[test]
fn register_on_missing_account_writes_nothing() {
    let mut l = Ledger::open_in_memory().unwrap();
    let err = l
        .register_transaction(NewTransaction {
            account_id: 7,
            amount: dec!(1),
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.is_validation());
    assert!(l.list_transactions(&TransactionFilter::default()).unwrap().is_empty());
}

#[test]
fn audit_detects_and_rebuild_repairs_drift() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(40));
    l.connection()
        .execute("UPDATE accounts SET balance='41' WHERE id=?1", [a])
        .unwrap();
    assert!(l.verify_account(a).unwrap_err().is_consistency());
    assert_eq!(l.audit().unwrap().len(), 1);

    assert_eq!(l.rebuild_balance(a).unwrap(), (dec!(41), dec!(40)));
    assert!(l.audit().unwrap().is_empty());
}

#[test]
fn settings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");
    {
        let mut l = Ledger::open(&path).unwrap();
        l.set_setting(config::KEY_DEFAULT_CURRENCY, "chf").unwrap();
    }
    let mut l = Ledger::open(&path).unwrap();
    assert_eq!(l.settings().default_currency, "CHF");
    let id = account(&mut l, "Konto", Decimal::ZERO);
    assert_eq!(l.get_account(id).unwrap().currency, "CHF");
}

fn leg_update(l: &Ledger, id: i64, account_id: i64, amount: Decimal) -> TransactionUpdate {
    let t = l.get_transaction(id).unwrap().transaction;
    TransactionUpdate {
        account_id,
        amount,
        category: t.category,
        description: t.description,
        timestamp: t.timestamp,
        tags: t.tags,
        kind: None,
        linked_transaction_id: None,
    }
}

#[test]
fn overflowing_amounts_are_rejected_without_writing() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(1));
    let err = l
        .register_transaction(NewTransaction {
            account_id: a,
            amount: Decimal::MAX,
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.is_validation());
    assert!(l.correct_balance(a, Decimal::MIN, None).unwrap_err().is_validation());
    assert_eq!(balance(&l, a), dec!(1));
    assert_eq!(rows_for(&l, a).len(), 1);
}

#[test]
fn transfer_rolls_back_when_incoming_leg_overflows() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(10));
    let b = account(&mut l, "B", Decimal::MAX);

    // The outgoing leg posts first; the incoming one overflows B.
    let err = l.execute_transfer(a, b, dec!(1), "x", None).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(rows_for(&l, a).len(), 1);
    assert_eq!(rows_for(&l, b).len(), 1);
    assert_eq!(balance(&l, a), dec!(10));
    assert_eq!(balance(&l, b), Decimal::MAX);
    assert!(l.audit().unwrap().is_empty());
}

#[test]
fn updating_a_transfer_leg_mirrors_its_counterpart() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(100));
    let b = account(&mut l, "B", Decimal::ZERO);
    let c = account(&mut l, "C", Decimal::ZERO);
    let r = l.execute_transfer(a, b, dec!(40), "x", None).unwrap();

    let upd = leg_update(&l, r.incoming_id, b, dec!(70));
    l.update_transaction(r.incoming_id, upd).unwrap();
    assert_eq!(l.get_transaction(r.outgoing_id).unwrap().transaction.amount, dec!(-70));
    assert_eq!(balance(&l, a), dec!(30));
    assert_eq!(balance(&l, b), dec!(70));
    assert!(l.audit().unwrap().is_empty());

    let upd = leg_update(&l, r.outgoing_id, c, dec!(-25));
    l.update_transaction(r.outgoing_id, upd).unwrap();
    assert_eq!(l.get_transaction(r.incoming_id).unwrap().transaction.amount, dec!(25));
    assert_eq!(balance(&l, a), dec!(100));
    assert_eq!(balance(&l, b), dec!(25));
    assert_eq!(balance(&l, c), dec!(-25));
    assert!(l.audit().unwrap().is_empty());
}

#[test]
fn transfer_leg_updates_that_break_the_pair_are_rejected() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(100));
    let b = account(&mut l, "B", Decimal::ZERO);
    let r = l.execute_transfer(a, b, dec!(40), "x", None).unwrap();

    let wrong_sign = leg_update(&l, r.incoming_id, b, dec!(-70));
    assert!(l.update_transaction(r.incoming_id, wrong_sign).unwrap_err().is_validation());
    let zero = leg_update(&l, r.outgoing_id, a, Decimal::ZERO);
    assert!(l.update_transaction(r.outgoing_id, zero).unwrap_err().is_validation());
    let same_account = leg_update(&l, r.incoming_id, a, dec!(40));
    assert!(l.update_transaction(r.incoming_id, same_account).unwrap_err().is_validation());
    let mut flipped = leg_update(&l, r.incoming_id, b, dec!(-40));
    flipped.kind = Some(TransactionKind::TransferOut);
    assert!(l.update_transaction(r.incoming_id, flipped).unwrap_err().is_validation());
    let mut relinked = leg_update(&l, r.incoming_id, b, dec!(40));
    relinked.linked_transaction_id = Some(rows_for(&l, a).last().unwrap().transaction.id);
    assert!(l.update_transaction(r.incoming_id, relinked).unwrap_err().is_validation());

    assert_eq!(balance(&l, a), dec!(60));
    assert_eq!(balance(&l, b), dec!(40));
    assert!(l.audit().unwrap().is_empty());
}

#[test]
fn deleting_one_transfer_leg_removes_the_pair() {
    let mut l = Ledger::open_in_memory().unwrap();
    let a = account(&mut l, "A", dec!(100));
    let b = account(&mut l, "B", Decimal::ZERO);
    let r = l.execute_transfer(a, b, dec!(40), "x", None).unwrap();

    assert!(l.delete_transaction(r.outgoing_id).unwrap());
    assert!(l.get_transaction(r.incoming_id).unwrap_err().is_validation());
    assert_eq!(balance(&l, a), dec!(100));
    assert_eq!(balance(&l, b), Decimal::ZERO);
    assert_eq!(rows_for(&l, b).len(), 0);
    assert!(l.audit().unwrap().is_empty());
    assert!(!l.delete_transaction(r.incoming_id).unwrap());
}
