// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn filter_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("account").long("account").help("Account name or id"))
        .arg(Arg::new("from").long("from").help("First day, YYYY-MM-DD"))
        .arg(Arg::new("to").long("to").help("Last day, YYYY-MM-DD"))
        .arg(
            Arg::new("category")
                .long("category")
                .help("Substring of the category"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("offset")
                .long("offset")
                .value_parser(clap::value_parser!(u32)),
        )
}

fn required(name: &'static str) -> Arg {
    Arg::new(name).long(name).required(true)
}

fn account_cmd() -> Command {
    Command::new("account")
        .about("Manage accounts")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Create an account")
                .arg(required("name"))
                .arg(
                    Arg::new("initial")
                        .long("initial")
                        .default_value("0")
                        .allow_hyphen_values(true)
                        .help("Opening balance"),
                )
                .arg(Arg::new("type").long("type").default_value(""))
                .arg(Arg::new("currency").long("currency")),
        )
        .subcommand(json_flags(
            Command::new("list").about("List accounts").arg(
                Arg::new("all")
                    .long("all")
                    .action(ArgAction::SetTrue)
                    .help("Include inactive accounts"),
            ),
        ))
        .subcommand(json_flags(
            Command::new("show").arg(required("account")),
        ))
        .subcommand(
            Command::new("rename")
                .arg(required("account"))
                .arg(required("name")),
        )
        .subcommand(Command::new("deactivate").arg(required("account")))
        .subcommand(Command::new("reactivate").arg(required("account")))
        .subcommand(
            Command::new("rm")
                .about("Delete an account that has no transactions")
                .arg(required("account")),
        )
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and query transactions")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Register an income or expense")
                .arg(required("account"))
                .arg(required("amount").allow_hyphen_values(true))
                .arg(Arg::new("category").long("category").default_value(""))
                .arg(Arg::new("description").long("description").default_value(""))
                .arg(Arg::new("date").long("date"))
                .arg(Arg::new("kind").long("kind"))
                .arg(Arg::new("tags").long("tags")),
        )
        .subcommand(json_flags(filter_args(
            Command::new("list").about("List transactions, newest first"),
        )))
        .subcommand(json_flags(
            Command::new("show").arg(
                required("id").value_parser(clap::value_parser!(i64)),
            ),
        ))
        .subcommand(
            Command::new("edit")
                .about("Edit a transaction; omitted fields keep their value")
                .arg(required("id").value_parser(clap::value_parser!(i64)))
                .arg(Arg::new("account").long("account"))
                .arg(Arg::new("amount").long("amount").allow_hyphen_values(true))
                .arg(Arg::new("category").long("category"))
                .arg(Arg::new("description").long("description"))
                .arg(Arg::new("date").long("date"))
                .arg(Arg::new("kind").long("kind"))
                .arg(Arg::new("tags").long("tags")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a transaction; a transfer leg takes its counterpart with it")
                .arg(required("id").value_parser(clap::value_parser!(i64))),
        )
        .subcommand(
            Command::new("transfer")
                .about("Move money between two accounts")
                .arg(required("from"))
                .arg(required("to"))
                .arg(required("amount"))
                .arg(Arg::new("description").long("description").default_value("Giroconto"))
                .arg(Arg::new("date").long("date")),
        )
        .subcommand(
            Command::new("rm-transfer")
                .about("Delete both legs of a transfer")
                .arg(required("id").value_parser(clap::value_parser!(i64))),
        )
        .subcommand(
            Command::new("correct")
                .about("Reconcile an account to a known balance")
                .arg(required("account"))
                .arg(required("balance").allow_hyphen_values(true))
                .arg(Arg::new("date").long("date")),
        )
}

fn portfolio_cmd() -> Command {
    let id = || required("id").value_parser(clap::value_parser!(i64));
    let trade = |cmd: Command| {
        cmd.arg(required("quantity"))
            .arg(required("price"))
            .arg(Arg::new("fees").long("fees").default_value("0"))
            .arg(Arg::new("date").long("date"))
            .arg(
                Arg::new("cash-account")
                    .long("cash-account")
                    .help("Account paying for a buy or receiving a sale"),
            )
    };
    Command::new("portfolio")
        .about("Investment positions")
        .subcommand_required(true)
        .subcommand(trade(
            Command::new("buy")
                .about("Buy into the position matching --instrument, opening it if needed")
                .arg(required("instrument").help("Symbol or instrument name"))
                .arg(Arg::new("name").long("name"))
                .arg(Arg::new("symbol").long("symbol"))
                .arg(Arg::new("type").long("type").default_value(""))
                .arg(Arg::new("currency").long("currency"))
                .arg(Arg::new("holding-account").long("holding-account"))
                .arg(Arg::new("notes").long("notes").default_value("")),
        ))
        .subcommand(trade(Command::new("sell").arg(id())))
        .subcommand(
            Command::new("value")
                .about("Record the current unit value")
                .arg(id())
                .arg(required("price"))
                .arg(Arg::new("date").long("date")),
        )
        .subcommand(
            Command::new("edit")
                .arg(id())
                .arg(Arg::new("name").long("name"))
                .arg(Arg::new("symbol").long("symbol"))
                .arg(Arg::new("type").long("type"))
                .arg(Arg::new("currency").long("currency"))
                .arg(Arg::new("holding-account").long("holding-account"))
                .arg(Arg::new("notes").long("notes")),
        )
        .subcommand(
            Command::new("close")
                .about("Write off a position without cash movement")
                .arg(id()),
        )
        .subcommand(json_flags(
            Command::new("list").arg(
                Arg::new("all")
                    .long("all")
                    .action(ArgAction::SetTrue)
                    .help("Include closed positions"),
            ),
        ))
        .subcommand(json_flags(Command::new("history")))
}

pub fn build_cli() -> Command {
    Command::new("catoledger")
        .about("Personal ledger with consistent balances")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(account_cmd())
        .subcommand(tx_cmd())
        .subcommand(portfolio_cmd())
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand_required(true)
                .subcommand(filter_args(
                    Command::new("transactions")
                        .arg(required("format").help("csv or json"))
                        .arg(required("out")),
                )),
        )
        .subcommand(
            Command::new("doctor")
                .about("Check balances, transfer pairs and positions")
                .arg(
                    Arg::new("fix")
                        .long("fix")
                        .action(ArgAction::SetTrue)
                        .help("Rebuild drifted balances from transaction history"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change settings")
                .subcommand_required(true)
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set")
                        .arg(required("key"))
                        .arg(required("value")),
                ),
        )
}
