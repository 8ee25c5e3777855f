// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod audit;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod ledger;
pub mod models;
pub mod portfolio;
pub mod repo;
pub mod utils;

pub use errors::{LedgerError, Result};
pub use ledger::Ledger;
