// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Bank Ledger
//!
//! This library provides an in-memory bank account ledger: open accounts,
//! deposit and withdraw funds (overdrafts are rejected) and read back a
//! chronological statement of every applied operation.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Owns accounts and their statement history
//! - [`Account`]: Snapshot of an account number and its balance
//! - [`Statement`]: Audit entry for one applied operation
//! - [`Clock`]: Injected time source for statement timestamps
//! - [`LedgerError`]: Error types for rejected operations
//! - [`api`]: HTTP adapter exposing the ledger as a JSON API
//!
//! ## Example
//!
//! ```
//! use bank_ledger_rs::Ledger;
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::new();
//!
//! let account = ledger.create_account(dec!(80.00));
//! let number = account.account_number();
//!
//! ledger.add_amount(number, dec!(20.05)).unwrap();
//! let account = ledger.add_amount(number, dec!(-75.00)).unwrap();
//! assert_eq!(account.balance(), dec!(25.05));
//!
//! // Overdrafts are rejected and leave the account untouched.
//! assert!(ledger.add_amount(number, dec!(-100)).is_err());
//! assert_eq!(ledger.get_history(number).unwrap().len(), 3);
//! ```
//!
//! ## Thread Safety
//!
//! Each account has its own lock, so the ledger handles concurrent requests
//! on different accounts in parallel and serializes those on the same one.

pub mod account;
pub mod api;
mod base;
pub mod clock;
pub mod error;
mod ledger;
mod statement;

pub use account::Account;
pub use base::AccountNumber;
pub use clock::{Clock, ScriptedClock, SystemClock};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use statement::Statement;
