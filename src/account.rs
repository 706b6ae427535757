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

//! Account management.
//!
//! An [`Account`] is a value snapshot: every applied operation produces a new
//! one. Inside the ledger each account lives in an [`AccountRecord`], which
//! keeps the current snapshot and the account's statements behind a single
//! lock so the two can never drift apart.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use bank_ledger_rs::{Account, AccountNumber};
//!
//! let account = Account::new(AccountNumber(1), dec!(12));
//! assert_eq!(account.balance().to_string(), "12.00");
//! ```

use crate::base::AccountNumber;
use crate::clock::Clock;
use crate::error::LedgerError;
use crate::statement::Statement;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits kept on every stored balance.
pub const DECIMAL_PRECISION: u32 = 2;

/// Rounds a currency amount to [`DECIMAL_PRECISION`] digits, half away from
/// zero, and pins the scale so `80` becomes `80.00`.
pub fn round_amount(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(DECIMAL_PRECISION, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DECIMAL_PRECISION);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

/// Snapshot of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    account_number: AccountNumber,
    balance: Decimal,
}

impl Account {
    pub fn new(account_number: AccountNumber, balance: Decimal) -> Self {
        Self {
            account_number,
            balance: round_amount(balance),
        }
    }

    pub fn account_number(&self) -> AccountNumber {
        self.account_number
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }
}

#[derive(Debug)]
struct AccountData {
    account: Account,
    /// Statements in application order, oldest first.
    statements: Vec<Statement>,
}

impl AccountData {
    /// The opening statement keeps the raw opening amount, like any other
    /// entry keeps its raw delta; only the balance is rounded.
    fn open(
        account_number: AccountNumber,
        opening_amount: Decimal,
        timestamp: NaiveDateTime,
    ) -> Self {
        let account = Account::new(account_number, opening_amount);
        Self {
            account,
            statements: vec![Statement {
                account_number,
                timestamp,
                amount: opening_amount,
                balance: account.balance,
            }],
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.account.balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.account.balance
        );
        debug_assert_eq!(
            self.statements.last().map(|s| s.balance),
            Some(self.account.balance),
            "Invariant violated: last statement does not match balance"
        );
    }

    /// Applies a signed delta, reading the clock only once the operation is
    /// known to succeed.
    fn apply<C: Clock + ?Sized>(
        &mut self,
        amount: Decimal,
        clock: &C,
    ) -> Result<Account, LedgerError> {
        let sum = self
            .account
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount(format!("Amount out of range: {amount}")))?;
        if sum < Decimal::ZERO {
            return Err(LedgerError::overdraft());
        }

        let account = Account::new(self.account.account_number, sum);
        self.statements.push(Statement {
            account_number: account.account_number,
            timestamp: clock.now(),
            amount,
            balance: account.balance,
        });
        self.account = account;
        self.assert_invariants();
        Ok(account)
    }
}

/// Ledger-side storage for one account.
#[derive(Debug)]
pub(crate) struct AccountRecord {
    inner: Mutex<AccountData>,
}

impl AccountRecord {
    pub(crate) fn open(
        account_number: AccountNumber,
        opening_amount: Decimal,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            inner: Mutex::new(AccountData::open(account_number, opening_amount, timestamp)),
        }
    }

    pub(crate) fn snapshot(&self) -> Account {
        self.inner.lock().account
    }

    /// Updates the balance and appends the matching statement as one unit.
    pub(crate) fn add_amount<C: Clock + ?Sized>(
        &self,
        amount: Decimal,
        clock: &C,
    ) -> Result<Account, LedgerError> {
        self.inner.lock().apply(amount, clock)
    }

    pub(crate) fn statements(&self) -> Vec<Statement> {
        self.inner.lock().statements.clone()
    }

    /// Runs `f` while holding the account lock.
    #[cfg(test)]
    pub(crate) fn with_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.inner.lock();
        f()
    }
}
