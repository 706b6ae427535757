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

//! The account ledger.
//!
//! The [`Ledger`] is the central component: it opens accounts, applies
//! deposits and withdrawals, and serves account statements.
//!
//! # Thread Safety
//!
//! Accounts are stored in a [`DashMap`], each behind its own lock, so
//! operations on different accounts run in parallel while operations on the
//! same account are applied one at a time. Account numbers come from an
//! atomic counter.

use crate::account::{Account, AccountRecord};
use crate::base::AccountNumber;
use crate::clock::{Clock, SystemClock};
use crate::error::LedgerError;
use crate::statement::Statement;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info};

/// In-memory bank ledger.
///
/// # Invariants
///
/// - Account numbers start at 1, increase strictly and are never reused.
/// - A balance changed by [`Ledger::add_amount`] is never negative.
/// - The last statement of an account always carries its current balance.
/// - A rejected operation changes nothing.
pub struct Ledger<C = SystemClock> {
    clock: C,
    /// Last account number handed out.
    last_account_number: AtomicU32,
    /// Accounts indexed by account number.
    accounts: DashMap<AccountNumber, Arc<AccountRecord>>,
}

impl Ledger<SystemClock> {
    /// Creates an empty ledger stamping statements with the local wall clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::local())
    }
}

impl Default for Ledger<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Ledger<C> {
    pub fn with_clock(clock: C) -> Self {
        Ledger {
            clock,
            last_account_number: AtomicU32::new(0),
            accounts: DashMap::new(),
        }
    }

    /// Opens an account with a zero balance.
    pub fn open_account(&self) -> Account {
        self.create_account(Decimal::ZERO)
    }

    /// Opens an account with the given opening balance.
    ///
    /// The opening amount is not validated: a negative opening balance is
    /// accepted, and any later withdrawal from such an account is rejected
    /// until deposits bring it back to zero or above. The balance is rounded
    /// to two decimal places; the opening statement records the amount as
    /// given.
    pub fn create_account(&self, opening_amount: Decimal) -> Account {
        let account_number =
            AccountNumber(self.last_account_number.fetch_add(1, Ordering::SeqCst) + 1);
        let record = AccountRecord::open(account_number, opening_amount, self.clock.now());
        let account = record.snapshot();
        self.accounts.insert(account_number, Arc::new(record));

        info!(account = %account_number, balance = %account.balance(), "account opened");
        account
    }

    /// Returns the current snapshot of an account.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - No account with this number.
    pub fn get_account(&self, account_number: AccountNumber) -> Result<Account, LedgerError> {
        Ok(self.record(account_number)?.snapshot())
    }

    /// Applies a signed amount to an account: positive deposits, negative
    /// withdraws.
    ///
    /// The new balance is rounded to two decimal places. The statement for
    /// the operation is appended under the same lock as the balance update.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - No account with this number.
    /// - [`LedgerError::InvalidAmount`] - `balance + amount` would be negative.
    pub fn add_amount(
        &self,
        account_number: AccountNumber,
        amount: Decimal,
    ) -> Result<Account, LedgerError> {
        let record = self.record(account_number)?;
        match record.add_amount(amount, &self.clock) {
            Ok(account) => {
                debug!(
                    account = %account_number,
                    %amount,
                    balance = %account.balance(),
                    "amount applied"
                );
                Ok(account)
            }
            Err(e) => {
                debug!(account = %account_number, %amount, error = %e, "amount rejected");
                Err(e)
            }
        }
    }

    /// Returns every statement of an account, oldest first.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - No account with this number.
    pub fn get_history(
        &self,
        account_number: AccountNumber,
    ) -> Result<Vec<Statement>, LedgerError> {
        Ok(self.record(account_number)?.statements())
    }

    /// Returns snapshots of all accounts ordered by account number.
    ///
    /// Records are collected first so no shard lock is held while each
    /// account lock is taken.
    pub fn accounts(&self) -> Vec<Account> {
        let records: Vec<Arc<AccountRecord>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut accounts: Vec<Account> = records.iter().map(|r| r.snapshot()).collect();
        accounts.sort_by_key(Account::account_number);
        accounts
    }

    /// Clones the record out of the map so the shard lock is released before
    /// the account lock is taken.
    fn record(&self, account_number: AccountNumber) -> Result<Arc<AccountRecord>, LedgerError> {
        self.accounts
            .get(&account_number)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LedgerError::AccountNotFound(account_number))
    }
}
