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

//! Error types for ledger operations.

use crate::base::AccountNumber;
use thiserror::Error;

/// Message carried by [`LedgerError::InvalidAmount`] when an operation would
/// overdraw the account.
pub const OVERDRAFT_REASON: &str = "Unauthorized operation: amount exceeds account balance";

/// Ledger operation errors.
///
/// Neither variant is retryable: a failed call leaves the ledger untouched and
/// repeating it against the same state fails the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No account exists with this number
    #[error("Account {0} does not exist")]
    AccountNotFound(AccountNumber),

    /// Amount rejected, either because it would leave a negative balance or
    /// because it is not a usable amount at all
    #[error("{0}")]
    InvalidAmount(String),
}

impl LedgerError {
    pub(crate) fn overdraft() -> Self {
        LedgerError::InvalidAmount(OVERDRAFT_REASON.to_string())
    }
}
