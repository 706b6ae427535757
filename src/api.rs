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

//! HTTP adapter for the ledger.
//!
//! ## Endpoints
//!
//! - `POST /api/account` - Open an account (`{"amount": "12.00"}`, or `{}` for zero)
//! - `GET /api/accounts` - List all accounts
//! - `GET /api/account/{accountNumber}` - Get an account
//! - `POST /api/account/deposit` - Deposit a positive amount
//! - `POST /api/account/withdrawal` - Withdraw a positive amount
//! - `GET /api/account/{accountNumber}/statements` - Account history, oldest first
//!
//! Amounts are returned as JSON strings to keep full decimal precision;
//! requests may send them as strings or as plain JSON numbers.
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/api/account \
//!   -H "Content-Type: application/json" -d '{"amount": "80.00"}'
//!
//! curl -X POST http://localhost:3000/api/account/deposit \
//!   -H "Content-Type: application/json" \
//!   -d '{"accountNumber": 1, "amount": "20.05"}'
//!
//! curl http://localhost:3000/api/account/1/statements
//! ```

use crate::account::Account;
use crate::base::AccountNumber;
use crate::clock::{Clock, SystemClock};
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::statement::Statement;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::debug;

// === Request/Response DTOs ===

/// Request body for deposits and withdrawals.
///
/// ```json
/// {"accountNumber": 1, "amount": "121.05"}
/// {"accountNumber": 1, "amount": 121.05}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub account_number: AccountNumber,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
}

/// Request body for opening an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAccountRequest {
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
}

/// Accepts an amount written either as a JSON string or as a JSON number.
///
/// Floats go through their shortest decimal rendering, so `121.05` parses
/// as exactly `121.05`.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = Decimal;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal amount as a string or a number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Decimal, E> {
            Decimal::from_str(value.trim())
                .or_else(|_| Decimal::from_scientific(value.trim()))
                .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Decimal, E> {
            Ok(Decimal::from(value))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Decimal, E> {
            Ok(Decimal::from(value))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Decimal, E> {
            if !value.is_finite() {
                return Err(E::invalid_value(de::Unexpected::Float(value), &self));
            }
            Decimal::from_str(&value.to_string())
                .map_err(|_| E::invalid_value(de::Unexpected::Float(value), &self))
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

/// Response body for errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub account_number: Option<AccountNumber>,
}

// === Application State ===

/// Shared application state containing the ledger.
pub struct AppState<C = SystemClock> {
    pub ledger: Arc<Ledger<C>>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

// === Error Handling ===

/// Wrapper for converting [`LedgerError`] into HTTP responses.
#[derive(Debug)]
pub struct AppError {
    error: LedgerError,
    account_number: Option<AccountNumber>,
}

impl AppError {
    fn for_account(mut self, account_number: AccountNumber) -> Self {
        self.account_number = Some(account_number);
        self
    }
}

impl From<LedgerError> for AppError {
    fn from(error: LedgerError) -> Self {
        let account_number = match &error {
            LedgerError::AccountNotFound(n) => Some(*n),
            LedgerError::InvalidAmount(_) => None,
        };
        AppError {
            error,
            account_number,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.error {
            LedgerError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            LedgerError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
        };
        debug!(status = %status, error = %self.error, "request rejected");

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message: self.error.to_string(),
                account_number: self.account_number,
            }),
        )
            .into_response()
    }
}

/// Rejects zero and negative amounts before they reach the ledger.
pub fn positive_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!("Invalid negative amount: {amount}")));
    }
    Ok(amount)
}

// === Handlers ===

/// POST /api/account - Open an account.
async fn open_account<C: Clock + 'static>(
    State(state): State<AppState<C>>,
    Json(request): Json<OpenAccountRequest>,
) -> (StatusCode, Json<Account>) {
    let account = state.ledger.create_account(request.amount);
    (StatusCode::CREATED, Json(account))
}

/// GET /api/accounts - List all accounts.
async fn list_accounts<C: Clock + 'static>(State(state): State<AppState<C>>) -> Json<Vec<Account>> {
    Json(state.ledger.accounts())
}

/// GET /api/account/{accountNumber} - Get an account.
async fn get_account<C: Clock + 'static>(
    State(state): State<AppState<C>>,
    Path(account_number): Path<AccountNumber>,
) -> Result<Json<Account>, AppError> {
    Ok(Json(state.ledger.get_account(account_number)?))
}

/// POST /api/account/deposit - Credit a positive amount.
async fn deposit<C: Clock + 'static>(
    State(state): State<AppState<C>>,
    Json(request): Json<OperationRequest>,
) -> Result<Json<Account>, AppError> {
    apply(&state.ledger, request.account_number, request.amount, false)
}

/// POST /api/account/withdrawal - Debit a positive amount.
async fn withdrawal<C: Clock + 'static>(
    State(state): State<AppState<C>>,
    Json(request): Json<OperationRequest>,
) -> Result<Json<Account>, AppError> {
    apply(&state.ledger, request.account_number, request.amount, true)
}

/// GET /api/account/{accountNumber}/statements - Account history.
async fn statements<C: Clock + 'static>(
    State(state): State<AppState<C>>,
    Path(account_number): Path<AccountNumber>,
) -> Result<Json<Vec<Statement>>, AppError> {
    Ok(Json(state.ledger.get_history(account_number)?))
}

fn apply<C: Clock>(
    ledger: &Ledger<C>,
    account_number: AccountNumber,
    amount: Decimal,
    withdraw: bool,
) -> Result<Json<Account>, AppError> {
    let amount =
        positive_amount(amount).map_err(|e| AppError::from(e).for_account(account_number))?;
    let delta = if withdraw { -amount } else { amount };
    ledger
        .add_amount(account_number, delta)
        .map(Json)
        .map_err(|e| AppError::from(e).for_account(account_number))
}

// === Router ===

pub fn router<C: Clock + 'static>(ledger: Arc<Ledger<C>>) -> Router {
    Router::new()
        .route("/api/account", post(open_account::<C>))
        .route("/api/accounts", get(list_accounts::<C>))
        .route("/api/account/deposit", post(deposit::<C>))
        .route("/api/account/withdrawal", post(withdrawal::<C>))
        .route("/api/account/{account_number}", get(get_account::<C>))
        .route("/api/account/{account_number}/statements", get(statements::<C>))
        .with_state(AppState { ledger })
}

/// Serves the ledger API on an already bound listener until the server fails.
pub async fn serve<C: Clock + 'static>(
    listener: TcpListener,
    ledger: Arc<Ledger<C>>,
) -> std::io::Result<()> {
    axum::serve(listener, router(ledger)).await
}
