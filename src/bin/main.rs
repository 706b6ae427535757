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

use anyhow::Context;
use bank_ledger_rs::{Ledger, SystemClock, api};
use chrono::FixedOffset;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bank Ledger - Serve an in-memory bank account ledger over HTTP
///
/// Accounts, balances and statements live in memory only and are lost when
/// the process exits.
#[derive(Parser, Debug)]
#[command(name = "bank-ledger-rs")]
#[command(about = "Serves an in-memory bank account ledger over HTTP", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LEDGER_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// UTC offset used for statement timestamps, e.g. "+02:00"
    ///
    /// Defaults to the host's local offset.
    #[arg(long, env = "LEDGER_UTC_OFFSET", value_parser = parse_offset)]
    utc_offset: Option<FixedOffset>,
}

fn parse_offset(value: &str) -> Result<FixedOffset, String> {
    value
        .parse::<FixedOffset>()
        .map_err(|e| format!("invalid UTC offset '{value}': {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let clock = args
        .utc_offset
        .map(SystemClock::new)
        .unwrap_or_else(SystemClock::local);
    let ledger = Arc::new(Ledger::with_clock(clock));

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!(address = %args.bind, utc_offset = %clock.offset(), "ledger API listening");

    api::serve(listener, ledger)
        .await
        .context("Ledger API server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let args = Args::try_parse_from(["bank-ledger-rs"]).unwrap();
        assert_eq!(args.bind, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn parses_utc_offset() {
        let args = Args::try_parse_from(["bank-ledger-rs", "--utc-offset", "+02:00"]).unwrap();
        assert_eq!(args.utc_offset, FixedOffset::east_opt(2 * 3600));
    }

    #[test]
    fn rejects_garbage_offset() {
        assert!(Args::try_parse_from(["bank-ledger-rs", "--utc-offset", "soon"]).is_err());
    }
}
