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

//! Concurrency tests for the ledger.
//!
//! These tests hammer a shared [`Ledger`] from many threads and check that no
//! update is lost, that balances and statements stay in step, and that the
//! per-account locks never deadlock (using parking_lot's deadlock detector,
//! enabled through the `deadlock_detection` feature in dev-dependencies).

use bank_ledger_rs::{AccountNumber, Ledger, LedgerError};
use parking_lot::deadlock;
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread Id {:#?}", t.thread_id());
                        eprintln!("{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected!");
            }
        }
    });

    running
}

fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    // Give the detector one last chance to run.
    thread::sleep(Duration::from_millis(150));
}

// === Tests ===

#[test]
fn concurrent_deposits_single_account_lose_nothing() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(Ledger::new());
    let n = ledger.create_account(dec!(100.00)).account_number();

    const THREADS: usize = 16;
    const DEPOSITS_PER_THREAD: usize = 250;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for _ in 0..DEPOSITS_PER_THREAD {
                    ledger.add_amount(n, dec!(1.25)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = THREADS * DEPOSITS_PER_THREAD;
    let account = ledger.get_account(n).unwrap();
    assert_eq!(
        account.balance(),
        dec!(100.00) + dec!(1.25) * Decimal::from(total)
    );

    let history = ledger.get_history(n).unwrap();
    assert_eq!(history.len(), total + 1);
    // Each statement's balance is the previous one plus its amount.
    for pair in history.windows(2) {
        assert_eq!(pair[1].balance, pair[0].balance + pair[1].amount);
    }

    stop_deadlock_detector(detector);
}

#[test]
fn concurrent_withdrawals_never_overdraw() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(Ledger::new());
    let n = ledger.create_account(dec!(50.00)).account_number();
    let accepted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                for _ in 0..50 {
                    match ledger.add_amount(n, dec!(-1.00)) {
                        Ok(account) => {
                            assert!(account.balance() >= Decimal::ZERO);
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => assert!(matches!(e, LedgerError::InvalidAmount(_))),
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Exactly enough withdrawals went through to empty the account.
    assert_eq!(accepted.load(Ordering::SeqCst), 50);
    assert_eq!(ledger.get_account(n).unwrap().balance(), Decimal::ZERO);
    assert_eq!(ledger.get_history(n).unwrap().len(), 51);

    stop_deadlock_detector(detector);
}

#[test]
fn concurrent_account_numbers_are_distinct() {
    let ledger = Ledger::new();

    let numbers: Vec<AccountNumber> = (0..2_000)
        .into_par_iter()
        .map(|_| ledger.open_account().account_number())
        .collect();

    let unique: HashSet<_> = numbers.iter().copied().collect();
    assert_eq!(unique.len(), numbers.len());
    assert_eq!(numbers.iter().max(), Some(&AccountNumber(2_000)));
    assert_eq!(ledger.accounts().len(), 2_000);
}

#[test]
fn mixed_operations_across_accounts() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(Ledger::new());
    let numbers: Vec<_> = (0..10)
        .map(|_| ledger.create_account(dec!(10.00)).account_number())
        .collect();

    (0..4_000usize).into_par_iter().for_each(|i| {
        let n = numbers[i % numbers.len()];
        match i % 4 {
            0 => {
                ledger.add_amount(n, dec!(2.00)).unwrap();
            }
            1 => {
                let _ = ledger.add_amount(n, dec!(-1.00));
            }
            2 => {
                let history = ledger.get_history(n).unwrap();
                // A snapshot read is internally consistent.
                for pair in history.windows(2) {
                    assert_eq!(pair[1].balance, pair[0].balance + pair[1].amount);
                }
            }
            _ => {
                let _ = ledger.accounts();
            }
        }
    });

    for n in numbers {
        let balance = ledger.get_account(n).unwrap().balance();
        let history = ledger.get_history(n).unwrap();
        assert_eq!(history.last().unwrap().balance, balance);
        assert!(balance >= Decimal::ZERO);
    }

    stop_deadlock_detector(detector);
}

#[test]
fn reads_during_writes_see_complete_statements() {
    let ledger = Arc::new(Ledger::new());
    let n = ledger.open_account().account_number();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let ledger = Arc::clone(&ledger);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for _ in 0..5_000 {
                ledger.add_amount(n, dec!(0.01)).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    while !done.load(Ordering::SeqCst) {
        let history = ledger.get_history(n).unwrap();
        let expected = dec!(0.01) * Decimal::from(history.len() - 1);
        assert_eq!(history.last().unwrap().balance, expected);
    }
    writer.join().unwrap();

    assert_eq!(ledger.get_account(n).unwrap().balance(), dec!(50.00));
}
