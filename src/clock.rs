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

//! Time source for statement timestamps.
//!
//! The [`Ledger`](crate::Ledger) never reads the system time directly: it asks
//! an injected [`Clock`]. Production code uses [`SystemClock`]; tests use
//! [`ScriptedClock`] to get repeatable timestamps.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Supplies the current local date-time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Wall clock pinned to a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Uses the host's local offset as observed at construction time.
    pub fn local() -> Self {
        Self::new(Local::now().offset().fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::local()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}

/// Replays a fixed list of instants, cycling back to the first one once the
/// list is exhausted.
///
/// # Example
///
/// ```
/// use bank_ledger_rs::{Clock, ScriptedClock};
/// use chrono::NaiveDate;
///
/// let t0 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let t1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 5, 0).unwrap();
/// let clock = ScriptedClock::new([t0, t1]);
///
/// assert_eq!(clock.now(), t0);
/// assert_eq!(clock.now(), t1);
/// assert_eq!(clock.now(), t0);
/// ```
#[derive(Debug)]
pub struct ScriptedClock {
    instants: Vec<NaiveDateTime>,
    index: AtomicUsize,
}

impl ScriptedClock {
    pub fn new(instants: impl IntoIterator<Item = NaiveDateTime>) -> Self {
        Self {
            instants: instants.into_iter().collect(),
            index: AtomicUsize::new(0),
        }
    }

    /// Builds a script from Unix timestamps in milliseconds, rendered in UTC.
    ///
    /// Out-of-range timestamps are skipped.
    pub fn from_millis(millis: impl IntoIterator<Item = i64>) -> Self {
        Self::new(
            millis
                .into_iter()
                .filter_map(DateTime::from_timestamp_millis)
                .map(|instant| instant.naive_utc()),
        )
    }

    /// Restarts the script from its first instant.
    pub fn reset(&self) {
        self.index.store(0, Ordering::SeqCst);
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> NaiveDateTime {
        if self.instants.is_empty() {
            return DateTime::<Utc>::default().naive_utc();
        }
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        self.instants[i % self.instants.len()]
    }
}
