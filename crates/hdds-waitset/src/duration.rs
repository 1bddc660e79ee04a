// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Signed nanosecond duration used for wait timeouts.
//!
//! The sign carries the timeout convention used by [`crate::WaitSet::wait`]:
//!
//! - negative: wait indefinitely
//! - zero: poll once without blocking
//! - positive: bounded wait
//!
//! All arithmetic is checked and reports [`Error::Overflow`],
//! [`Error::Underflow`] or [`Error::NonFiniteScale`] instead of wrapping.

use crate::error::{Error, Result};
use std::fmt;
use std::time::Instant;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// `2^63` as f64, the first value that no longer fits in `i64`.
const I64_LIMIT_F64: f64 = 9_223_372_036_854_775_808.0;

/// Signed duration with nanosecond resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    nanoseconds: i64,
}

impl Duration {
    /// Zero duration (non-blocking poll when used as a timeout).
    pub const ZERO: Duration = Duration { nanoseconds: 0 };

    /// Canonical "wait forever" timeout.
    pub const INFINITE: Duration = Duration { nanoseconds: -1 };

    /// Build from a seconds / nanoseconds pair (message layout).
    #[must_use]
    pub const fn new(seconds: i32, nanoseconds: u32) -> Self {
        // i32::MAX * 1e9 + u32::MAX stays well inside i64.
        Self {
            nanoseconds: seconds as i64 * NANOS_PER_SEC + nanoseconds as i64,
        }
    }

    #[must_use]
    pub const fn from_nanoseconds(nanoseconds: i64) -> Self {
        Self { nanoseconds }
    }

    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self {
            nanoseconds: millis.saturating_mul(1_000_000),
        }
    }

    /// Build from floating point seconds.
    pub fn from_seconds(seconds: f64) -> Result<Self> {
        if !seconds.is_finite() {
            return Err(Error::NonFiniteScale(seconds));
        }
        Self::from_f64_nanos(seconds * NANOS_PER_SEC as f64, "from_seconds")
    }

    /// Convert a `std::time::Duration`, which is always non-negative.
    pub fn from_std(duration: std::time::Duration) -> Result<Self> {
        i64::try_from(duration.as_nanos())
            .map(Self::from_nanoseconds)
            .map_err(|_| Error::Overflow("std duration does not fit in i64 nanoseconds"))
    }

    /// Largest representable duration.
    #[must_use]
    pub const fn max() -> Self {
        Self {
            nanoseconds: i64::MAX,
        }
    }

    #[must_use]
    pub const fn nanoseconds(&self) -> i64 {
        self.nanoseconds
    }

    #[must_use]
    pub fn seconds(&self) -> f64 {
        self.nanoseconds as f64 / NANOS_PER_SEC as f64
    }

    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.nanoseconds < 0
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.nanoseconds == 0
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Duration) -> Result<Duration> {
        match self.nanoseconds.checked_add(rhs.nanoseconds) {
            Some(nanoseconds) => Ok(Self { nanoseconds }),
            None if rhs.nanoseconds > 0 => Err(Error::Overflow("addition leads to i64 overflow")),
            None => Err(Error::Underflow("addition leads to i64 underflow")),
        }
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Duration) -> Result<Duration> {
        match self.nanoseconds.checked_sub(rhs.nanoseconds) {
            Some(nanoseconds) => Ok(Self { nanoseconds }),
            None if rhs.nanoseconds < 0 => {
                Err(Error::Overflow("subtraction leads to i64 overflow"))
            }
            None => Err(Error::Underflow("subtraction leads to i64 underflow")),
        }
    }

    /// Checked scaling by a floating point factor.
    pub fn checked_scale(self, scale: f64) -> Result<Duration> {
        if !scale.is_finite() {
            return Err(Error::NonFiniteScale(scale));
        }
        Self::from_f64_nanos(self.nanoseconds as f64 * scale, "scaling")
    }

    /// Split into `(seconds, nanoseconds)` with `0 <= nanoseconds < 1e9`.
    pub fn to_parts(&self) -> Result<(i32, u32)> {
        let seconds = self.nanoseconds.div_euclid(NANOS_PER_SEC);
        let nanos = self.nanoseconds.rem_euclid(NANOS_PER_SEC);
        let seconds = i32::try_from(seconds).map_err(|_| {
            if seconds > 0 {
                Error::Overflow("seconds do not fit in i32")
            } else {
                Error::Underflow("seconds do not fit in i32")
            }
        })?;
        // rem_euclid keeps nanos in [0, 1e9)
        Ok((seconds, nanos as u32))
    }

    /// Non-negative durations as `std::time::Duration`, `None` for infinite.
    #[must_use]
    pub fn to_std(&self) -> Option<std::time::Duration> {
        u64::try_from(self.nanoseconds)
            .ok()
            .map(std::time::Duration::from_nanos)
    }

    /// Absolute deadline for a wait starting at `now`; `None` waits forever.
    pub(crate) fn deadline_from(&self, now: Instant) -> Option<Instant> {
        // Deadlines past the clock's range behave like an infinite wait.
        self.to_std().and_then(|budget| now.checked_add(budget))
    }

    /// Budget left until `deadline`, clamped to zero.
    pub(crate) fn remaining_until(deadline: Option<Instant>, now: Instant) -> Duration {
        match deadline {
            None => Self::INFINITE,
            Some(deadline) => {
                let left = deadline.saturating_duration_since(now);
                Self::from_std(left).unwrap_or(Self::max())
            }
        }
    }

    fn from_f64_nanos(nanos: f64, what: &'static str) -> Result<Duration> {
        if nanos >= I64_LIMIT_F64 {
            log::debug!("[duration] {} overflow ({} ns)", what, nanos);
            return Err(Error::Overflow("duration scaling leads to i64 overflow"));
        }
        if nanos < -I64_LIMIT_F64 {
            log::debug!("[duration] {} underflow ({} ns)", what, nanos);
            return Err(Error::Underflow("duration scaling leads to i64 underflow"));
        }
        Ok(Self {
            nanoseconds: nanos as i64,
        })
    }
}

impl TryFrom<std::time::Duration> for Duration {
    type Error = Error;

    fn try_from(value: std::time::Duration) -> Result<Self> {
        Self::from_std(value)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "infinite ({} ns)", self.nanoseconds)
        } else {
            write!(f, "{:.9}s", self.seconds())
        }
    }
}
