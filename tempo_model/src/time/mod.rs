//! Simulation time - the shared clock's units.
//!
//! Time is counted in whole microseconds so that timestamps compare exactly:
//! ten hops of `0.1s` land on precisely `1s`, which matters because mailbox
//! buckets are keyed by timestamp equality.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MILLI: i64 = 1_000;

/// An absolute instant on the simulation clock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SimTime(pub i64);

impl SimTime {
    /// The origin of simulation time.
    pub const ZERO: SimTime = SimTime(0);

    /// Create an instant from whole microseconds.
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Create an instant from whole milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(MICROS_PER_MILLI))
    }

    /// Create an instant from (possibly fractional) seconds, rounded to the microsecond.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(secs_to_micros(secs))
    }

    /// Raw microsecond count.
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Seconds as a float, for display and reporting.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND as f64
    }

    /// The span from `earlier` to `self` (negative if `earlier` is later).
    pub fn since(self, earlier: SimTime) -> SimDuration {
        SimDuration(self.0.saturating_sub(earlier.0))
    }

    /// `self + span`, or `None` past either end of the clock.
    pub fn checked_add(self, span: SimDuration) -> Option<SimTime> {
        self.0.checked_add(span.0).map(SimTime)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={}s", self.as_secs_f64())
    }
}

/// A signed span of simulation time.
///
/// Spans are signed so that a caller-supplied latency or step length of zero
/// or less can be represented and rejected, rather than silently wrapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SimDuration(pub i64);

impl SimDuration {
    /// The empty span.
    pub const ZERO: SimDuration = SimDuration(0);

    /// Create a span from whole microseconds.
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Create a span from whole milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(MICROS_PER_MILLI))
    }

    /// Create a span from whole seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(MICROS_PER_SECOND))
    }

    /// Create a span from (possibly fractional) seconds, rounded to the microsecond.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(secs_to_micros(secs))
    }

    /// Raw microsecond count.
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Seconds as a float, for display and reporting.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND as f64
    }

    /// Whether the span is strictly greater than zero.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for SimDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.as_secs_f64())
    }
}

impl Add<SimDuration> for SimTime {
    type Output = SimTime;

    /// Saturates at the ends of the clock rather than wrapping.
    fn add(self, rhs: SimDuration) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl Sub<SimTime> for SimTime {
    type Output = SimDuration;

    fn sub(self, rhs: SimTime) -> SimDuration {
        self.since(rhs)
    }
}

impl Add for SimDuration {
    type Output = SimDuration;

    fn add(self, rhs: SimDuration) -> SimDuration {
        SimDuration(self.0.saturating_add(rhs.0))
    }
}

fn secs_to_micros(secs: f64) -> i64 {
    // `as` saturates on overflow and maps NaN to zero.
    (secs * MICROS_PER_SECOND as f64).round() as i64
}
