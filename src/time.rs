/*! The discrete time model.

All timing parameters (execution times, transfer times, latencies)
are integral multiples of some platform-specific base unit. Two
newtypes keep *intervals* and *points in time* apart: a [Duration]
measures the length of an activity or of the gap between two events,
an [Instant] is a reading of the simulation clock.
*/

use std::ops::{Add, AddAssign, Sub};

use derive_more::{Add, Display, From};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The underlying representation of time values.
pub type Time = u64;

/// The length of an interval, e.g., the execution time of an actor
/// or the distance between two consecutive completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Add, From, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Duration(Time);

impl Duration {
    /// An interval of length zero.
    pub const fn zero() -> Self {
        Duration(0)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

/// A point in time on the clock of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, From, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instant(Time);

impl Instant {
    /// The start of every forward simulation.
    pub const fn zero() -> Self {
        Instant(0)
    }

    /// Move the clock backwards, stopping at time zero.
    pub fn saturating_sub(self, delta: Duration) -> Instant {
        Instant(self.0.saturating_sub(delta.0))
    }

    /// Move the clock backwards, or return `None` if that would
    /// cross time zero.
    pub fn checked_sub(self, delta: Duration) -> Option<Instant> {
        self.0.checked_sub(delta.0).map(Instant)
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, delta: Duration) -> Instant {
        Instant(self.0 + delta.0)
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, delta: Duration) {
        self.0 += delta.0
    }
}

impl Sub<Instant> for Instant {
    type Output = Duration;

    /// The distance between two points in time; `self` must not
    /// precede `earlier`.
    fn sub(self, earlier: Instant) -> Duration {
        Duration(self.0 - earlier.0)
    }
}
