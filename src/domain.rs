/*! Read-only views of decision variables and the bounds reported back.

The decision process that owns the scheduling variables narrows
their domains step by step. The analysis only ever looks at the
lower and upper end of a domain and at whether it has shrunk to a
single value, which is exactly what [Interval] captures. The
results flow back as [Bound]s.
*/

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A closed range `[min, max]` of values a decision variable may
/// still take. The variable is *decided* once `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval<T> {
    min: T,
    max: T,
}

impl<T: Copy + Ord> Interval<T> {
    /// Construct the range `[min, max]`, where `min <= max`.
    pub fn new(min: T, max: T) -> Self {
        assert!(min <= max, "empty domain");
        Interval { min, max }
    }

    /// A variable that has already been decided.
    pub fn decided(value: T) -> Self {
        Interval {
            min: value,
            max: value,
        }
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn is_decided(&self) -> bool {
        self.min == self.max
    }

    /// The decided value, if any.
    pub fn value(&self) -> Option<T> {
        if self.is_decided() {
            Some(self.min)
        } else {
            None
        }
    }

    /// Apply a monotone function to both ends of the range.
    pub fn map<U: Copy + Ord>(self, f: impl Fn(T) -> U) -> Interval<U> {
        Interval::new(f(self.min), f(self.max))
    }
}

impl<T: Copy + Ord> From<T> for Interval<T> {
    fn from(value: T) -> Self {
        Interval::decided(value)
    }
}

/// What the analysis can promise about a metric (latency or period)
/// given the current state of the decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Bound<T> {
    /// Nothing can be inferred yet.
    Unknown,
    /// Every completion of the remaining decisions yields at least this value.
    AtLeast(T),
    /// All relevant decisions are made; this is the value.
    Exactly(T),
}

impl<T: Copy + Ord> Bound<T> {
    /// The smallest value still admitted by the bound.
    pub fn lower(&self) -> Option<T> {
        match self {
            Bound::Unknown => None,
            Bound::AtLeast(v) | Bound::Exactly(v) => Some(*v),
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Bound::Exactly(_))
    }

    /// Is every value admitted by `self` also admitted by `other`?
    /// This is the order in which bounds tighten from one refinement
    /// step to the next.
    pub fn is_within(&self, other: &Bound<T>) -> bool {
        match (self, other) {
            (_, Bound::Unknown) => true,
            (Bound::Unknown, _) => false,
            (Bound::AtLeast(a), Bound::AtLeast(b)) => a >= b,
            (Bound::Exactly(a), Bound::AtLeast(b)) => a >= b,
            (Bound::AtLeast(_), Bound::Exactly(_)) => false,
            (Bound::Exactly(a), Bound::Exactly(b)) => a == b,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Unknown => write!(f, "unknown"),
            Bound::AtLeast(v) => write!(f, ">= {}", v),
            Bound::Exactly(v) => write!(f, "{}", v),
        }
    }
}
