use std::ops::{Add, AddAssign, Sub};

use parse_display::Display;
use serde::{Deserialize, Serialize};

/// A time point in simulation, in whole units since the simulation began
#[derive(Debug, Clone, Copy, Default, PartialOrd, Ord, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{0}")]
#[serde(transparent)]
pub struct Time(pub u64);

/// A duration of time in simulation
#[derive(Debug, Clone, Copy, Default, PartialOrd, Ord, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{0}")]
#[serde(transparent)]
pub struct Duration(pub u64);

/// Process identity, sequential in input order
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("P{0}")]
#[serde(transparent)]
pub struct Pid(pub usize);

/// Lower numeric value means higher priority
pub type Priority = i64;

impl Duration {
    pub const UNIT: Duration = Duration(1);

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Self::Output {
        Time(checked_add(self.0, rhs.0))
    }
}

impl AddAssign<Duration> for Time {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub for Time {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        assert!(self >= rhs, "time went backwards: {} - {}", self, rhs);
        Duration(self.0 - rhs.0)
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Self::Output {
        Duration(checked_add(self.0, rhs.0))
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        assert!(self >= rhs, "negative duration: {} - {}", self, rhs);
        Duration(self.0 - rhs.0)
    }
}

/// Validated workloads never get here, so an overflow is a bug in the caller
fn checked_add(a: u64, b: u64) -> u64 {
    a.checked_add(b)
        .unwrap_or_else(|| panic!("simulated time overflow: {} + {}", a, b))
}

impl std::iter::Sum for Duration {
    fn sum<I: Iterator<Item = Duration>>(iter: I) -> Self {
        iter.fold(Duration::default(), Add::add)
    }
}
