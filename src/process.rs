use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Duration, Pid, Priority, Time};

/// Raw process definition as supplied by the user, not yet validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Optional explicit id, must match the position in the batch if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub arrival: i64,
    pub burst: i64,
    pub priority: Priority,
}

impl ProcessSpec {
    pub fn new(arrival: i64, burst: i64, priority: Priority) -> Self {
        Self {
            id: None,
            arrival,
            burst,
            priority,
        }
    }
}

impl From<(i64, i64, Priority)> for ProcessSpec {
    fn from((arrival, burst, priority): (i64, i64, Priority)) -> Self {
        Self::new(arrival, burst, priority)
    }
}

/// A process in one simulation run.
///
/// The input facts never change. `remaining`, `start` and `completion` are owned by the run
/// that holds this copy, and are only ever touched through [`Process::run_for`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pub id: Pid,
    pub arrival: Time,
    pub burst: Duration,
    pub priority: Priority,

    remaining: Duration,
    start: Option<Time>,
    completion: Option<Time>,
}

impl Process {
    pub(crate) fn new(id: Pid, arrival: Time, burst: Duration, priority: Priority) -> Self {
        assert!(!burst.is_zero(), "{} has an empty burst", id);
        Self {
            id,
            arrival,
            burst,
            priority,
            remaining: burst,
            start: None,
            completion: None,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn start(&self) -> Option<Time> {
        self.start
    }

    pub fn completion(&self) -> Option<Time> {
        self.completion
    }

    pub fn has_arrived(&self, now: Time) -> bool {
        self.arrival <= now
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_some()
    }

    /// Run the process on the CPU from `now` for `quantum` units.
    /// Returns true if this completed the process.
    pub(crate) fn run_for(&mut self, now: Time, quantum: Duration) -> bool {
        assert!(self.has_arrived(now), "{} dispatched at {} before arrival {}", self.id, now, self.arrival);
        assert!(!self.is_finished(), "{} dispatched after completion", self.id);
        assert!(
            !quantum.is_zero() && quantum <= self.remaining,
            "{} dispatched for {} with {} remaining",
            self.id,
            quantum,
            self.remaining
        );

        self.start.get_or_insert(now);
        self.remaining = self.remaining - quantum;
        if self.remaining.is_zero() {
            self.completion = Some(now + quantum);
            true
        } else {
            false
        }
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(@{}, {}/{}, prio {})",
            self.id, self.arrival, self.remaining, self.burst, self.priority
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc() -> Process {
        Process::new(Pid(0), Time(2), Duration(3), 1)
    }

    #[test]
    fn start_is_set_once() {
        let mut p = proc();
        assert!(!p.run_for(Time(4), Duration(1)));
        assert!(!p.run_for(Time(7), Duration(1)));
        assert_eq!(p.start(), Some(Time(4)));
        assert_eq!(p.remaining(), Duration(1));
        assert_eq!(p.completion(), None);
    }

    #[test]
    fn completes_when_remaining_hits_zero() {
        let mut p = proc();
        assert!(p.run_for(Time(2), Duration(3)));
        assert_eq!(p.completion(), Some(Time(5)));
        assert!(p.is_finished());
    }

    #[test]
    #[should_panic(expected = "before arrival")]
    fn dispatch_before_arrival_is_a_bug() {
        proc().run_for(Time(1), Duration(1));
    }

    #[test]
    #[should_panic(expected = "after completion")]
    fn dispatch_after_completion_is_a_bug() {
        let mut p = proc();
        p.run_for(Time(2), Duration(3));
        p.run_for(Time(5), Duration(1));
    }
}
