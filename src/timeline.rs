use std::iter;

use parse_display::Display;
use serde::Serialize;

use crate::types::{Duration, Pid, Time};

/// Who held the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(into = "Option<Pid>")]
pub enum Occupant {
    #[display("{0}")]
    Process(Pid),
    #[display("--")]
    Idle,
}

impl From<Occupant> for Option<Pid> {
    fn from(o: Occupant) -> Self {
        match o {
            Occupant::Process(pid) => Some(pid),
            Occupant::Idle => None,
        }
    }
}

/// A contiguous stretch of simulated time held by one occupant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slice {
    #[serde(rename = "pid")]
    pub occupant: Occupant,
    pub start: Time,
    pub duration: Duration,
}

impl Slice {
    pub fn end(&self) -> Time {
        self.start + self.duration
    }
}

/// The Gantt sequence of one run.
///
/// Slices are kept sorted by start and cover `[0, end)` without gaps or overlaps. Idle stretches
/// are explicit slices. Adjacent slices of the same occupant are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    slices: Vec<Slice>,
}

impl Timeline {
    /// Append `duration` units held by `occupant`, starting exactly where the timeline ends
    pub fn record(&mut self, occupant: Occupant, start: Time, duration: Duration) {
        assert_eq!(start, self.end(), "timeline slices must be contiguous");
        if duration.is_zero() {
            return;
        }
        match self.slices.last_mut() {
            Some(last) if last.occupant == occupant => last.duration += duration,
            _ => self.slices.push(Slice {
                occupant,
                start,
                duration,
            }),
        }
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Time at which the last slice ends, i.e. the makespan of a finished run
    pub fn end(&self) -> Time {
        self.slices
            .last()
            .map(Slice::end)
            .unwrap_or_default()
    }

    /// One occupant per simulated unit, from time 0
    pub fn units(&self) -> impl Iterator<Item = Occupant> + '_ {
        self.slices
            .iter()
            .flat_map(|s| iter::repeat(s.occupant).take(s.duration.0 as usize))
    }

    /// Total time attributed to `pid`
    pub fn time_of(&self, pid: Pid) -> Duration {
        self.slices
            .iter()
            .filter(|s| s.occupant == Occupant::Process(pid))
            .map(|s| s.duration)
            .sum()
    }

    pub fn idle_time(&self) -> Duration {
        self.slices
            .iter()
            .filter(|s| s.occupant == Occupant::Idle)
            .map(|s| s.duration)
            .sum()
    }

    pub fn busy_time(&self) -> Duration {
        (self.end() - Time(0)) - self.idle_time()
    }
}
