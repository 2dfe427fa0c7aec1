use std::cmp::min;
use std::collections::VecDeque;
use std::convert::TryFrom;
use std::str::FromStr;

use parse_display::Display;

use crate::process::Process;
use crate::types::{Duration, Pid};
use crate::utils::prelude::*;
use crate::workload::WorkloadError;

/// The five scheduling disciplines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, serde::Deserialize, serde::Serialize)]
#[display(style = "kebab-case")]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    RoundRobin,
    ShortestJobNext,
    PriorityNonPreemptive,
    PriorityPreemptive,
    ShortestRemainingTime,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::RoundRobin,
        Algorithm::ShortestJobNext,
        Algorithm::PriorityNonPreemptive,
        Algorithm::PriorityPreemptive,
        Algorithm::ShortestRemainingTime,
    ];

    pub fn abbrev(self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "rr",
            Algorithm::ShortestJobNext => "sjn",
            Algorithm::PriorityNonPreemptive => "npp",
            Algorithm::PriorityPreemptive => "pp",
            Algorithm::ShortestRemainingTime => "srt",
        }
    }

    /// Human readable name used in reports
    pub fn title(self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "Round Robin",
            Algorithm::ShortestJobNext => "Shortest Job Next (Non-preemptive SJF)",
            Algorithm::PriorityNonPreemptive => "Non-Preemptive Priority",
            Algorithm::PriorityPreemptive => "Preemptive Priority",
            Algorithm::ShortestRemainingTime => "Shortest Remaining Time (SRT, Preemptive SJF)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown algorithm `{0}`, expected one of rr, sjn, npp, pp, srt or their long names")]
pub struct UnknownAlgorithm(String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase().replace('_', "-");
        Algorithm::ALL
            .iter()
            .copied()
            .find(|a| a.abbrev() == s || a.to_string() == s)
            .ok_or(UnknownAlgorithm(s))
    }
}

impl TryFrom<String> for Algorithm {
    type Error = UnknownAlgorithm;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(a: Algorithm) -> Self {
        a.to_string()
    }
}

/// A ready-selection rule, fully parameterized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Policy {
    #[display("Round Robin (Q={quantum})")]
    RoundRobin { quantum: Duration },
    #[display("Shortest Job Next (Non-preemptive SJF)")]
    ShortestJobNext,
    #[display("Non-Preemptive Priority")]
    PriorityNonPreemptive,
    #[display("Preemptive Priority")]
    PriorityPreemptive,
    #[display("Shortest Remaining Time (SRT, Preemptive SJF)")]
    ShortestRemainingTime,
}

impl Policy {
    pub fn new(algorithm: Algorithm, quantum: Option<Duration>) -> std::result::Result<Self, WorkloadError> {
        Ok(match algorithm {
            Algorithm::RoundRobin => match quantum {
                Some(quantum) if !quantum.is_zero() => Policy::RoundRobin { quantum },
                _ => return Err(WorkloadError::MissingQuantum(algorithm)),
            },
            Algorithm::ShortestJobNext => Policy::ShortestJobNext,
            Algorithm::PriorityNonPreemptive => Policy::PriorityNonPreemptive,
            Algorithm::PriorityPreemptive => Policy::PriorityPreemptive,
            Algorithm::ShortestRemainingTime => Policy::ShortestRemainingTime,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Policy::RoundRobin { .. } => Algorithm::RoundRobin,
            Policy::ShortestJobNext => Algorithm::ShortestJobNext,
            Policy::PriorityNonPreemptive => Algorithm::PriorityNonPreemptive,
            Policy::PriorityPreemptive => Algorithm::PriorityPreemptive,
            Policy::ShortestRemainingTime => Algorithm::ShortestRemainingTime,
        }
    }

    /// Whether a dispatched process always runs until it completes
    pub fn runs_to_completion(&self) -> bool {
        matches!(self, Policy::ShortestJobNext | Policy::PriorityNonPreemptive)
    }
}

/// Chosen process and how long it may run before the next selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub pid: Pid,
    pub quantum: Duration,
}

/// Ready-selection state of one run.
///
/// Round Robin rotates a FIFO queue. The other policies scan the arrived and unfinished
/// processes in arrival order and take the first one at the minimum key, so ties go to
/// the earliest arrival, then the lowest id.
#[derive(Debug)]
pub(crate) struct Scheduler {
    policy: Policy,
    /// FIFO queue for Round Robin, arrival-ordered candidates otherwise
    ready: VecDeque<Pid>,
}

impl Scheduler {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            ready: Default::default(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.ready.is_empty()
    }

    /// A process became eligible to run. Must be called in arrival order.
    pub fn on_arrival(&mut self, pid: Pid) {
        self.ready.push_back(pid);
    }

    /// Pick the next process to run, or `None` when nothing is ready
    pub fn next(&mut self, arena: &[Process]) -> Option<Dispatch> {
        let dispatch = match self.policy {
            Policy::RoundRobin { quantum } => {
                let pid = self.ready.pop_front()?;
                Dispatch {
                    pid,
                    quantum: min(quantum, arena[pid.0].remaining()),
                }
            }
            Policy::ShortestJobNext => to_completion(candidates(&self.ready, arena).min_by_key(|p| p.burst)?),
            Policy::PriorityNonPreemptive => to_completion(candidates(&self.ready, arena).min_by_key(|p| p.priority)?),
            Policy::PriorityPreemptive => one_unit(candidates(&self.ready, arena).min_by_key(|p| p.priority)?),
            Policy::ShortestRemainingTime => one_unit(candidates(&self.ready, arena).min_by_key(|p| p.remaining())?),
        };
        trace!(pid = %dispatch.pid, quantum = %dispatch.quantum, "selected");
        Some(dispatch)
    }

    /// The dispatched process gave up the CPU.
    /// Arrivals during its slice must already have been reported.
    pub fn on_slice_done(&mut self, pid: Pid, finished: bool) {
        match self.policy {
            Policy::RoundRobin { .. } => {
                if !finished {
                    self.ready.push_back(pid);
                }
            }
            _ => {
                if finished {
                    self.ready.retain(|p| *p != pid);
                }
            }
        }
    }
}

fn candidates<'a>(ready: &'a VecDeque<Pid>, arena: &'a [Process]) -> impl Iterator<Item = &'a Process> + 'a {
    ready.iter().map(move |pid| &arena[pid.0])
}

fn to_completion(p: &Process) -> Dispatch {
    Dispatch {
        pid: p.id,
        quantum: p.remaining(),
    }
}

fn one_unit(p: &Process) -> Dispatch {
    Dispatch {
        pid: p.id,
        quantum: Duration::UNIT,
    }
}
