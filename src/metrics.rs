//! Performance metrics of a finished run.
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Turnaround | completion - arrival |
//! | Waiting | turnaround - burst |
//! | Makespan | latest completion |
//! | Utilization | busy time / makespan |

use serde::Serialize;

use crate::process::Process;
use crate::timeline::Timeline;
use crate::types::{Duration, Pid, Priority, Time};

/// Timing facts of one completed process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessMetrics {
    pub id: Pid,
    pub arrival: Time,
    pub burst: Duration,
    pub priority: Priority,
    pub start: Time,
    pub completion: Time,
    pub turnaround: Duration,
    pub waiting: Duration,
}

impl ProcessMetrics {
    fn new(p: &Process) -> Self {
        let (start, completion) = match (p.start(), p.completion()) {
            (Some(start), Some(completion)) => (start, completion),
            _ => panic!("metrics requested before {} completed", p.id),
        };
        assert!(
            p.arrival <= start && start <= completion,
            "{} has arrival {}, start {}, completion {}",
            p.id,
            p.arrival,
            start,
            completion
        );
        let turnaround = completion - p.arrival;
        Self {
            id: p.id,
            arrival: p.arrival,
            burst: p.burst,
            priority: p.priority,
            start,
            completion,
            turnaround,
            waiting: turnaround - p.burst,
        }
    }
}

/// Per-process metrics plus batch aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub processes: Vec<ProcessMetrics>,
    pub total_turnaround: Duration,
    pub total_waiting: Duration,
    pub avg_turnaround: f64,
    pub avg_waiting: f64,
    pub makespan: Time,
    pub idle: Duration,
    /// Fraction of the makespan the CPU was busy (0.0..=1.0)
    pub utilization: f64,
}

impl Metrics {
    /// Every process must have completed, anything else is a bug in the driver.
    pub fn calculate(processes: &[Process], timeline: &Timeline) -> Self {
        assert!(!processes.is_empty(), "metrics of an empty batch");
        let processes: Vec<_> = processes.iter().map(ProcessMetrics::new).collect();

        let total_turnaround: Duration = processes.iter().map(|p| p.turnaround).sum();
        let total_waiting: Duration = processes.iter().map(|p| p.waiting).sum();
        let n = processes.len() as f64;

        let makespan = processes
            .iter()
            .map(|p| p.completion)
            .max()
            .unwrap_or_default();
        assert_eq!(makespan, timeline.end(), "timeline does not end at the last completion");
        let span = (makespan - Time(0)).0;
        let utilization = if span == 0 {
            0.0
        } else {
            timeline.busy_time().0 as f64 / span as f64
        };

        Self {
            total_turnaround,
            total_waiting,
            avg_turnaround: total_turnaround.0 as f64 / n,
            avg_waiting: total_waiting.0 as f64 / n,
            makespan,
            idle: timeline.idle_time(),
            utilization,
            processes,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::timeline::Occupant;

    #[test]
    fn turnaround_and_waiting() {
        let mut a = Process::new(Pid(0), Time(1), Duration(2), 0);
        let mut b = Process::new(Pid(1), Time(1), Duration(3), 0);
        let mut timeline = Timeline::default();
        timeline.record(Occupant::Idle, Time(0), Duration(1));
        a.run_for(Time(1), Duration(2));
        timeline.record(Occupant::Process(a.id), Time(1), Duration(2));
        b.run_for(Time(3), Duration(3));
        timeline.record(Occupant::Process(b.id), Time(3), Duration(3));

        let m = Metrics::calculate(&[a, b], &timeline);
        assert_eq!(m.processes[0].turnaround, Duration(2));
        assert_eq!(m.processes[0].waiting, Duration(0));
        assert_eq!(m.processes[1].start, Time(3));
        assert_eq!(m.processes[1].turnaround, Duration(5));
        assert_eq!(m.processes[1].waiting, Duration(2));
        assert_eq!(m.total_turnaround, Duration(7));
        assert_eq!(m.total_waiting, Duration(2));
        assert_relative_eq!(m.avg_turnaround, 3.5);
        assert_relative_eq!(m.avg_waiting, 1.0);
        assert_eq!(m.makespan, Time(6));
        assert_eq!(m.idle, Duration(1));
        assert_relative_eq!(m.utilization, 5.0 / 6.0);
    }

    #[test]
    #[should_panic(expected = "before P0 completed")]
    fn incomplete_batch_is_a_bug() {
        let p = Process::new(Pid(0), Time(0), Duration(2), 0);
        Metrics::calculate(&[p], &Timeline::default());
    }
}
