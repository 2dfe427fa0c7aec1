use parse_display::Display;
use serde::Serialize;

use crate::metrics::Metrics;
use crate::policy::{Algorithm, Dispatch, Policy, Scheduler};
use crate::process::Process;
use crate::timeline::{Occupant, Timeline};
use crate::types::{Duration, Pid, Time};
use crate::utils::logging::prelude::*;
use crate::workload::{Workload, WorkloadError};

/// Things that happened during a run, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(tag = "kind")]
pub enum EventKind {
    #[display("{pid} arrives")]
    Arrival { pid: Pid },
    #[display("{pid} dispatched for {quantum}")]
    Dispatch { pid: Pid, quantum: Duration },
    #[display("{pid} preempted")]
    Preempt { pid: Pid },
    #[display("{pid} completes")]
    Complete { pid: Pid },
    #[display("idle until {until}")]
    Idle { until: Time },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[display("@{time} -> {kind}")]
pub struct Event {
    pub time: Time,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub policy: Policy,
    /// Final state of the run's own process copies, indexed by id
    pub processes: Vec<Process>,
    pub timeline: Timeline,
    pub metrics: Metrics,
    pub events: Vec<Event>,
}

/// State of a single run, owns its copy of the batch
struct Simulation {
    time: Time,
    arena: Vec<Process>,
    /// ids sorted by arrival, ties by id
    arrivals: Vec<Pid>,
    admitted: usize,
    finished: usize,
    /// process that held the CPU up to now and is not finished
    running: Option<Pid>,
    scheduler: Scheduler,
    timeline: Timeline,
    events: Vec<Event>,
}

impl Simulation {
    fn new(workload: &Workload, policy: Policy) -> Self {
        let arena = workload.processes().to_vec();
        let mut arrivals: Vec<_> = arena.iter().map(|p| p.id).collect();
        arrivals.sort_by_key(|pid| arena[pid.0].arrival);

        Self {
            time: Time(0),
            arena,
            arrivals,
            admitted: 0,
            finished: 0,
            running: None,
            scheduler: Scheduler::new(policy),
            timeline: Default::default(),
            events: vec![],
        }
    }

    fn is_done(&self) -> bool {
        self.finished == self.arena.len()
    }

    fn post(&mut self, time: Time, kind: EventKind) {
        trace!(%time, %kind, "event");
        self.events.push(Event { time, kind });
    }

    /// hand every process that has arrived by now to the scheduler
    fn admit(&mut self) {
        while let Some(&pid) = self.arrivals.get(self.admitted) {
            let arrival = self.arena[pid.0].arrival;
            if arrival > self.time {
                break;
            }
            self.admitted += 1;
            self.scheduler.on_arrival(pid);
            self.post(arrival, EventKind::Arrival { pid });
        }
    }

    fn next_arrival(&self) -> Option<Time> {
        self.arrivals
            .get(self.admitted)
            .map(|pid| self.arena[pid.0].arrival)
    }

    /// one iteration of the driver loop
    fn step(&mut self) {
        self.admit();
        match self.scheduler.next(&self.arena) {
            Some(dispatch) => self.dispatch(dispatch),
            None => {
                assert!(self.scheduler.is_idle(), "scheduler has ready processes but picked none");
                let until = match self.next_arrival() {
                    Some(t) => t,
                    None => unreachable!("nothing left to arrive but {} processes unfinished", self.arena.len() - self.finished),
                };
                debug!(time = %self.time, %until, "cpu idle");
                self.timeline
                    .record(Occupant::Idle, self.time, until - self.time);
                self.post(self.time, EventKind::Idle { until });
                self.time = until;
            }
        }
    }

    fn dispatch(&mut self, Dispatch { pid, quantum }: Dispatch) {
        let now = self.time;
        debug!(time = %now, %pid, %quantum, "dispatch");
        self.log_dispatch(now, pid, quantum);

        let finished = self.arena[pid.0].run_for(now, quantum);
        self.timeline
            .record(Occupant::Process(pid), now, quantum);
        self.time += quantum;

        if finished {
            self.finished += 1;
            self.running = None;
            self.post(self.time, EventKind::Complete { pid });
        } else {
            self.running = Some(pid);
            // arrivals during the slice queue up ahead of the process giving up the CPU
            self.admit();
        }
        self.scheduler.on_slice_done(pid, finished);
    }

    /// Consecutive slices of the same process show up as one dispatch in the event log
    fn log_dispatch(&mut self, now: Time, pid: Pid, quantum: Duration) {
        match self.running {
            Some(prev) if prev == pid => {
                let last = self.events.iter_mut().rev().find_map(|e| match &mut e.kind {
                    EventKind::Dispatch { pid: last, quantum: q } if *last == pid => Some(q),
                    _ => None,
                });
                match last {
                    Some(q) => *q += quantum,
                    None => unreachable!("{} is running without a dispatch", pid),
                }
            }
            Some(prev) => {
                self.post(now, EventKind::Preempt { pid: prev });
                self.post(now, EventKind::Dispatch { pid, quantum });
            }
            None => self.post(now, EventKind::Dispatch { pid, quantum }),
        }
    }

    fn run(&mut self) {
        while !self.is_done() {
            self.step();
        }
    }

    fn into_report(self, policy: Policy) -> RunReport {
        let metrics = Metrics::calculate(&self.arena, &self.timeline);
        RunReport {
            policy,
            processes: self.arena,
            timeline: self.timeline,
            metrics,
            events: self.events,
        }
    }
}

/// Run one policy over its own copy of the workload
pub fn simulate(workload: &Workload, policy: Policy) -> RunReport {
    let _g = info_span!("run", %policy).entered();

    let mut sim = Simulation::new(workload, policy);
    sim.run();
    let report = sim.into_report(policy);

    info!(
        makespan = %report.metrics.makespan,
        avg_turnaround = report.metrics.avg_turnaround,
        avg_waiting = report.metrics.avg_waiting,
        "run finished"
    );
    report
}

/// Run every requested algorithm independently, in the given order.
/// All policies are validated before the first run starts.
pub fn simulate_all(
    workload: &Workload,
    algorithms: &[Algorithm],
) -> std::result::Result<Vec<RunReport>, WorkloadError> {
    let policies = algorithms
        .iter()
        .map(|a| workload.policy(*a))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(policies
        .into_iter()
        .map(|policy| simulate(workload, policy))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessSpec;

    fn workload(triples: &[(i64, i64, i64)], quantum: Option<i64>) -> Workload {
        Workload::new(triples.iter().copied().map(ProcessSpec::from), quantum).unwrap()
    }

    /// P0(0,5,2), P1(1,3,1), P2(2,8,3), P3(3,6,1)
    fn textbook() -> Workload {
        workload(&[(0, 5, 2), (1, 3, 1), (2, 8, 3), (3, 6, 1)], Some(2))
    }

    fn run(w: &Workload, algorithm: Algorithm) -> RunReport {
        simulate(w, w.policy(algorithm).unwrap())
    }

    fn gantt(report: &RunReport) -> Vec<(Option<usize>, u64)> {
        report
            .timeline
            .slices()
            .iter()
            .map(|s| (Option::<Pid>::from(s.occupant).map(|p| p.0), s.duration.0))
            .collect()
    }

    /// (start, completion, turnaround, waiting) per process
    fn facts(report: &RunReport) -> Vec<(u64, u64, u64, u64)> {
        report
            .metrics
            .processes
            .iter()
            .map(|p| (p.start.0, p.completion.0, p.turnaround.0, p.waiting.0))
            .collect()
    }

    fn completion_order(report: &RunReport) -> Vec<usize> {
        report
            .events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Complete { pid } => Some(pid.0),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn round_robin_textbook() {
        let r = run(&textbook(), Algorithm::RoundRobin);
        assert_eq!(
            gantt(&r),
            vec![
                (Some(0), 2),
                (Some(1), 2),
                (Some(2), 2),
                (Some(0), 2),
                (Some(3), 2),
                (Some(1), 1),
                (Some(2), 2),
                (Some(0), 1),
                (Some(3), 2),
                (Some(2), 2),
                (Some(3), 2),
                (Some(2), 2),
            ]
        );
        assert_eq!(completion_order(&r), vec![1, 0, 3, 2]);
        assert_eq!(
            facts(&r),
            vec![(0, 14, 14, 9), (2, 11, 10, 7), (4, 22, 20, 12), (8, 20, 17, 11)]
        );
        assert_eq!(r.metrics.total_turnaround, Duration(61));
        assert_eq!(r.metrics.total_waiting, Duration(39));
    }

    #[test]
    fn round_robin_unit_quantum() {
        let w = workload(&[(0, 5, 2), (1, 3, 1), (2, 8, 3), (3, 6, 1)], Some(1));
        let r = run(&w, Algorithm::RoundRobin);
        assert_eq!(completion_order(&r), vec![1, 0, 3, 2]);
        assert_eq!(
            facts(&r),
            vec![(0, 14, 14, 9), (1, 9, 8, 5), (3, 22, 20, 12), (5, 20, 17, 11)]
        );
    }

    #[test]
    fn shortest_job_next_textbook() {
        let r = run(&textbook(), Algorithm::ShortestJobNext);
        assert_eq!(gantt(&r), vec![(Some(0), 5), (Some(1), 3), (Some(3), 6), (Some(2), 8)]);
        assert_eq!(
            facts(&r),
            vec![(0, 5, 5, 0), (5, 8, 7, 4), (14, 22, 20, 12), (8, 14, 11, 5)]
        );
        assert_eq!(r.metrics.total_waiting, Duration(21));
    }

    #[test]
    fn non_preemptive_priority_only_ranks_arrived() {
        let r = run(&textbook(), Algorithm::PriorityNonPreemptive);
        // P0 is the only candidate at t=0 even though P1 and P3 outrank it
        assert_eq!(gantt(&r), vec![(Some(0), 5), (Some(1), 3), (Some(3), 6), (Some(2), 8)]);
        assert_eq!(r.metrics.total_turnaround, Duration(43));
    }

    #[test]
    fn preemptive_priority_textbook() {
        let r = run(&textbook(), Algorithm::PriorityPreemptive);
        assert_eq!(
            gantt(&r),
            vec![(Some(0), 1), (Some(1), 3), (Some(3), 6), (Some(0), 4), (Some(2), 8)]
        );
        assert_eq!(
            facts(&r),
            vec![(0, 14, 14, 9), (1, 4, 3, 0), (14, 22, 20, 12), (4, 10, 7, 1)]
        );
        assert_eq!(r.metrics.total_waiting, Duration(22));
    }

    #[test]
    fn shortest_remaining_time_textbook() {
        let r = run(&textbook(), Algorithm::ShortestRemainingTime);
        assert_eq!(
            gantt(&r),
            vec![(Some(0), 1), (Some(1), 3), (Some(0), 4), (Some(3), 6), (Some(2), 8)]
        );
        assert_eq!(
            facts(&r),
            vec![(0, 8, 8, 3), (1, 4, 3, 0), (14, 22, 20, 12), (8, 14, 11, 5)]
        );
        assert_eq!(r.metrics.total_turnaround, Duration(42));
        assert_eq!(r.metrics.total_waiting, Duration(20));
    }

    #[test]
    fn idle_gaps_are_recorded() {
        let w = workload(&[(2, 3, 1), (10, 2, 0), (4, 1, 5)], Some(2));

        let r = run(&w, Algorithm::RoundRobin);
        assert_eq!(
            gantt(&r),
            vec![(None, 2), (Some(0), 2), (Some(2), 1), (Some(0), 1), (None, 4), (Some(1), 2)]
        );
        assert_eq!(facts(&r), vec![(2, 6, 4, 1), (10, 12, 2, 0), (4, 5, 1, 0)]);
        assert_eq!(r.metrics.idle, Duration(6));

        for algorithm in &Algorithm::ALL[1..] {
            let r = run(&w, *algorithm);
            assert_eq!(
                gantt(&r),
                vec![(None, 2), (Some(0), 3), (Some(2), 1), (None, 4), (Some(1), 2)],
                "{}",
                algorithm
            );
            assert_eq!(r.metrics.makespan, Time(12));
        }
    }

    #[test]
    fn simultaneous_arrivals_tie_by_id() {
        let w = workload(&[(0, 4, 1), (0, 4, 1), (0, 2, 1)], Some(2));

        let r = run(&w, Algorithm::ShortestRemainingTime);
        assert_eq!(gantt(&r), vec![(Some(2), 2), (Some(0), 4), (Some(1), 4)]);

        let r = run(&w, Algorithm::PriorityPreemptive);
        assert_eq!(gantt(&r), vec![(Some(0), 4), (Some(1), 4), (Some(2), 2)]);
    }

    #[test]
    fn event_log() {
        let r = run(&textbook(), Algorithm::PriorityPreemptive);
        let events: Vec<_> = r.events.iter().map(ToString::to_string).collect();
        assert_eq!(
            &events[..6],
            &[
                "@0 -> P0 arrives",
                "@0 -> P0 dispatched for 1",
                "@1 -> P1 arrives",
                "@1 -> P0 preempted",
                "@1 -> P1 dispatched for 3",
                "@2 -> P2 arrives",
            ]
        );
        assert_eq!(r.events.last().unwrap().to_string(), "@22 -> P2 completes");
    }

    #[test]
    fn runs_are_independent() {
        let w = textbook();
        let reports = simulate_all(&w, &Algorithm::ALL).unwrap();
        assert_eq!(reports.len(), 5);
        // the canonical batch is untouched
        assert!(w.processes().iter().all(|p| p.start().is_none() && p.remaining() == p.burst));
        for (report, algorithm) in reports.iter().zip(Algorithm::ALL.iter()) {
            assert_eq!(report.policy.algorithm(), *algorithm);
            assert!(report.processes.iter().all(Process::is_finished));
        }

        let again = simulate_all(&w, &Algorithm::ALL).unwrap();
        for (a, b) in reports.iter().zip(again.iter()) {
            assert_eq!(a.timeline, b.timeline);
            assert_eq!(a.metrics, b.metrics);
            assert_eq!(a.events, b.events);
        }
    }

    #[test]
    fn missing_quantum_fails_before_any_run() {
        let w = workload(&[(0, 1, 0)], None);
        assert_eq!(
            simulate_all(&w, &[Algorithm::ShortestJobNext, Algorithm::RoundRobin]).unwrap_err(),
            WorkloadError::MissingQuantum(Algorithm::RoundRobin)
        );
    }

    #[test]
    fn runs_at_the_edge_of_the_time_range() {
        let w = workload(&[(i64::MAX, 1, 0)], Some(2));
        for report in simulate_all(&w, &Algorithm::ALL).unwrap() {
            assert_eq!(report.metrics.makespan, Time(1 << 63));
            assert_eq!(report.metrics.idle, Duration(i64::MAX as u64));
            assert_eq!(report.metrics.total_waiting, Duration(0));
        }
    }
}
