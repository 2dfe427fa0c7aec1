use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use rand::Rng;
use rand_seeder::{Seeder, SipRng};
use thiserror::Error;

use crate::policy::{Algorithm, Policy};
use crate::process::{Process, ProcessSpec};
use crate::types::{Duration, Pid, Priority, Time};
use crate::utils::prelude::*;

/// Why a batch of process definitions was rejected before any run started
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("the workload has no processes")]
    Empty,
    #[error("P{index} arrives at {arrival}, arrival must be non-negative")]
    NegativeArrival { index: usize, arrival: i64 },
    #[error("P{index} has burst {burst}, burst must be positive")]
    NonPositiveBurst { index: usize, burst: i64 },
    #[error("process at position {index} is labelled {found}, ids must be sequential from 0")]
    UnexpectedId { index: usize, found: i64 },
    #[error("quantum must be positive, got {0}")]
    InvalidQuantum(i64),
    #[error("{0} needs a quantum")]
    MissingQuantum(Algorithm),
    #[error("line {line}: expected `<arrival>,<burst>,<priority>`, got `{content}`")]
    Malformed { line: usize, content: String },
    #[error("input announces {expected} processes but lists {found}")]
    CountMismatch { expected: i64, found: usize },
    #[error("the batch does not fit in the simulated time range")]
    TimeOverflow,
}

/// The canonical, validated input batch.
///
/// Every simulation run takes its own copy of [`Workload::processes`], nothing here is mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    processes: Vec<Process>,
    quantum: Option<Duration>,
}

impl Workload {
    pub fn new<I, S>(specs: I, quantum: Option<i64>) -> std::result::Result<Self, WorkloadError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ProcessSpec>,
    {
        let quantum = match quantum {
            Some(q) if q <= 0 => return Err(WorkloadError::InvalidQuantum(q)),
            Some(q) => Some(Duration(q as u64)),
            None => None,
        };

        let processes = specs
            .into_iter()
            .map(Into::into)
            .enumerate()
            .map(|(index, spec)| validate(index, spec))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if processes.is_empty() {
            return Err(WorkloadError::Empty);
        }
        check_horizon(&processes)?;

        Ok(Self { processes, quantum })
    }

    /// Processes indexed by their id
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn quantum(&self) -> Option<Duration> {
        self.quantum
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Build the policy for the given algorithm, using this workload's quantum for Round Robin
    pub fn policy(&self, algorithm: Algorithm) -> std::result::Result<Policy, WorkloadError> {
        Policy::new(algorithm, self.quantum)
    }
}

fn validate(index: usize, spec: ProcessSpec) -> std::result::Result<Process, WorkloadError> {
    match spec.id {
        Some(found) if found != index as i64 => return Err(WorkloadError::UnexpectedId { index, found }),
        _ => {}
    }
    if spec.arrival < 0 {
        return Err(WorkloadError::NegativeArrival {
            index,
            arrival: spec.arrival,
        });
    }
    if spec.burst <= 0 {
        return Err(WorkloadError::NonPositiveBurst {
            index,
            burst: spec.burst,
        });
    }
    Ok(Process::new(
        Pid(index),
        Time(spec.arrival as u64),
        Duration(spec.burst as u64),
        spec.priority,
    ))
}

/// Every time a run can reach, and the sum of all turnarounds, must fit in a `u64`
fn check_horizon(processes: &[Process]) -> std::result::Result<(), WorkloadError> {
    let last_arrival = processes
        .iter()
        .map(|p| p.arrival.0)
        .max()
        .unwrap_or_default();
    processes
        .iter()
        .try_fold(last_arrival, |end, p| end.checked_add(p.burst.0))
        .and_then(|end| end.checked_mul(processes.len() as u64))
        .map(|_| ())
        .ok_or(WorkloadError::TimeOverflow)
}

/// Process definitions read from a text source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput {
    pub specs: Vec<ProcessSpec>,
    /// Round Robin quantum given on the last line, if any
    pub quantum: Option<i64>,
}

/// Read one `<arrival>,<burst>,<priority>` triple per line.
///
/// The batch may be preceded by a line holding the process count, and followed by a line
/// holding the Round Robin quantum:
///
/// ```text
/// 4
/// 0,5,2
/// 1,3,1
/// 2,8,3
/// 3,6,1
/// 2
/// ```
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_input(reader: impl BufRead) -> Result<ParsedInput> {
    let mut lines = vec![];
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let content = line.trim();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let fields = content
            .split(',')
            .map(|f| f.trim().parse::<i64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| malformed(idx + 1, content))?;
        lines.push((idx + 1, content.to_owned(), fields));
    }

    let mut rest = lines.as_slice();
    let mut count = None;
    let mut quantum = None;
    if let Some(((_, _, fields), tail)) = rest.split_first() {
        if let [n] = fields.as_slice() {
            count = Some(*n);
            rest = tail;
        }
    }
    if let Some(((_, _, fields), init)) = rest.split_last() {
        if let [q] = fields.as_slice() {
            quantum = Some(*q);
            rest = init;
        }
    }

    let specs = rest
        .iter()
        .map(|(line, content, fields)| match fields.as_slice() {
            [arrival, burst, priority] => Ok(ProcessSpec::new(*arrival, *burst, *priority)),
            _ => Err(malformed(*line, content)),
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if let Some(expected) = count {
        if expected != specs.len() as i64 {
            return Err(WorkloadError::CountMismatch {
                expected,
                found: specs.len(),
            }
            .into());
        }
    }

    trace!(count = specs.len(), ?quantum, "parsed process definitions");
    Ok(ParsedInput { specs, quantum })
}

fn malformed(line: usize, content: &str) -> WorkloadError {
    WorkloadError::Malformed {
        line,
        content: content.to_owned(),
    }
}

/// Shape of a randomly generated batch
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct RandomWorkload {
    pub count: usize,
    pub max_arrival: u64,
    pub max_burst: u64,
    pub max_priority: Priority,
}

/// Generate a reproducible batch, the same seed always yields the same processes
pub fn random(seed: &str, shape: &RandomWorkload) -> Vec<ProcessSpec> {
    let mut rng: SipRng = Seeder::from(seed).make_rng();
    (0..shape.count)
        .map(|_| {
            ProcessSpec::new(
                rng.gen_range(0..=shape.max_arrival) as i64,
                rng.gen_range(1..=shape.max_burst.max(1)) as i64,
                rng.gen_range(0..=shape.max_priority.max(0)),
            )
        })
        .collect()
}

/// Where the process batch comes from
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum WorkloadConfig {
    Inline {
        processes: Vec<ProcessSpec>,
        #[serde(default)]
        quantum: Option<i64>,
    },
    /// A text file of triples, `-` for stdin.
    /// A quantum line in the file takes precedence over `quantum`.
    File {
        path: PathBuf,
        #[serde(default)]
        quantum: Option<i64>,
    },
    Random {
        #[serde(default)]
        seed: Option<String>,
        shape: RandomWorkload,
        #[serde(default)]
        quantum: Option<i64>,
    },
}

impl WorkloadConfig {
    pub fn quantum(&self) -> Option<i64> {
        match self {
            WorkloadConfig::Inline { quantum, .. } => *quantum,
            WorkloadConfig::File { quantum, .. } => *quantum,
            WorkloadConfig::Random { quantum, .. } => *quantum,
        }
    }
}

/// Build the workload described by `cfg`. A `quantum` given here wins over every other source.
pub fn from_config(cfg: &WorkloadConfig, quantum: Option<i64>) -> Result<Workload> {
    let (specs, source_quantum) = match cfg {
        WorkloadConfig::Inline { processes, .. } => (processes.clone(), None),
        WorkloadConfig::File { path, .. } if path.as_os_str() == "-" => {
            info!("reading process definitions from stdin");
            let stdin = io::stdin();
            let input = parse_input(stdin.lock())?;
            (input.specs, input.quantum)
        }
        WorkloadConfig::File { path, .. } => {
            info!(path = %path.display(), "reading process definitions");
            let input = parse_input(BufReader::new(File::open(path)?))?;
            (input.specs, input.quantum)
        }
        WorkloadConfig::Random { seed, shape, .. } => {
            let seed = seed.as_deref().unwrap_or("stripy zebra");
            info!(seed, count = shape.count, "generating random workload");
            (random(seed, shape), None)
        }
    };
    let quantum = quantum.or(source_quantum).or_else(|| cfg.quantum());
    Ok(Workload::new(specs, quantum)?)
}
