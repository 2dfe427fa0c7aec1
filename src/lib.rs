//! Discrete-event simulation of classical CPU scheduling disciplines.
//!
//! Every algorithm runs over its own copy of the same batch of processes and yields a
//! [`Timeline`] plus [`Metrics`]. See [`simulate`] and [`simulate_all`].

use std::io;

pub mod config;
pub mod metrics;
pub mod output;
pub mod policy;
pub mod process;
pub mod simulator;
pub mod timeline;
pub mod types;
pub mod utils;
pub mod workload;

pub use crate::config::{OutputFormat, SimConfig};
pub use crate::metrics::{Metrics, ProcessMetrics};
pub use crate::policy::{Algorithm, Policy};
pub use crate::process::{Process, ProcessSpec};
pub use crate::simulator::{simulate, simulate_all, Event, EventKind, RunReport};
pub use crate::timeline::{Occupant, Slice, Timeline};
pub use crate::types::{Duration, Pid, Priority, Time};
pub use crate::workload::{Workload, WorkloadError};

use crate::config::AppConfigExt;
use crate::utils::prelude::*;

/// Load the workload, run every configured algorithm and render the reports to stdout
pub fn run_sim(cfg: &SimConfig) -> Result<Vec<RunReport>> {
    let _g = info_span!("sim").entered();

    let reports = {
        let _g = info_span!("run").entered();
        let workload = workload::from_config(&cfg.workload, cfg.quantum)?;
        info!(
            processes = workload.len(),
            algorithms = cfg.algorithms.len(),
            "workload ready"
        );
        simulate_all(&workload, &cfg.algorithms)?
    };

    {
        let _g = info_span!("output").entered();
        let stdout = io::stdout();
        output::render(cfg.output.format, stdout.lock(), &reports)?;
        if cfg.output.chrome_trace {
            let path = config().output_dir()?.file("trace.json")?;
            output::render_chrome_trace(&path, &reports, cfg)?;
        }
    }

    Ok(reports)
}
