use std::path::PathBuf;

use structopt::StructOpt;

use cpusched::utils::prelude::*;
use cpusched::workload::WorkloadConfig;
use cpusched::{Algorithm, OutputFormat, SimConfig};

/// Should be implemented by individual subcommand
pub trait Cmd {
    fn run(self) -> Result<()>;
}

/// Show the effective simulation configuration
#[derive(StructOpt)]
pub struct Config {}

impl Cmd for Config {
    fn run(self) -> Result<()> {
        let cfg: SimConfig = config().fetch()?;
        print!("{}", serde_yaml::to_string(&cfg)?);

        Ok(())
    }
}

/// Run the simulation for every selected algorithm and print the reports
#[derive(StructOpt)]
pub struct Run {
    /// Read `<arrival>,<burst>,<priority>` lines from FILE instead of the configured workload, `-` for stdin.
    /// An optional first line gives the process count and an optional last line the quantum
    #[structopt(short, long, parse(from_os_str), value_name = "FILE")]
    input: Option<PathBuf>,

    /// Time quantum for Round Robin, wins over a quantum line in the input
    #[structopt(short, long)]
    quantum: Option<i64>,

    /// Algorithm to run, may be repeated: rr, sjn, npp, pp, srt
    #[structopt(short, long = "algorithm", value_name = "ALGORITHM", number_of_values = 1)]
    algorithms: Vec<Algorithm>,

    /// Report format: text, json or csv
    #[structopt(short, long)]
    format: Option<OutputFormat>,

    /// Also write a chrome://tracing file into the output directory
    #[structopt(long)]
    chrome_trace: bool,
}

impl Run {
    /// command line flags win over the config
    fn apply(self, cfg: &mut SimConfig) {
        if let Some(path) = self.input {
            cfg.workload = WorkloadConfig::File {
                path,
                quantum: cfg.workload.quantum(),
            };
        }
        if self.quantum.is_some() {
            cfg.quantum = self.quantum;
        }
        if !self.algorithms.is_empty() {
            cfg.algorithms = self.algorithms;
        }
        if let Some(format) = self.format {
            cfg.output.format = format;
        }
        cfg.output.chrome_trace |= self.chrome_trace;
    }
}

impl Cmd for Run {
    fn run(self) -> Result<()> {
        let mut cfg: SimConfig = config().fetch()?;
        self.apply(&mut cfg);
        debug!(?cfg, "effective config");

        cpusched::run_sim(&cfg)?;
        Ok(())
    }
}
