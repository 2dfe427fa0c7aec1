use std::path::PathBuf;

use structopt::StructOpt;

use crate::commands::{self, Cmd};
use cpusched::utils::prelude::*;

#[derive(StructOpt)]
#[structopt(about = "Simulate classical CPU scheduling disciplines over a batch of processes")]
pub struct Cli {
    /// Set a custom config file
    #[structopt(short, long, parse(from_os_str), value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Apply a preset defined in the config under `presets.<NAME>`
    #[structopt(short, long, value_name = "NAME")]
    pub preset: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    Config(commands::Config),
    Run(commands::Run),
}

/// Match commands
pub fn execute(cli: Cli) -> Result<()> {
    match cli.cmd {
        Command::Config(cmd) => cmd.run(),
        Command::Run(cmd) => cmd.run(),
    }
}
