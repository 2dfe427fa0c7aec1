use std::process;

use cpusched::utils;
use cpusched::utils::prelude::*;
use structopt::StructOpt;

mod cli;
mod commands;

fn main() {
    // panic setup should be done early
    utils::panic::setup();

    let args = cli::Cli::from_args();

    if let Err(err) = run(args) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run(args: cli::Cli) -> Result<()> {
    // configuration first, logging is configured from it
    utils::app_config::init(args.config.as_deref(), args.preset.as_deref())?;
    let _guard = utils::logging::setup()?;

    trace!("Start cli execution");

    cli::execute(args)
}
