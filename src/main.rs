use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use rsm_cli::cli::{Cli, Command};
use rsm_cli::commands;
use rsm_cli::logging::{self, Log, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    let command_name = match &args.command {
        Command::Init(_) => "init",
        Command::Install(_) => "install",
        Command::Remove(_) => "remove",
        Command::Version => "version",
    };
    logging::init_subscriber(args.verbose, command_name);
    let log: Arc<dyn Log> = Arc::new(Logger::new());

    match args.command {
        Command::Init(opts) => commands::init::run(&args.global, &opts, log.as_ref()),
        Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
        Command::Remove(opts) => commands::remove::run(&args.global, &opts, &log),
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
