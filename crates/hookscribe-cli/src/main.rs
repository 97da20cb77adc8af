use anyhow::Result;
use clap::{error::ErrorKind, Parser};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;

use hookscribe_cli::{
    cli::{Cli, Commands},
    commands, logging,
};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // The event path must exit 0 even when invoked with arguments we do not understand
        Err(err) if invoked_as_log() && !shows_help(err.kind()) => {
            let event_type = std::env::args().nth(2);
            run_log(event_type.as_deref(), None);
            return ExitCode::SUCCESS;
        }
        Err(err) => err.exit(),
    };

    if let Commands::Log { event_type } = &cli.command {
        run_log(event_type.as_deref(), cli.config.as_deref());
        return ExitCode::SUCCESS;
    }

    logging::init_stderr(cli.level());
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn invoked_as_log() -> bool {
    std::env::args().nth(1).as_deref() == Some("log")
}

fn shows_help(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

fn run_log(event_type: Option<&str>, config: Option<&std::path::Path>) {
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        commands::log::execute(event_type, config);
    }));
}

fn run(cli: Cli) -> Result<()> {
    let config: Option<PathBuf> = cli.config;
    let config = config.as_deref();

    match cli.command {
        Commands::Log { .. } => Ok(()),
        Commands::Install(args) => commands::install::install(args),
        Commands::Clear(args) => commands::install::clear(args),
        Commands::Query(args) => commands::query::execute(args, config),
        Commands::Prune { older_than } => commands::prune::execute(&older_than, config),
        Commands::Stats { format } => commands::stats::execute(format, config),
    }
}
