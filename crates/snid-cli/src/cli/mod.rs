mod commands;
mod helpers;

use clap::Parser;
use snid_core::SnidError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let normalized = error.as_snid_error();
            eprintln!("{}", normalized.diagnostic_line());
            normalized.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "snid-rs", about = "SNID supernova classification orchestration")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run the classifier on one spectrum and persist the result
    Run(commands::RunArgs),
    /// Fan independent runs out over many spectra
    Batch(commands::BatchArgs),
    /// Filter the ranked matches of a persisted run
    Results(commands::ResultsArgs),
    /// Show the best match per type of a persisted run
    Best(commands::BestArgs),
    /// Render an overlay plot from a persisted run
    Plot(commands::PlotArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_run_command(args),
        CliCommand::Batch(args) => commands::run_batch_command(args),
        CliCommand::Results(args) => commands::run_results_command(args),
        CliCommand::Best(args) => commands::run_best_command(args),
        CliCommand::Plot(args) => commands::run_plot_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(SnidError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_snid_error(&self) -> SnidError {
        match self {
            Self::Usage(message) => SnidError::usage("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => SnidError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
