use clap::Parser;
use sortdir::cli::{Cli, run_cli};
use sortdir::logging::init_logger;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    ExitCode::from(run_cli(&cli))
}
