use clap::Parser;
use datedir::cli::{Cli, log_directive, run_cli};
use datedir::output::OutputFormatter;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run_cli(cli) {
        Ok(true) => ExitCode::SUCCESS,
        // Finished, but some files, copies or directories were left behind.
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            OutputFormatter::error(&e);
            ExitCode::from(2)
        }
    }
}
