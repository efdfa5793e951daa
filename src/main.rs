use autosort::cli::{Cli, run};
use autosort::config::Config;
use autosort::logging;
use autosort::output::OutputFormatter;
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::error(&format!("Error loading configuration: {e}"));
            return ExitCode::FAILURE;
        }
    };
    logging::init_with_config(&config.logging);

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
