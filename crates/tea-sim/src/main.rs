use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{margin, optimize, response, sensitivity};

mod commands;
mod manifest;

#[derive(Parser, Debug)]
#[command(name = "tea-sim", about = "Techno-economic experiment orchestration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monte-Carlo sensitivity batch over sampled inputs.
    Sensitivity(sensitivity::SensitivityArgs),
    /// Response-surface grid sweep over 2-3 input variables.
    Response(response::ResponseArgs),
    /// Derivative-free optimization of each declared output.
    Optimize(optimize::OptimizeArgs),
    /// Margin scoring of historical price series across models.
    Margin(margin::MarginArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Sensitivity(args) => sensitivity::run(&args),
        Command::Response(args) => response::run(&args),
        Command::Optimize(args) => optimize::run(&args),
        Command::Margin(args) => margin::run(&args),
    }
}
