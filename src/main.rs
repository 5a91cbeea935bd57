// ABOUTME: Entry point for the orgdeploy CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use orgdeploy::config;
use orgdeploy::error::Result;
use orgdeploy::output::Output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable in JSON mode
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = cli.output_mode();
    let result = run(cli).await;

    if let Err(e) = result {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(cli.output_mode());

    match cli.command {
        Commands::Init {
            target,
            instance_url,
            force,
        } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, target.as_deref(), instance_url.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy(args) => commands::deploy(args, output).await,
        Commands::Report(args) => commands::report(args, output).await,
        Commands::Status { target } => commands::status(target, output).await,
    }
}
