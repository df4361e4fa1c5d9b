//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;

use crate::config::Config;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    crate::logging::init(cli.verbose, cli.json_logs || config.json_logs, !cli.no_color)?;

    // Determine output format
    let output_format = cli.output.or(config.output_format).unwrap_or_default();

    // Create context for commands
    let ctx = commands::Context {
        config,
        output_format,
        no_color: cli.no_color,
    };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Run(args) => commands::run::execute(ctx, args).await,
        Commands::Once(args) => commands::once::execute(ctx, args).await,
        Commands::List(args) => commands::list::execute(ctx, args).await,
    }
}
