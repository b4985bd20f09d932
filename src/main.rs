//! Triage CLI entry point.

use clap::Parser;

use triage::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => triage::cli::commands::serve::execute(args, cli.json).await,
        Commands::Diagnose(args) => triage::cli::commands::diagnose::execute(args, cli.json).await,
        Commands::Config(args) => triage::cli::commands::config::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        triage::cli::handle_error(err, cli.json);
    }
}
