//! CLI type definitions

use clap::{Parser, Subcommand};

use super::commands::config::ConfigArgs;
use super::commands::diagnose::DiagnoseArgs;
use super::commands::serve::ServeArgs;

#[derive(Parser, Debug)]
#[command(name = "triage")]
#[command(about = "Triage - alert-driven incident diagnosis", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service (alert webhook + troubleshooting stream)
    Serve(ServeArgs),

    /// Run one interactive diagnosis and print its event stream
    Diagnose(DiagnoseArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}
