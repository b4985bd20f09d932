//! Implementation of the `triage serve` command.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{presets, Attribute, Cell, Table};
use serde::Serialize;
use tracing::{info, warn};

use super::bootstrap;
use crate::adapters::http::HttpServer;
use crate::cli::output::{output, CommandOutput};
use crate::cli::service::TriageRuntime;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Configuration file (defaults to triage.yaml + triage.local.yaml)
    #[arg(short, long, env = "TRIAGE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ServeOutput {
    pub finished_sessions: usize,
    pub aborted_sessions: usize,
}

impl CommandOutput for ServeOutput {
    fn to_human(&self) -> String {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("In-flight sessions").add_attribute(Attribute::Bold),
            Cell::new("Count").add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("finished"),
            Cell::new(self.finished_sessions),
        ]);
        table.add_row(vec![Cell::new("aborted"), Cell::new(self.aborted_sessions)]);
        format!("Server stopped.\n{table}")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ServeArgs, json_mode: bool) -> Result<()> {
    let (config, _logger) = bootstrap(args.config.as_deref())?;
    let runtime = TriageRuntime::from_config(config).await?;

    let server = HttpServer::new(
        runtime.alerts.clone(),
        runtime.emitter.clone(),
        runtime.config.server.clone(),
    );
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped; draining dispatcher");
    let summary = runtime.dispatcher.shutdown().await;
    output(
        &ServeOutput {
            finished_sessions: summary.finished,
            aborted_sessions: summary.aborted,
        },
        json_mode,
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; shutting down");
        return;
    }
    info!("ctrl-c received; shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rendering() {
        let summary = ServeOutput {
            finished_sessions: 3,
            aborted_sessions: 1,
        };
        let human = summary.to_human();
        assert!(human.starts_with("Server stopped."));
        assert!(human.contains("finished"));
        assert!(human.contains("aborted"));

        let json = summary.to_json();
        assert_eq!(json["finished_sessions"], 3);
        assert_eq!(json["aborted_sessions"], 1);
    }
}
