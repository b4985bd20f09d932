//! Implementation of the `triage diagnose` command.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::bootstrap;
use crate::cli::service::TriageRuntime;
use crate::domain::models::{StreamEvent, StreamEventKind};

#[derive(Args, Debug)]
pub struct DiagnoseArgs {
    /// Question to investigate
    pub query: String,

    /// Continue an existing conversation
    #[arg(long)]
    pub conversation_id: Option<String>,

    /// Configuration file (defaults to triage.yaml + triage.local.yaml)
    #[arg(short, long, env = "TRIAGE_CONFIG")]
    pub config: Option<PathBuf>,
}

pub async fn execute(args: DiagnoseArgs, json_mode: bool) -> Result<()> {
    let (config, _logger) = bootstrap(args.config.as_deref())?;
    let runtime = TriageRuntime::from_config(config).await?;

    let mut stream = runtime.emitter.start(args.query, args.conversation_id);
    let mut printer = Printer::new(json_mode);
    let mut failed = false;
    while let Some(event) = stream.events.recv().await {
        failed |= event.kind == StreamEventKind::Error;
        printer.print(&event)?;
        if event.is_done() {
            break;
        }
    }
    printer.finish();

    if failed {
        bail!("diagnosis failed (trace id {})", stream.trace_id);
    }
    Ok(())
}

/// Human mode writes content inline so report chunks join up; progress and
/// errors go on their own lines above a spinner on stderr. JSON mode writes
/// one event per line.
struct Printer {
    json: bool,
    mid_line: bool,
    spinner: Option<ProgressBar>,
}

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";

impl Printer {
    fn new(json: bool) -> Self {
        Self {
            json,
            mid_line: false,
            spinner: (!json).then(spinner),
        }
    }

    fn print(&mut self, event: &StreamEvent) -> Result<()> {
        if self.json {
            if event.kind != StreamEventKind::Heartbeat {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{}", serde_json::to_string(event)?)?;
            }
            return Ok(());
        }

        match event.kind {
            StreamEventKind::Content => {
                self.suspended(|out| write!(out, "{}", event.payload))?;
                self.mid_line = true;
            }
            StreamEventKind::ToolLog => {
                self.break_line()?;
                if let Some(spinner) = &self.spinner {
                    spinner.set_message(event.payload.clone());
                }
                self.suspended(|out| writeln!(out, "» {}", event.payload))?;
            }
            StreamEventKind::Error => {
                self.break_line()?;
                self.suspended(|out| writeln!(out, "✗ {}", event.payload))?;
            }
            StreamEventKind::Heartbeat => {
                if let Some(spinner) = &self.spinner {
                    spinner.tick();
                }
            }
            StreamEventKind::Done => self.break_line()?,
        }
        Ok(())
    }

    fn break_line(&mut self) -> Result<()> {
        if self.mid_line {
            self.suspended(|out| writeln!(out))?;
            self.mid_line = false;
        }
        Ok(())
    }

    /// Write to stdout with the spinner hidden.
    fn suspended<F>(&self, write: F) -> Result<()>
    where
        F: FnOnce(&mut std::io::StdoutLock<'static>) -> std::io::Result<()>,
    {
        let run = || -> std::io::Result<()> {
            let mut out = std::io::stdout().lock();
            write(&mut out)?;
            out.flush()
        };
        match &self.spinner {
            Some(spinner) => spinner.suspend(run)?,
            None => run()?,
        }
        Ok(())
    }

    fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        spinner.set_style(style);
    }
    spinner.set_message("Diagnosing...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
