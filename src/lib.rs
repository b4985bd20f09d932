//! Triage - alert-driven incident diagnosis
//!
//! Triage receives monitoring alerts and operator questions and answers them
//! with a three-role reasoning pipeline: a planner breaks the incident into
//! steps, an executor works through them with read-only tools, and a
//! reviewer turns the transcript into a report.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the ports adapters implement
//! - **Service Layer** (`services`): convergence gate, pipeline, dispatcher, streaming
//! - **Adapters** (`adapters`): lock stores, reasoning backends, notifiers, tools, HTTP
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface and composition root
//!
//! # Example
//!
//! ```ignore
//! use triage::cli::service::TriageRuntime;
//! use triage::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = TriageRuntime::from_config(ConfigLoader::load()?).await?;
//!     let mut stream = runtime.emitter.start("checkout p99 doubled".into(), None);
//!     while let Some(event) = stream.events.recv().await {
//!         println!("{}", event.payload);
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{AlertEvent, AlertWebhook, Config, Session, StreamEvent, StreamEventKind};
pub use services::{AlertService, ConvergenceGate, DiagnosticPipeline, Dispatcher, StreamEmitter};
