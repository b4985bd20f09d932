//! Diagnosis engine services.

pub mod agent;
pub mod alert_service;
pub mod convergence_gate;
pub mod dispatcher;
pub mod pipeline;
pub mod prompts;
pub mod sanitizer;
pub mod stream_emitter;

pub use agent::Agent;
pub use alert_service::{AlertDisposition, AlertService, WebhookAck};
pub use convergence_gate::ConvergenceGate;
pub use dispatcher::{Dispatcher, ShutdownSummary, Submission};
pub use pipeline::{DiagnosticPipeline, LogObserver, PipelineProgress, ProgressObserver};
pub use prompts::PromptTemplates;
pub use stream_emitter::{EventStream, StreamEmitter};
