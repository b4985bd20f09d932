pub mod alert;
pub mod config;
pub mod plan;
pub mod session;
pub mod stream;

pub use alert::{AlertEvent, AlertStatus, AlertWebhook};
pub use config::{
    Config, ConvergenceConfig, DispatcherConfig, LockBackend, LockStoreConfig, LoggingConfig,
    NotificationConfig, PipelineConfig, ReasoningConfig, ServerConfig, StreamConfig, ToolsConfig,
};
pub use plan::Plan;
pub use session::{
    new_trace_id, ExecutionRecord, Session, SessionOrigin, SessionPhase, Transcript,
};
pub use stream::{StreamEvent, StreamEventKind};
