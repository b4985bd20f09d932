//! Tools offered to the executor role.

pub mod datetime;
pub mod prometheus;

use std::sync::Arc;

use crate::domain::errors::ToolError;
use crate::domain::models::config::{PipelineConfig, ToolsConfig};
use crate::domain::ports::ToolRegistry;

pub use datetime::DateTimeTool;
pub use prometheus::PrometheusTool;

/// The registry used by the service: every built-in tool, guarded by the
/// pipeline's tool timeout.
pub fn default_registry(
    tools: &ToolsConfig,
    pipeline: &PipelineConfig,
) -> Result<ToolRegistry, ToolError> {
    Ok(ToolRegistry::new(pipeline.tool_timeout())
        .with(Arc::new(DateTimeTool))
        .with(Arc::new(PrometheusTool::new(tools)?)))
}
