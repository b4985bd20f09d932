//! Tool port and the registry that guards every tool invocation.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::errors::ToolError;

/// Name, description and JSON parameter schema a tool advertises.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A narrow capability the reasoning service may call mid-step.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    async fn call(&self, args: Value) -> Result<String, ToolError>;
}

/// Result of a guarded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    /// Descriptive text for a failure the model can read and react to.
    Failed(String),
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Success(text) | Self::Failed(text) => text,
        }
    }
}

/// Explicit name → tool mapping built once at startup.
///
/// `invoke` never returns an error: unknown names, tool errors, timeouts and
/// panics are all converted into [`ToolOutcome::Failed`] text.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            tools: BTreeMap::new(),
            timeout,
        }
    }

    /// Register a tool under its advertised name, replacing any previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.spec().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "tool registered twice; keeping the latest");
        }
        self
    }

    #[must_use]
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn invoke(&self, name: &str, args: Value) -> ToolOutcome {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "model requested unknown tool");
            return ToolOutcome::Failed(format!(
                "Tool '{name}' does not exist. Available tools: {}",
                self.names().join(", ")
            ));
        };

        let call = AssertUnwindSafe(tool.call(args)).catch_unwind();
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(Ok(text))) => {
                debug!(tool = %name, bytes = text.len(), "tool call succeeded");
                ToolOutcome::Success(text)
            }
            Ok(Ok(Err(err))) => {
                warn!(tool = %name, error = %err, "tool call failed");
                ToolOutcome::Failed(format!("Tool '{name}' failed: {err}"))
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                warn!(tool = %name, panic = %message, "tool panicked");
                ToolOutcome::Failed(format!("Tool '{name}' crashed: {message}"))
            }
            Err(_) => {
                warn!(tool = %name, timeout_secs = self.timeout.as_secs(), "tool call timed out");
                ToolOutcome::Failed(format!(
                    "Tool '{name}' timed out after {}s",
                    self.timeout.as_secs()
                ))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo".to_string(),
                description: "Echo the input".to_string(),
                parameters: json!({"type": "object"}),
            }
        }

        async fn call(&self, args: Value) -> Result<String, ToolError> {
            match args.get("text").and_then(Value::as_str) {
                Some(text) => Ok(text.to_string()),
                None => Err(ToolError::InvalidArguments("missing 'text'".to_string())),
            }
        }
    }

    struct Panics;

    #[async_trait]
    impl Tool for Panics {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "panics".to_string(),
                description: String::new(),
                parameters: json!({}),
            }
        }

        async fn call(&self, _args: Value) -> Result<String, ToolError> {
            panic!("index out of bounds");
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "slow".to_string(),
                description: String::new(),
                parameters: json!({}),
            }
        }

        async fn call(&self, _args: Value) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Duration::from_secs(5))
            .with(Arc::new(Echo))
            .with(Arc::new(Panics))
            .with(Arc::new(Slow))
    }

    #[tokio::test]
    async fn test_success() {
        let outcome = registry().invoke("echo", json!({"text": "hi"})).await;
        assert_eq!(outcome, ToolOutcome::Success("hi".to_string()));
    }

    #[tokio::test]
    async fn test_tool_error_becomes_text() {
        let outcome = registry().invoke("echo", json!({})).await;
        assert!(!outcome.is_success());
        assert!(outcome.into_text().contains("missing 'text'"));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_text() {
        let outcome = registry().invoke("nope", json!({})).await;
        let text = outcome.into_text();
        assert!(text.contains("does not exist"));
        assert!(text.contains("echo"));
    }

    #[tokio::test]
    async fn test_panic_becomes_text() {
        let outcome = registry().invoke("panics", json!({})).await;
        assert_eq!(
            outcome,
            ToolOutcome::Failed("Tool 'panics' crashed: index out of bounds".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_text() {
        let outcome = registry().invoke("slow", json!({})).await;
        assert_eq!(
            outcome,
            ToolOutcome::Failed("Tool 'slow' timed out after 5s".to_string())
        );
    }

    #[test]
    fn test_specs_sorted_by_name() {
        let names: Vec<String> = registry().specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["echo", "panics", "slow"]);
    }
}
