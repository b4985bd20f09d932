//! A role-parameterized client of the reasoning capability.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::errors::ReasoningError;
use crate::domain::ports::{ReasoningCapability, ReasoningRequest, ToolRegistry};

pub const PLANNER: &str = "Planner";
pub const EXECUTOR: &str = "Executor";
pub const REVIEWER: &str = "Reviewer";

/// One reasoning role: a name, a system prompt and optionally the tools it may use.
#[derive(Clone)]
pub struct Agent {
    role: String,
    system_prompt: String,
    reasoning: Arc<dyn ReasoningCapability>,
    tools: Option<Arc<ToolRegistry>>,
    timeout: Duration,
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        system_prompt: impl Into<String>,
        reasoning: Arc<dyn ReasoningCapability>,
        timeout: Duration,
    ) -> Self {
        Self {
            role: role.into(),
            system_prompt: system_prompt.into(),
            reasoning,
            tools: None,
            timeout,
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Send one prompt, bounded by the configured call timeout.
    pub async fn chat(
        &self,
        prompt: String,
        conversation_id: &str,
    ) -> Result<String, ReasoningError> {
        debug!(role = %self.role, prompt_len = prompt.len(), "agent request");
        let request = ReasoningRequest {
            role: self.role.clone(),
            system_prompt: self.system_prompt.clone(),
            prompt,
            conversation_id: conversation_id.to_string(),
            tools: self.tools.clone(),
        };

        let response = tokio::time::timeout(self.timeout, self.reasoning.invoke(request))
            .await
            .map_err(|_| ReasoningError::Timeout(self.timeout))??;

        info!(
            role = %self.role,
            backend = self.reasoning.name(),
            response_len = response.len(),
            "agent response complete"
        );
        Ok(response)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("role", &self.role)
            .field("backend", &self.reasoning.name())
            .field("tools", &self.tools.as_ref().map(|t| t.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}
