//! OpenAI-compatible chat-completions backend with a tool-calling loop.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::errors::ReasoningError;
use crate::domain::models::config::ReasoningConfig;
use crate::domain::ports::{ReasoningCapability, ReasoningRequest, ToolSpec};
use crate::infrastructure::logging::secret_scrubbing::scrub;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool_result(call_id: &str, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(call_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments as produced by the model.
    #[serde(default)]
    pub arguments: String,
}

fn default_tool_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize)]
struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a ToolSpec,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Reasoning backend for any `/chat/completions` endpoint (DashScope
/// compatible mode, OpenAI, vLLM, Ollama).
pub struct OpenAiReasoning {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tool_rounds: u32,
}

impl OpenAiReasoning {
    /// `request_timeout` bounds each HTTP round trip; the whole call including
    /// tool rounds is bounded by the caller.
    pub fn new(
        config: &ReasoningConfig,
        request_timeout: Duration,
    ) -> Result<Self, ReasoningError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ReasoningError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
            temperature: config.temperature,
            max_tool_rounds: config.max_tool_rounds,
        })
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatMessage, ReasoningError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            tools: tools
                .iter()
                .map(|spec| ToolDefinition {
                    tool_type: "function",
                    function: spec,
                })
                .collect(),
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                endpoint = %scrub(&self.endpoint),
                status = status.as_u16(),
                body = %scrub(&body),
                "reasoning request rejected"
            );
            return Err(ReasoningError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Protocol(format!("invalid response body: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ReasoningError::Protocol("response contained no choices".to_string()))
    }
}

#[async_trait]
impl ReasoningCapability for OpenAiReasoning {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn invoke(&self, request: ReasoningRequest) -> Result<String, ReasoningError> {
        let specs = request
            .tools
            .as_ref()
            .map(|registry| registry.specs())
            .unwrap_or_default();
        let mut messages = vec![
            ChatMessage::text("system", request.system_prompt.as_str()),
            ChatMessage::text("user", request.prompt.as_str()),
        ];

        for round in 0..=self.max_tool_rounds {
            let message = self.complete(&messages, &specs).await?;
            let calls = message.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                return Ok(message.content.unwrap_or_default());
            }
            if round == self.max_tool_rounds {
                break;
            }
            let Some(registry) = request.tools.as_ref() else {
                return Err(ReasoningError::Protocol(
                    "model requested tools but none were offered".to_string(),
                ));
            };

            debug!(
                role = %request.role,
                conversation_id = %request.conversation_id,
                round,
                calls = calls.len(),
                "executing tool calls"
            );
            messages.push(message);
            for call in &calls {
                let result = match serde_json::from_str::<Value>(&call.function.arguments) {
                    Ok(args) => registry.invoke(&call.function.name, args).await.into_text(),
                    Err(err) if call.function.arguments.trim().is_empty() => {
                        debug!(error = %err, "empty tool arguments; passing an empty object");
                        registry
                            .invoke(&call.function.name, Value::Object(Default::default()))
                            .await
                            .into_text()
                    }
                    Err(err) => format!(
                        "Tool '{}' was called with invalid JSON arguments: {err}",
                        call.function.name
                    ),
                };
                messages.push(ChatMessage::tool_result(&call.id, result));
            }
        }

        Err(ReasoningError::ToolRoundsExceeded(self.max_tool_rounds))
    }
}
