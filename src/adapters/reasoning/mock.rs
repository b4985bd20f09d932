//! Scripted reasoning backend for tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::ReasoningError;
use crate::domain::ports::{ReasoningCapability, ReasoningRequest};

/// How a scripted call fails.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Transport(String),
    Status(u16),
    Protocol(String),
}

impl MockFailure {
    fn to_error(&self) -> ReasoningError {
        match self {
            Self::Transport(msg) => ReasoningError::Transport(msg.clone()),
            Self::Status(status) => ReasoningError::Status {
                status: *status,
                body: "scripted failure".to_string(),
            },
            Self::Protocol(msg) => ReasoningError::Protocol(msg.clone()),
        }
    }
}

/// Mock response configuration.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Output text
    pub output: String,
    /// Fail instead of answering
    pub failure: Option<MockFailure>,
    /// Simulated latency before answering
    pub delay: Option<Duration>,
    /// Tools to call through the request's registry before answering
    pub tool_calls: Vec<(String, Value)>,
    /// Never answer
    pub hang: bool,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            output: "Mock response.".to_string(),
            failure: None,
            delay: None,
            tool_calls: Vec::new(),
            hang: false,
        }
    }
}

impl MockResponse {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn failure(failure: MockFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Default::default()
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_tool_call(mut self, name: impl Into<String>, args: Value) -> Self {
        self.tool_calls.push((name.into(), args));
        self
    }
}

/// A call the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub role: String,
    pub prompt: String,
    pub conversation_id: String,
    pub had_tools: bool,
    /// Text returned by each scripted tool call, in order.
    pub tool_results: Vec<String>,
}

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<MockResponse>>,
    defaults: HashMap<String, MockResponse>,
}

/// Reasoning backend answering from per-role scripts.
///
/// Each role has a FIFO of responses; once it is empty the role's default is
/// used, and without a default a generic success.
#[derive(Default)]
pub struct ScriptedReasoning {
    script: Mutex<Script>,
    calls: Mutex<Vec<RecordedCall>>,
    active: Arc<AtomicUsize>,
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next call made by `role`.
    #[must_use]
    pub fn with_response(self, role: &str, response: MockResponse) -> Self {
        self.push_response(role, response);
        self
    }

    /// Response for `role` once its queue is exhausted.
    #[must_use]
    pub fn with_default(self, role: &str, response: MockResponse) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.defaults.insert(role.to_string(), response);
        }
        self
    }

    pub fn push_response(&self, role: &str, response: MockResponse) {
        if let Ok(mut script) = self.script.lock() {
            script
                .queued
                .entry(role.to_string())
                .or_default()
                .push_back(response);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_for(&self, role: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.role == role)
            .collect()
    }

    /// Calls that have started but not yet returned or been dropped.
    pub fn active_calls(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn next_response(&self, role: &str) -> MockResponse {
        let Ok(mut script) = self.script.lock() else {
            return MockResponse::default();
        };
        if let Some(response) = script.queued.get_mut(role).and_then(VecDeque::pop_front) {
            return response;
        }
        script.defaults.get(role).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningCapability for ScriptedReasoning {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn invoke(&self, request: ReasoningRequest) -> Result<String, ReasoningError> {
        self.active.fetch_add(1, Ordering::SeqCst);
        let _guard = ActiveGuard(Arc::clone(&self.active));

        let response = self.next_response(&request.role);

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }
        if response.hang {
            std::future::pending::<()>().await;
        }

        let mut tool_results = Vec::new();
        if let Some(tools) = &request.tools {
            for (name, args) in &response.tool_calls {
                tool_results.push(tools.invoke(name, args.clone()).await.into_text());
            }
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                role: request.role.clone(),
                prompt: request.prompt.clone(),
                conversation_id: request.conversation_id.clone(),
                had_tools: request.tools.is_some(),
                tool_results,
            });
        }

        match response.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(response.output),
        }
    }
}
