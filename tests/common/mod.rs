//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test utilities used across
//! multiple integration test files.

#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use triage::adapters::lock_store::MemoryLockStore;
use triage::adapters::reasoning::{MockResponse, ScriptedReasoning};
use triage::cli::service::TriageRuntime;
use triage::domain::errors::NotifyError;
use triage::domain::models::Config;
use triage::domain::ports::{Notification, Notifier};
use triage::services::agent::{EXECUTOR, PLANNER, REVIEWER};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Poll an async condition every 10ms until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(mut predicate: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait until `notifier` recorded exactly `count` notifications.
pub async fn wait_for_notifications(notifier: &Arc<RecordingNotifier>, count: usize) -> bool {
    wait_until(
        || {
            let notifier = Arc::clone(notifier);
            async move { notifier.sent().len() == count }
        },
        WAIT_TIMEOUT,
    )
    .await
}

/// Wait until `reasoning` has exactly `count` calls in progress.
pub async fn wait_for_active_calls(reasoning: &Arc<ScriptedReasoning>, count: usize) -> bool {
    wait_until(
        || {
            let reasoning = Arc::clone(reasoning);
            async move { reasoning.active_calls() == count }
        },
        WAIT_TIMEOUT,
    )
    .await
}

/// Wait until no live lock is stored under `key`.
pub async fn wait_for_release(store: &Arc<MemoryLockStore>, key: &str) -> bool {
    wait_until(
        || {
            let store = Arc::clone(store);
            let key = key.to_string();
            async move { !store.contains(&key).await }
        },
        WAIT_TIMEOUT,
    )
    .await
}

/// Configuration tuned for tests: no chunk delay, small pool, short timeouts.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.stream.chunk_delay_ms = 0;
    config.stream.chunk_size = 10;
    config.stream.heartbeat_interval_secs = 3600;
    config.dispatcher.pool_size = 2;
    config.dispatcher.queue_depth = 4;
    config.dispatcher.shutdown_timeout_secs = 5;
    config.pipeline.call_timeout_secs = 5;
    config.pipeline.tool_timeout_secs = 2;
    config
}

/// Reasoning mock answering a two-step plan, a canned step result and a
/// fenced report.
pub fn happy_reasoning() -> ScriptedReasoning {
    ScriptedReasoning::new()
        .with_default(
            PLANNER,
            MockResponse::success(
                json!(["Check CPU usage", "Check error logs"]).to_string(),
            ),
        )
        .with_default(EXECUTOR, MockResponse::success("nothing unusual"))
        .with_default(
            REVIEWER,
            MockResponse::success("```markdown\n# Diagnosis\nAll good.\n```"),
        )
}

/// Notifier that remembers everything it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    reject: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send is recorded and then reported as rejected.
    pub fn rejecting() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.reject {
            return Err(NotifyError::Rejected {
                status: 500,
                body: "robot offline".to_string(),
            });
        }
        Ok(())
    }
}

/// Handles a test keeps onto while exercising a runtime.
pub struct Harness {
    pub runtime: TriageRuntime,
    pub reasoning: Arc<ScriptedReasoning>,
    pub store: Arc<MemoryLockStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(config: Config, reasoning: ScriptedReasoning) -> Harness {
    harness_with_notifier(config, reasoning, RecordingNotifier::new())
}

pub fn harness_with_notifier(
    config: Config,
    reasoning: ScriptedReasoning,
    notifier: RecordingNotifier,
) -> Harness {
    let reasoning = Arc::new(reasoning);
    let store = Arc::new(MemoryLockStore::new());
    let notifier = Arc::new(notifier);
    let runtime = TriageRuntime::assemble(
        config,
        reasoning.clone(),
        store.clone(),
        notifier.clone(),
    )
    .expect("Failed to assemble runtime");
    Harness {
        runtime,
        reasoning,
        store,
        notifier,
    }
}
