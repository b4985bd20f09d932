//! Composition root: builds the adapters from configuration and wires them
//! into the services.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::lock_store::{MemoryLockStore, RedisLockStore};
use crate::adapters::notifier::{LogNotifier, WebhookNotifier};
use crate::adapters::reasoning::OpenAiReasoning;
use crate::adapters::tools;
use crate::domain::models::config::{Config, LockBackend};
use crate::domain::ports::{LockStore, Notifier, ReasoningCapability};
use crate::services::{
    AlertService, ConvergenceGate, DiagnosticPipeline, Dispatcher, PromptTemplates, StreamEmitter,
};

/// Everything a running service or a one-shot diagnosis needs.
pub struct TriageRuntime {
    pub config: Config,
    pub pipeline: Arc<DiagnosticPipeline>,
    pub dispatcher: Arc<Dispatcher>,
    pub alerts: AlertService,
    pub emitter: StreamEmitter,
}

impl TriageRuntime {
    /// Build the production adapters described by `config`.
    pub async fn from_config(config: Config) -> Result<Self> {
        let reasoning: Arc<dyn ReasoningCapability> = Arc::new(
            OpenAiReasoning::new(&config.reasoning, config.pipeline.call_timeout())
                .context("Failed to create reasoning client")?,
        );

        let store: Arc<dyn LockStore> = match config.lock_store.backend {
            LockBackend::Memory => Arc::new(MemoryLockStore::new()),
            LockBackend::Redis => {
                let url = config
                    .lock_store
                    .redis_url
                    .as_deref()
                    .context("lock_store.redis_url is required for the redis backend")?;
                Arc::new(
                    RedisLockStore::connect(url)
                        .await
                        .context("Failed to connect to the Redis lock store")?,
                )
            }
        };

        let notifier: Arc<dyn Notifier> = match config.notification.webhook_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Arc::new(
                WebhookNotifier::new(&config.notification)
                    .context("Failed to create notification client")?,
            ),
            _ => Arc::new(LogNotifier),
        };

        Self::assemble(config, reasoning, store, notifier)
    }

    /// Wire services around the given adapters.
    pub fn assemble(
        config: Config,
        reasoning: Arc<dyn ReasoningCapability>,
        store: Arc<dyn LockStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let registry = tools::default_registry(&config.tools, &config.pipeline)
            .context("Failed to build tool registry")?;
        info!(
            reasoning = reasoning.name(),
            tools = ?registry.names(),
            backend = ?config.lock_store.backend,
            "assembling triage runtime"
        );

        let pipeline = Arc::new(DiagnosticPipeline::new(
            reasoning,
            Arc::new(registry),
            PromptTemplates::default(),
            &config.pipeline,
        ));
        let dispatcher = Arc::new(Dispatcher::new(&config.dispatcher));
        let gate = ConvergenceGate::new(store, &config.convergence);
        let alerts = AlertService::new(
            gate,
            Arc::clone(&dispatcher),
            Arc::clone(&pipeline),
            notifier,
        );
        let emitter = StreamEmitter::new(Arc::clone(&pipeline), config.stream.clone());

        Ok(Self {
            config,
            pipeline,
            dispatcher,
            alerts,
            emitter,
        })
    }
}
