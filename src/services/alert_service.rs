//! Webhook path: convergence gate → dispatcher → pipeline → notifier.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::convergence_gate::ConvergenceGate;
use super::dispatcher::{Dispatcher, Submission};
use super::pipeline::{DiagnosticPipeline, LogObserver};
use crate::domain::models::{new_trace_id, AlertEvent, AlertWebhook};
use crate::domain::ports::{Notification, Notifier};

/// Acknowledgement returned to the alert sender. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookAck {
    /// Firing batch; `dispatched` sessions started, `converged` alerts skipped.
    Accepted { dispatched: usize, converged: usize },
    /// Not firing, or no alerts in the batch.
    Skipped,
}

/// What happened to one alert of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDisposition {
    Dispatched(Submission),
    Converged,
    /// The dispatcher is shutting down; the lock was released again.
    Rejected,
}

#[derive(Clone)]
pub struct AlertService {
    gate: ConvergenceGate,
    dispatcher: Arc<Dispatcher>,
    pipeline: Arc<DiagnosticPipeline>,
    notifier: Arc<dyn Notifier>,
}

impl AlertService {
    pub fn new(
        gate: ConvergenceGate,
        dispatcher: Arc<Dispatcher>,
        pipeline: Arc<DiagnosticPipeline>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gate,
            dispatcher,
            pipeline,
            notifier,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub async fn handle_webhook(&self, webhook: AlertWebhook) -> WebhookAck {
        if !webhook.is_actionable() {
            info!(
                status = ?webhook.status,
                alerts = webhook.alerts.len(),
                "webhook batch not actionable; skipping"
            );
            return WebhookAck::Skipped;
        }

        let mut dispatched = 0;
        let mut converged = 0;
        for alert in webhook.alerts {
            match self.process_alert(alert).await {
                AlertDisposition::Dispatched(_) => dispatched += 1,
                AlertDisposition::Converged => converged += 1,
                AlertDisposition::Rejected => {}
            }
        }
        WebhookAck::Accepted {
            dispatched,
            converged,
        }
    }

    pub async fn process_alert(&self, alert: AlertEvent) -> AlertDisposition {
        let trace_id = new_trace_id();
        let lock_key = alert.lock_key();

        if !self
            .gate
            .try_admit_as(&lock_key, &trace_id, self.gate.ttl())
            .await
        {
            info!(%trace_id, %lock_key, alert = %alert.alert_name(), "alert converged; skipping");
            return AlertDisposition::Converged;
        }

        info!(%trace_id, %lock_key, alert = %alert.alert_name(), "alert admitted");
        let job = run_alert_session(
            Arc::clone(&self.pipeline),
            Arc::clone(&self.notifier),
            self.gate.clone(),
            alert,
            lock_key.clone(),
            trace_id.clone(),
        );

        match self.dispatcher.submit(job).await {
            Ok(submission) => AlertDisposition::Dispatched(submission),
            Err(err) => {
                warn!(%trace_id, %lock_key, error = %err, "alert not dispatched");
                self.gate.release(&lock_key, &trace_id).await;
                AlertDisposition::Rejected
            }
        }
    }
}

async fn run_alert_session(
    pipeline: Arc<DiagnosticPipeline>,
    notifier: Arc<dyn Notifier>,
    gate: ConvergenceGate,
    alert: AlertEvent,
    lock_key: String,
    trace_id: String,
) {
    let mut session = pipeline.alert_session(&alert, trace_id);
    let notification = match pipeline.run(&mut session, &LogObserver).await {
        Ok(report) => Notification::report(alert.alert_name(), &session.trace_id, &report),
        Err(err) => {
            gate.release(&lock_key, &session.trace_id).await;
            Notification::failure(alert.alert_name(), &session.trace_id, &err.to_string())
        }
    };

    if let Err(err) = notifier.send(&notification).await {
        error!(
            trace_id = %session.trace_id,
            error = %err,
            "failed to deliver diagnosis notification"
        );
    }
}

impl std::fmt::Debug for AlertService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertService")
            .field("gate", &self.gate)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
