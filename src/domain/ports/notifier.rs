//! Notifier port - report delivery for webhook-triggered sessions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::NotifyError;

/// A titled markdown message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Completed diagnosis report.
    pub fn report(alert_name: &str, trace_id: &str, report: &str) -> Self {
        let title = format!("AI diagnosis report: {alert_name}");
        let body = format!("### {title}\n**TraceID**: `{trace_id}`\n\n{report}");
        Self { title, body }
    }

    /// Session that ended in `Failed`.
    pub fn failure(alert_name: &str, trace_id: &str, reason: &str) -> Self {
        let title = "Diagnosis failed".to_string();
        let body = format!(
            "### {title}: {alert_name}\n**TraceID**: `{trace_id}`\n\nDiagnosis was interrupted: {reason}"
        );
        Self { title, body }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification. Callers log failures and move on.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
