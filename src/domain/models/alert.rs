//! Alertmanager webhook payloads and the values derived from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Placeholder used for every lock-key component missing from the labels.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Alert lifecycle status as reported by Alertmanager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

/// Batch delivered by one Alertmanager webhook call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertWebhook {
    /// Top-level status; `None` when the sender used a value we do not know.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<AlertStatus>,
    #[serde(default)]
    pub alerts: Vec<AlertEvent>,
}

impl AlertWebhook {
    /// Only a firing batch with at least one alert triggers diagnosis.
    pub fn is_actionable(&self) -> bool {
        self.status == Some(AlertStatus::Firing) && !self.alerts.is_empty()
    }
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<AlertStatus>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("firing") => Some(AlertStatus::Firing),
        Some("resolved") => Some(AlertStatus::Resolved),
        _ => None,
    })
}

/// A single alert. Immutable once received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<AlertStatus>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub starts_at: Option<String>,
}

impl AlertEvent {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self {
            status: Some(AlertStatus::Firing),
            labels,
            annotations: HashMap::new(),
            starts_at: None,
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn alert_name(&self) -> &str {
        self.label("alertname").unwrap_or("Unknown")
    }

    pub fn instance(&self) -> &str {
        self.label("instance").unwrap_or("Unknown")
    }

    pub fn severity(&self) -> &str {
        self.label("severity").unwrap_or("warning")
    }

    pub fn region(&self) -> &str {
        self.label("region").unwrap_or("Unknown")
    }

    pub fn description(&self) -> &str {
        self.annotations
            .get("description")
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("none")
    }

    /// Convergence key: `tenant:alertName:instance`.
    ///
    /// Annotations are deliberately excluded so that repeated firings with
    /// different description text converge on the same key.
    pub fn lock_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.label("tenant_id").unwrap_or(UNKNOWN_LABEL),
            self.label("alertname").unwrap_or(UNKNOWN_LABEL),
            self.label("instance").unwrap_or(UNKNOWN_LABEL),
        )
    }

    /// Template variables describing this alert to the planner.
    pub fn context_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("alert_name", self.alert_name().to_string()),
            ("instance", self.instance().to_string()),
            ("severity", self.severity().to_string()),
            ("region", self.region().to_string()),
            ("description", self.description().to_string()),
        ]
    }
}
