//! Domain errors for the triage diagnosis engine.

use std::time::Duration;

use thiserror::Error;

/// Domain-level errors that end a diagnosis session.
///
/// Only faults that abort a session live here. Tool failures and step-level
/// reasoning failures are absorbed as text inside the transcript, and a
/// convergence skip is a plain `false` from the gate.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Planner produced no usable steps")]
    PlanEmpty,

    #[error("Planning failed: {0}")]
    PlanFailed(#[source] ReasoningError),

    #[error("Reasoning service unreachable for all {0} plan steps")]
    ExecutionUnavailable(usize),

    #[error("Review failed: {0}")]
    ReviewFailed(#[source] ReasoningError),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Lock store error: {0}")]
    LockStore(#[from] LockStoreError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Failures of a single call into the reasoning capability.
#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("Reasoning call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Reasoning service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed reasoning response: {0}")]
    Protocol(String),

    #[error("Tool-call loop exceeded {0} rounds")]
    ToolRoundsExceeded(u32),
}

impl ReasoningError {
    /// Returns true if the failure happened below the application protocol
    /// (network, timeout, upstream 5xx).
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Protocol(_) | Self::ToolRoundsExceeded(_) => false,
        }
    }
}

impl From<reqwest::Error> for ReasoningError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors raised by a tool implementation. Never crosses the tool registry.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Tool not configured: {0}")]
    NotConfigured(String),
}

/// Errors from the shared lock store backing the convergence gate.
#[derive(Debug, Error)]
pub enum LockStoreError {
    #[error("Lock store connection failed: {0}")]
    Connection(String),

    #[error("Lock store command failed: {0}")]
    Command(String),
}

impl From<redis::RedisError> for LockStoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            Self::Connection(err.to_string())
        } else {
            Self::Command(err.to_string())
        }
    }
}

/// Errors from the notification sink. Logged, never fatal.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notification endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Errors from submitting work to the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatcher is shutting down")]
    ShuttingDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(ReasoningError::Timeout(Duration::from_secs(5)).is_transport());
        assert!(ReasoningError::Transport("reset".to_string()).is_transport());
        assert!(ReasoningError::Status {
            status: 503,
            body: String::new()
        }
        .is_transport());
        assert!(!ReasoningError::Status {
            status: 400,
            body: String::new()
        }
        .is_transport());
        assert!(!ReasoningError::Protocol("no choices".to_string()).is_transport());
    }

    #[test]
    fn test_plan_failed_message_includes_cause() {
        let err = DomainError::PlanFailed(ReasoningError::Timeout(Duration::from_secs(30)));
        assert_eq!(
            err.to_string(),
            "Planning failed: Reasoning call timed out after 30s"
        );
    }
}
