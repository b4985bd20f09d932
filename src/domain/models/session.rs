//! Diagnosis session state: phase machine, transcript and identity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::AlertEvent;
use super::plan::Plan;
use crate::domain::errors::{DomainError, DomainResult};

/// Pipeline phase of a session.
///
/// ```text
/// Planning → Executing → Reviewing → Completed
///     ↘          ↘           ↘
///                 Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Planning,
    Executing,
    Reviewing,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Reviewing => "reviewing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Valid transitions from this phase. Strictly forward, no retry-in-place.
    pub fn valid_transitions(&self) -> Vec<SessionPhase> {
        match self {
            Self::Planning => vec![Self::Executing, Self::Failed],
            Self::Executing => vec![Self::Reviewing, Self::Failed],
            Self::Reviewing => vec![Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one executed plan step. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Zero-based position in the plan.
    pub index: usize,
    pub step: String,
    pub result: String,
    pub recorded_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// One-based step number as shown to the model and to users.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn render(&self) -> String {
        format!(
            "**Step {}**: {}\n> Result: {}\n\n",
            self.number(),
            self.step,
            self.result
        )
    }
}

/// Append-only record of step results within a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    records: Vec<ExecutionRecord>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next record. The index is assigned here so indices are
    /// always strictly increasing and gap-free.
    pub fn append(
        &mut self,
        step: impl Into<String>,
        result: impl Into<String>,
    ) -> &ExecutionRecord {
        let index = self.records.len();
        self.records.push(ExecutionRecord {
            index,
            step: step.into(),
            result: result.into(),
            recorded_at: Utc::now(),
        });
        &self.records[index]
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn render(&self) -> String {
        self.records.iter().map(ExecutionRecord::render).collect()
    }
}

/// What started the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionOrigin {
    Alert { alert: AlertEvent },
    Query { query: String },
}

impl SessionOrigin {
    pub fn label(&self) -> &str {
        match self {
            Self::Alert { alert } => alert.alert_name(),
            Self::Query { .. } => "interactive query",
        }
    }
}

/// Short opaque id correlating log lines and the final report.
pub fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// One Plan→Execute→Review run, owned by exactly one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub trace_id: String,
    pub conversation_id: String,
    pub origin: SessionOrigin,
    /// Rendered situation context, immutable for the session.
    pub context: String,
    pub plan: Option<Plan>,
    pub transcript: Transcript,
    phase: SessionPhase,
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        trace_id: String,
        conversation_id: String,
        origin: SessionOrigin,
        context: String,
    ) -> Self {
        Self {
            trace_id,
            conversation_id,
            origin,
            context,
            plan: None,
            transcript: Transcript::new(),
            phase: SessionPhase::Planning,
            failure: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Conversation id used for webhook-triggered sessions.
    pub fn alert_conversation_id(trace_id: &str) -> String {
        format!("AUTO-{}-{}", trace_id, Utc::now().format("%Y-%m-%d"))
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn advance(&mut self, next: SessionPhase) -> DomainResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
                reason: "session phases only move forward".to_string(),
            });
        }
        self.phase = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Move to `Failed` from any non-terminal phase, remembering why.
    pub fn fail(&mut self, reason: impl Into<String>) -> DomainResult<()> {
        self.advance(SessionPhase::Failed)?;
        self.failure = Some(reason.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            new_trace_id(),
            "conv-1".to_string(),
            SessionOrigin::Query {
                query: "why is checkout slow".to_string(),
            },
            "ctx".to_string(),
        )
    }

    #[test]
    fn test_forward_transitions() {
        let mut s = session();
        assert_eq!(s.phase(), SessionPhase::Planning);
        s.advance(SessionPhase::Executing).unwrap();
        s.advance(SessionPhase::Reviewing).unwrap();
        s.advance(SessionPhase::Completed).unwrap();
        assert!(s.finished_at.is_some());
    }

    #[test]
    fn test_no_backward_or_skip_transitions() {
        let mut s = session();
        assert!(s.advance(SessionPhase::Reviewing).is_err());
        s.advance(SessionPhase::Executing).unwrap();
        assert!(matches!(
            s.advance(SessionPhase::Planning),
            Err(DomainError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_fail_from_any_active_phase() {
        for phases in [
            vec![],
            vec![SessionPhase::Executing],
            vec![SessionPhase::Executing, SessionPhase::Reviewing],
        ] {
            let mut s = session();
            for p in phases {
                s.advance(p).unwrap();
            }
            s.fail("boom").unwrap();
            assert_eq!(s.phase(), SessionPhase::Failed);
            assert_eq!(s.failure.as_deref(), Some("boom"));
            assert!(s.fail("again").is_err());
        }
    }

    #[test]
    fn test_transcript_indices_and_rendering() {
        let mut t = Transcript::new();
        t.append("check cpu", "cpu at 95%");
        t.append("check logs", "OOM at 12:01");
        let indices: Vec<usize> = t.records().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(
            t.render(),
            "**Step 1**: check cpu\n> Result: cpu at 95%\n\n**Step 2**: check logs\n> Result: OOM at 12:01\n\n"
        );
    }

    #[test]
    fn test_trace_id_shape() {
        let id = new_trace_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_alert_conversation_id() {
        let id = Session::alert_conversation_id("abcd1234");
        assert!(id.starts_with("AUTO-abcd1234-"));
    }
}
