use serde::{Deserialize, Serialize};

/// Kind tag of an interactive stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    /// User-facing text (acknowledgement, step results, report chunks).
    Content,
    /// Progress notes about planning and tool work.
    ToolLog,
    /// Keeps idle long-lived connections open.
    Heartbeat,
    /// Human-readable fatal failure; always followed by `Done`.
    Error,
    /// Terminal event, emitted exactly once per stream.
    Done,
}

impl StreamEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::ToolLog => "tool_log",
            Self::Heartbeat => "heartbeat",
            Self::Error => "error",
            Self::Done => "done",
        }
    }
}

/// One event delivered to an interactive caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    #[serde(rename = "answer")]
    pub payload: String,
    #[serde(rename = "type")]
    pub kind: StreamEventKind,
}

impl StreamEvent {
    pub fn new(kind: StreamEventKind, conversation_id: &str, payload: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            payload: payload.into(),
            kind,
        }
    }

    pub fn is_done(&self) -> bool {
        self.kind == StreamEventKind::Done
    }
}
