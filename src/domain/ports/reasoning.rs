//! Reasoning port - interface for the text-generation capability.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::tool::ToolRegistry;
use crate::domain::errors::ReasoningError;

/// One call into the reasoning capability.
#[derive(Clone)]
pub struct ReasoningRequest {
    /// Role name, used only for logging.
    pub role: String,
    pub system_prompt: String,
    pub prompt: String,
    pub conversation_id: String,
    /// Tools the capability may call before answering.
    pub tools: Option<Arc<ToolRegistry>>,
}

impl std::fmt::Debug for ReasoningRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningRequest")
            .field("role", &self.role)
            .field("conversation_id", &self.conversation_id)
            .field("prompt_len", &self.prompt.len())
            .field("tools", &self.tools.as_ref().map(|t| t.names()))
            .finish()
    }
}

/// Trait for reasoning backends.
///
/// Implementations run any tool calls internally and only return the final
/// text. Tool failures must already be folded into that text by the
/// [`ToolRegistry`]; an `Err` here means the call itself failed.
#[async_trait]
pub trait ReasoningCapability: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    async fn invoke(&self, request: ReasoningRequest) -> Result<String, ReasoningError>;

    /// Streaming variant yielding text fragments as they are produced.
    ///
    /// The default yields the complete `invoke` result as a single fragment.
    async fn invoke_streaming(
        &self,
        request: ReasoningRequest,
    ) -> Result<mpsc::Receiver<String>, ReasoningError> {
        let text = self.invoke(request).await?;
        let (tx, rx) = mpsc::channel(1);
        // Receiver is still held here, so the send cannot fail.
        let _ = tx.send(text).await;
        Ok(rx)
    }
}
