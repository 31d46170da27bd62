use crate::error::ProviderError;
use crate::state::ChatMessage;
use async_trait::async_trait;

pub mod gemini;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;

pub use gemini::GeminiClient;
#[cfg(any(test, feature = "test-util"))]
pub use scripted::ScriptedModel;

/// Everything sent to the model for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub instructions: String,
    /// Prior turns; empty unless history forwarding is enabled.
    pub history: Vec<ChatMessage>,
    pub input: String,
}

/// The hosted text-generation service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
