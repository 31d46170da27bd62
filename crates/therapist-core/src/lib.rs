pub mod ai;
pub mod config;
pub mod error;
pub mod persona;
pub mod state;
pub mod transcript;
pub mod turn;

// Re-export main types for convenience
pub use ai::{ChatModel, CompletionRequest, GeminiClient};
pub use config::{Config, Settings};
pub use error::{ConfigError, ProviderError};
pub use state::{ChatMessage, ChatRole};
pub use transcript::{Bubble, Transcript};
pub use turn::{AgentConfig, PendingTurn, TurnHandler};
