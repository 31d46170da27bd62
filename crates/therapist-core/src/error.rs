use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal problems found before the chat becomes usable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set. Please define it in your .env file.")]
    MissingApiKey { var: &'static str },

    #[error("failed to read settings file {}: {source}", .path.display())]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {}: {source}", .path.display())]
    InvalidSettings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// A failed call to the model collaborator. Recoverable: the session goes on.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to the model provider failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("the model provider did not answer within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("the model provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response from the model provider: {0}")]
    Decode(String),

    #[error("the model provider returned an empty reply")]
    EmptyReply,

    #[error("the reply task stopped before finishing: {0}")]
    Interrupted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_message_names_variable() {
        let err = ConfigError::MissingApiKey {
            var: "GEMINI_API_KEY",
        };
        assert_eq!(
            err.to_string(),
            "GEMINI_API_KEY is not set. Please define it in your .env file."
        );
    }

    #[test]
    fn test_status_message_includes_body() {
        let err = ProviderError::Status {
            status: 429,
            body: "quota exceeded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "the model provider returned 429: quota exceeded"
        );
    }
}
