use super::{ChatModel, CompletionRequest};
use crate::config::Config;
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionReply,
}

#[derive(Deserialize)]
struct CompletionReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

/// Gemini through its OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ConfigError::Client)?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(&config.api_key, &config.base_url, config.timeout)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => ProviderError::Timeout(timeout),
            _ => ProviderError::Transport(err),
        }
    }
}

/// System instructions first, then any forwarded history, then the new input.
fn build_messages(request: &CompletionRequest) -> Vec<CompletionMessage<'_>> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(CompletionMessage {
        role: "system",
        content: &request.instructions,
    });
    messages.extend(request.history.iter().map(|m| CompletionMessage {
        role: m.role().as_str(),
        content: m.content(),
    }));
    messages.push(CompletionMessage {
        role: "user",
        content: &request.input,
    });
    messages
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = CompletionBody {
            model: &request.model,
            messages: build_messages(request),
        };
        tracing::debug!(
            model = %request.model,
            history = request.history.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let parsed: CompletionResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatMessage;
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Stub {
        status: StatusCode,
        reply: String,
        delay: Duration,
        seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn completions(
        State(stub): State<Stub>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, String) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        stub.seen.lock().unwrap().push((auth, body));
        tokio::time::sleep(stub.delay).await;
        (stub.status, stub.reply.clone())
    }

    /// Serve a fake chat-completions endpoint on an ephemeral port.
    async fn spawn_stub(stub: Stub) -> String {
        let app = Router::new()
            .route("/v1/chat/completions", post(completions))
            .with_state(stub);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1/", addr)
    }

    fn stub(status: StatusCode, reply: Value) -> Stub {
        Stub {
            status,
            reply: reply.to_string(),
            delay: Duration::ZERO,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn request(history: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest {
            model: "gemini-2.0-flash".to_string(),
            instructions: "Be kind.".to_string(),
            history,
            input: "I feel anxious today".to_string(),
        }
    }

    fn reply_body(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[tokio::test]
    async fn test_sends_instructions_and_input() {
        let stub = stub(StatusCode::OK, reply_body("Tell me more."));
        let seen = stub.seen.clone();
        let base_url = spawn_stub(stub).await;
        let client = GeminiClient::new("key-123", &base_url, Some(Duration::from_secs(5))).unwrap();

        let reply = client.complete(&request(Vec::new())).await.unwrap();
        assert_eq!(reply, "Tell me more.");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer key-123"));
        assert_eq!(body["model"], "gemini-2.0-flash");
        assert_eq!(
            body["messages"],
            json!([
                { "role": "system", "content": "Be kind." },
                { "role": "user", "content": "I feel anxious today" }
            ])
        );
    }

    #[tokio::test]
    async fn test_forwards_history_between_system_and_input() {
        let stub = stub(StatusCode::OK, reply_body("ok"));
        let seen = stub.seen.clone();
        let base_url = spawn_stub(stub).await;
        let client = GeminiClient::new("k", &base_url, Some(Duration::from_secs(5))).unwrap();

        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        client.complete(&request(history)).await.unwrap();

        let seen = seen.lock().unwrap();
        let roles: Vec<&str> = seen[0].1["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let base_url = spawn_stub(stub(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": "quota" }),
        ))
        .await;
        let client = GeminiClient::new("k", &base_url, Some(Duration::from_secs(5))).unwrap();

        let err = client.complete(&request(Vec::new())).await.unwrap_err();
        match err {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("quota"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_reply() {
        let base_url = spawn_stub(stub(StatusCode::OK, json!({ "choices": [] }))).await;
        let client = GeminiClient::new("k", &base_url, Some(Duration::from_secs(5))).unwrap();

        let err = client.complete(&request(Vec::new())).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyReply));
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_decode_error() {
        let base_url = spawn_stub(stub(StatusCode::OK, json!({ "text": "hello" }))).await;
        let client = GeminiClient::new("k", &base_url, Some(Duration::from_secs(5))).unwrap();

        let err = client.complete(&request(Vec::new())).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let mut slow = stub(StatusCode::OK, reply_body("late"));
        slow.delay = Duration::from_secs(2);
        let base_url = spawn_stub(slow).await;
        let client = GeminiClient::new("k", &base_url, Some(Duration::from_millis(100))).unwrap();

        let err = client.complete(&request(Vec::new())).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let base_url = format!("http://{}", addr);
        let client = GeminiClient::new("k", &base_url, Some(Duration::from_secs(5))).unwrap();

        let err = client.complete(&request(Vec::new())).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
