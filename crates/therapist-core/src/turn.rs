//! Turn handling: one user input, one model call, at most one reply.

use crate::ai::{ChatModel, CompletionRequest};
use crate::config::Config;
use crate::error::ProviderError;
use crate::persona::{AGENT_NAME, THERAPIST_INSTRUCTIONS};
use crate::state::ChatMessage;
use crate::transcript::Transcript;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Read-only agent setup shared by every session: persona plus model handle.
#[derive(Clone)]
pub struct AgentConfig {
    name: String,
    instructions: String,
    model: String,
    include_history: bool,
    client: Arc<dyn ChatModel>,
}

impl AgentConfig {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: impl Into<String>,
        client: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model: model.into(),
            include_history: false,
            client,
        }
    }

    /// The therapist persona on the configured model.
    pub fn therapist(config: &Config, client: Arc<dyn ChatModel>) -> Self {
        Self::new(AGENT_NAME, THERAPIST_INSTRUCTIONS, &config.model, client)
            .with_history(config.include_history)
    }

    /// Forward earlier turns of the transcript with each request.
    pub fn with_history(mut self, include_history: bool) -> Self {
        self.include_history = include_history;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("include_history", &self.include_history)
            .finish_non_exhaustive()
    }
}

/// An outbound model call started by [`TurnHandler::begin`].
pub struct PendingTurn {
    task: JoinHandle<Result<String, ProviderError>>,
}

impl PendingTurn {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<String, ProviderError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(ProviderError::Interrupted(e.to_string())),
        }
    }
}

pub struct TurnHandler {
    agent: Arc<AgentConfig>,
}

impl TurnHandler {
    pub fn new(agent: AgentConfig) -> Self {
        Self {
            agent: Arc::new(agent),
        }
    }

    pub fn agent(&self) -> &AgentConfig {
        &self.agent
    }

    /// Append the user's message and start the model call in the background.
    ///
    /// The caller renders the transcript right away, then hands the outcome of
    /// the returned turn to [`finish`](Self::finish).
    pub fn begin(&self, transcript: &mut Transcript, text: impl Into<String>) -> PendingTurn {
        let input = text.into();
        let history = if self.agent.include_history {
            transcript.messages().to_vec()
        } else {
            Vec::new()
        };
        transcript.append(ChatMessage::user(input.clone()));

        tracing::info!(
            agent = %self.agent.name,
            chars = input.chars().count(),
            history = history.len(),
            "turn started"
        );

        let request = CompletionRequest {
            model: self.agent.model.clone(),
            instructions: self.agent.instructions.clone(),
            history,
            input,
        };
        let agent = Arc::clone(&self.agent);
        let task = tokio::spawn(async move { agent.client.complete(&request).await });

        PendingTurn { task }
    }

    /// Record the reply, or hand back the failure. A failure leaves the
    /// transcript exactly as `begin` left it.
    pub fn finish(
        &self,
        transcript: &mut Transcript,
        outcome: Result<String, ProviderError>,
    ) -> Result<ChatMessage, ProviderError> {
        match outcome {
            Ok(reply) => {
                let message = ChatMessage::assistant(reply);
                transcript.append(message.clone());
                tracing::info!(
                    agent = %self.agent.name,
                    chars = message.content().chars().count(),
                    "turn completed"
                );
                Ok(message)
            }
            Err(e) => {
                tracing::warn!(agent = %self.agent.name, "turn failed: {e}");
                Err(e)
            }
        }
    }

    /// Run a whole turn: `begin`, wait for the reply, `finish`.
    pub async fn handle_input(
        &self,
        transcript: &mut Transcript,
        text: impl Into<String>,
    ) -> Result<ChatMessage, ProviderError> {
        let pending = self.begin(transcript, text);
        let outcome = pending.wait().await;
        self.finish(transcript, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ScriptedModel;
    use crate::config::{Settings, API_KEY_VAR, MODEL_VAR};
    use crate::state::ChatRole;

    fn handler(model: Arc<ScriptedModel>) -> TurnHandler {
        TurnHandler::new(AgentConfig::new(
            AGENT_NAME,
            THERAPIST_INSTRUCTIONS,
            "gemini-2.0-flash",
            model,
        ))
    }

    #[tokio::test]
    async fn test_anxious_input_gets_reply_with_instructions() {
        let model = Arc::new(ScriptedModel::new().reply("It's okay to feel that way."));
        let handler = handler(model.clone());
        let mut transcript = Transcript::new();

        let reply = handler
            .handle_input(&mut transcript, "I feel anxious today")
            .await
            .unwrap();

        assert_eq!(reply.role(), ChatRole::Assistant);
        assert!(!reply.content().is_empty());
        assert_eq!(
            transcript.messages(),
            &[
                ChatMessage::user("I feel anxious today"),
                ChatMessage::assistant("It's okay to feel that way."),
            ]
        );

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].instructions, THERAPIST_INSTRUCTIONS);
        assert_eq!(requests[0].input, "I feel anxious today");
        assert_eq!(requests[0].model, "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn test_n_turns_alternate_in_order() {
        let model = Arc::new(ScriptedModel::new());
        let handler = handler(model.clone());
        let mut transcript = Transcript::new();
        let inputs = ["one", "two", "three", "four"];

        for input in inputs {
            handler.handle_input(&mut transcript, input).await.unwrap();
        }

        assert_eq!(transcript.len(), 2 * inputs.len());
        assert_eq!(model.calls(), inputs.len());
        for (i, pair) in transcript.messages().chunks(2).enumerate() {
            assert_eq!(pair[0].role(), ChatRole::User);
            assert_eq!(pair[0].content(), inputs[i]);
            assert_eq!(pair[1].role(), ChatRole::Assistant);
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_prior_entries_and_adds_only_user() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply("first reply")
                .fail(ProviderError::EmptyReply),
        );
        let handler = handler(model.clone());
        let mut transcript = Transcript::new();
        handler.handle_input(&mut transcript, "first").await.unwrap();
        let before = transcript.messages().to_vec();

        let err = handler
            .handle_input(&mut transcript, "second")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::EmptyReply));
        assert_eq!(transcript.len(), before.len() + 1);
        assert_eq!(&transcript.messages()[..before.len()], &before[..]);
        assert_eq!(transcript.last(), Some(&ChatMessage::user("second")));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_begin_shows_user_message_before_reply() {
        let model = Arc::new(ScriptedModel::new().reply("later"));
        let handler = handler(model);
        let mut transcript = Transcript::new();

        let pending = handler.begin(&mut transcript, "hello");
        assert_eq!(transcript.messages(), &[ChatMessage::user("hello")]);

        let outcome = pending.wait().await;
        handler.finish(&mut transcript, outcome).unwrap();
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_history_not_sent_by_default() {
        let model = Arc::new(ScriptedModel::new());
        let handler = handler(model.clone());
        let mut transcript = Transcript::new();

        handler.handle_input(&mut transcript, "one").await.unwrap();
        handler.handle_input(&mut transcript, "two").await.unwrap();

        assert!(model.requests().iter().all(|r| r.history.is_empty()));
    }

    #[tokio::test]
    async fn test_history_sent_when_enabled() {
        let model = Arc::new(ScriptedModel::new().reply("r1"));
        let agent = AgentConfig::new("a", "be kind", "m", model.clone()).with_history(true);
        let handler = TurnHandler::new(agent);
        let mut transcript = Transcript::new();

        handler.handle_input(&mut transcript, "one").await.unwrap();
        handler.handle_input(&mut transcript, "two").await.unwrap();

        let requests = model.requests();
        assert!(requests[0].history.is_empty());
        assert_eq!(
            requests[1].history,
            vec![ChatMessage::user("one"), ChatMessage::assistant("r1")]
        );
        assert_eq!(requests[1].input, "two");
    }

    #[tokio::test]
    async fn test_therapist_agent_follows_config() {
        let settings = Settings {
            include_history: true,
            ..Settings::default()
        };
        let env = |key: &str| match key {
            API_KEY_VAR => Some("k".to_string()),
            MODEL_VAR => Some("gemini-1.5-pro".to_string()),
            _ => None,
        };
        let config = Config::resolve(settings, env).unwrap();
        let model = Arc::new(ScriptedModel::new().reply("r1").reply("r2"));
        let handler = TurnHandler::new(AgentConfig::therapist(&config, model.clone()));
        let mut transcript = Transcript::new();

        handler.handle_input(&mut transcript, "one").await.unwrap();
        handler.handle_input(&mut transcript, "two").await.unwrap();

        assert_eq!(handler.agent().model(), "gemini-1.5-pro");
        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(request.instructions, THERAPIST_INSTRUCTIONS);
            assert_eq!(request.model, "gemini-1.5-pro");
        }
        assert_eq!(
            requests[1].history,
            vec![ChatMessage::user("one"), ChatMessage::assistant("r1")]
        );
    }
}
