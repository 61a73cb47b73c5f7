use async_trait::async_trait;
use configs::ChatConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{with_system_prompt, ChatError, ChatMessage, ChatRelay};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat relay backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatRelay {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiChatRelay {
    /// Build a relay with the configured timeouts. A missing API key is not an
    /// error here; each relay call fails with [`ChatError::Config`] instead.
    pub fn from_config(cfg: &ChatConfig, api_key: Option<String>) -> Result<Self, ChatError> {
        let client = Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| ChatError::Config(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.api_base.trim_end_matches('/')),
            model: cfg.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatRelay for OpenAiChatRelay {
    #[instrument(skip(self, history), fields(turns = history.len(), model = %self.model))]
    async fn relay(&self, history: &[ChatMessage]) -> Result<String, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::Config("API key is not set".to_string()))?;

        let messages = with_system_prompt(history);
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&CompletionRequest { model: &self.model, messages: &messages })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::Timeout
                } else {
                    ChatError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            warn!(status = status.as_u16(), "chat completion rejected upstream");
            return Err(ChatError::Upstream { status: status.as_u16(), body });
        }

        let data: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Transport(format!("response parse error: {e}")))?;

        let reply = data
            .choices
            .into_iter()
            .next()
            .ok_or(ChatError::EmptyReply)?
            .message
            .content
            .unwrap_or_default();
        debug!(reply_len = reply.len(), "chat completion received");
        Ok(reply)
    }
}
