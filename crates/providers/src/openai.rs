use secrecy::Secret;

use streambot_common::ChatMessage;

use crate::{
    model::{AiProvider, MAX_TOKENS, ProviderStream},
    openai_compat::{stream_completion, to_request_messages},
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat completions (`POST {base_url}/chat/completions`).
pub struct OpenAiProvider {
    api_key: Secret<String>,
    model: String,
    base_url: String,
    client: &'static reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: Secret<String>, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: crate::shared_http_client(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, history: &[ChatMessage]) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": to_request_messages(history),
            "stream": true,
            "max_tokens": MAX_TOKENS,
        })
    }
}

impl AiProvider for OpenAiProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn stream_chat(&self, history: Vec<ChatMessage>) -> ProviderStream<'_> {
        let body = self.request_body(&history);
        stream_completion(
            self.client,
            self.id(),
            format!("{}/chat/completions", self.base_url),
            &self.api_key,
            body,
        )
    }
}
