use secrecy::Secret;

use streambot_common::ChatMessage;

use crate::{
    model::{AiProvider, MAX_TOKENS, ProviderStream},
    openai_compat::{stream_completion, to_request_messages},
};

pub const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// Volcengine Ark bot chat (`POST {base_url}/bots/chat/completions`).
///
/// Ark bots may stream `reasoning_content` deltas and web-search
/// `references`, both surfaced as provider events.
pub struct VolcProvider {
    api_key: Secret<String>,
    bot_id: String,
    base_url: String,
    client: &'static reqwest::Client,
}

impl VolcProvider {
    pub fn new(api_key: Secret<String>, bot_id: String, base_url: String) -> Self {
        Self {
            api_key,
            bot_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: crate::shared_http_client(),
        }
    }

    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    fn request_body(&self, history: &[ChatMessage]) -> serde_json::Value {
        serde_json::json!({
            "model": self.bot_id,
            "messages": to_request_messages(history),
            "stream": true,
            "n": 1,
            "temperature": 0.7,
            "top_p": 1.0,
            "max_tokens": MAX_TOKENS,
        })
    }
}

impl AiProvider for VolcProvider {
    fn id(&self) -> &str {
        "volc"
    }

    fn stream_chat(&self, history: Vec<ChatMessage>) -> ProviderStream<'_> {
        let body = self.request_body(&history);
        stream_completion(
            self.client,
            self.id(),
            format!("{}/bots/chat/completions", self.base_url),
            &self.api_key,
            body,
        )
    }
}
