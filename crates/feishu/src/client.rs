use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::Method,
    secrecy::ExposeSecret,
    serde::{Deserialize, de::DeserializeOwned},
    serde_json::{Value, json},
    tracing::{debug, warn},
};

use {
    streambot_channels::{CardReplier, CardSink, Error, Result, StaticCard, StreamUpdate},
    streambot_config::FeishuConfig,
};

use crate::{
    auth::{CachedAccessToken, get_tenant_access_token},
    cards::{
        ANSWER_ELEMENT, REFERENCE_ELEMENT, THINK_ELEMENT, card_reference_content,
        finalize_settings_json, static_card_json, streaming_card_json,
    },
    sequence::Sequence,
};

/// Open platform response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CreateCardData {
    card_id: String,
}

/// Feishu open platform client for card replies and streaming card edits.
pub struct FeishuClient {
    http: reqwest::Client,
    config: FeishuConfig,
    token_cache: tokio::sync::Mutex<Option<CachedAccessToken>>,
    sequence: Sequence,
}

impl FeishuClient {
    pub fn new(config: FeishuConfig) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    pub fn with_http(http: reqwest::Client, config: FeishuConfig) -> Self {
        Self {
            http,
            config,
            token_cache: tokio::sync::Mutex::new(None),
            sequence: Sequence::default(),
        }
    }

    pub fn config(&self) -> &FeishuConfig {
        &self.config
    }

    /// Send an authenticated API call and unwrap the response envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> Result<Option<T>> {
        let token = get_tenant_access_token(&self.http, &self.config, &self.token_cache).await?;
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .request(method, url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::external(format!("feishu request {path}"), e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::external("feishu response body", e))?;
        let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(Error::unavailable(format!(
                    "feishu request {path} failed ({status}): {text}"
                )));
            },
            Err(e) => return Err(e.into()),
        };
        if envelope.code != 0 {
            warn!(path, code = envelope.code, msg = %envelope.msg, "feishu API error");
            return Err(Error::api(envelope.code, envelope.msg));
        }
        Ok(envelope.data)
    }

    /// Reply to `message_id` with an interactive message whose content is
    /// `content`.
    async fn reply_interactive(&self, message_id: &str, content: &Value) -> Result<()> {
        let body = json!({
            "msg_type": "interactive",
            "content": content.to_string(),
            "uuid": uuid::Uuid::new_v4().to_string(),
        });
        self.call::<Value>(
            Method::POST,
            &format!("/im/v1/messages/{message_id}/reply"),
            &body,
        )
        .await?;
        Ok(())
    }

    async fn update_element(&self, card_id: &str, element_id: &str, content: &str) -> Result<()> {
        let body = json!({
            "uuid": uuid::Uuid::new_v4().to_string(),
            "content": content,
            "sequence": self.sequence.next(),
        });
        self.call::<Value>(
            Method::PUT,
            &format!("/cardkit/v1/cards/{card_id}/elements/{element_id}/content"),
            &body,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CardSink for FeishuClient {
    async fn create_card(&self) -> Result<String> {
        let body = json!({
            "type": "card_json",
            "data": streaming_card_json().to_string(),
        });
        let data: Option<CreateCardData> = self
            .call(Method::POST, "/cardkit/v1/cards", &body)
            .await?;
        let card_id = data
            .map(|d| d.card_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::unavailable("card creation returned no card_id"))?;
        debug!(card_id = %card_id, "created streaming card");
        Ok(card_id)
    }

    async fn post_card_reply(&self, message_id: &str, card_id: &str) -> Result<()> {
        self.reply_interactive(message_id, &card_reference_content(card_id))
            .await
    }

    async fn update_card_content(&self, card_id: &str, update: &StreamUpdate) -> Result<()> {
        let fields = [
            (THINK_ELEMENT, &update.thinking),
            (ANSWER_ELEMENT, &update.answer),
            (REFERENCE_ELEMENT, &update.reference),
        ];
        for (element_id, content) in fields {
            if !content.is_empty() {
                self.update_element(card_id, element_id, content).await?;
            }
        }
        Ok(())
    }

    async fn finalize_card(&self, card_id: &str) -> Result<()> {
        if self.config.finalize_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.finalize_delay_ms)).await;
        }
        let settings = finalize_settings_json(self.config.card_link.as_deref());
        let body = json!({
            "settings": settings.to_string(),
            "uuid": uuid::Uuid::new_v4().to_string(),
            "sequence": self.sequence.next(),
        });
        self.call::<Value>(
            Method::PATCH,
            &format!("/cardkit/v1/cards/{card_id}/settings"),
            &body,
        )
        .await?;
        debug!(card_id, "finalized streaming card");
        Ok(())
    }
}

#[async_trait]
impl CardReplier for FeishuClient {
    async fn reply_card(&self, message_id: &str, card: &StaticCard) -> Result<()> {
        self.reply_interactive(message_id, &static_card_json(card))
            .await
    }
}
