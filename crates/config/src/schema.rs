//! Config schema types (server, IM platform, AI providers, session, stream).

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreambotConfig {
    pub server: ServerConfig,
    pub bot: BotConfig,
    pub ai: AiConfig,
    pub session: SessionConfig,
    pub stream: StreamConfig,
}

impl StreambotConfig {
    /// The Feishu section, only when it is present and enabled.
    pub fn enabled_feishu(&self) -> Option<&FeishuConfig> {
        self.bot.feishu.as_ref().filter(|f| f.enable)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0" so the IM platform can reach
    /// the event callback.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8888,
        }
    }
}

/// IM platform sections. Each platform is optional; at least one must be enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub feishu: Option<FeishuConfig>,
}

impl BotConfig {
    /// Names of the enabled IM platforms.
    pub fn enabled_platforms(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.feishu.as_ref().is_some_and(|f| f.enable) {
            out.push("feishu");
        }
        out
    }
}

/// Feishu (Lark) application credentials and bot behaviour.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeishuConfig {
    pub enable: bool,

    /// Application ID from the developer console.
    pub app_id: String,

    /// Application secret.
    #[serde(serialize_with = "serialize_secret")]
    pub app_secret: Secret<String>,

    /// Event encryption key. Encrypted event delivery is not supported; when
    /// this is set the console must still be configured for plain events.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_encrypt_key: Option<Secret<String>>,

    /// Verification token compared against every inbound event header.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_verification_token: Option<Secret<String>>,

    /// Display name of the bot; group messages must mention exactly this name.
    pub bot_name: String,

    /// Name shown in the header of tip cards (e.g. "DeepSeek").
    pub assistant_name: String,

    /// Open platform API base.
    pub base_url: String,

    /// Pause before switching a card out of streaming mode, so the client
    /// finishes rendering the last content update.
    pub finalize_delay_ms: u64,

    /// Optional link attached to finalized cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_link: Option<String>,
}

impl std::fmt::Debug for FeishuConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeishuConfig")
            .field("enable", &self.enable)
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .field(
                "app_encrypt_key",
                &self.app_encrypt_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "app_verification_token",
                &self.app_verification_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("bot_name", &self.bot_name)
            .field("assistant_name", &self.assistant_name)
            .field("base_url", &self.base_url)
            .field("finalize_delay_ms", &self.finalize_delay_ms)
            .field("card_link", &self.card_link)
            .finish()
    }
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            enable: false,
            app_id: String::new(),
            app_secret: Secret::new(String::new()),
            app_encrypt_key: None,
            app_verification_token: None,
            bot_name: String::new(),
            assistant_name: "DeepSeek".into(),
            base_url: "https://open.feishu.cn/open-apis".into(),
            finalize_delay_ms: 500,
            card_link: None,
        }
    }
}

/// AI provider sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Provider to use for chat. When unset, OpenAI wins over Volc if both
    /// are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub openai: Option<ProviderEntry>,
    pub volc: Option<ProviderEntry>,
}

impl AiConfig {
    /// Enabled provider entries as `(name, entry)` in registration order.
    pub fn enabled_providers(&self) -> Vec<(&'static str, &ProviderEntry)> {
        [("volc", self.volc.as_ref()), ("openai", self.openai.as_ref())]
            .into_iter()
            .filter_map(|(name, entry)| entry.filter(|e| e.enable).map(|e| (name, e)))
            .collect()
    }

    /// Resolve the default provider name.
    pub fn default_provider(&self) -> Option<&str> {
        if let Some(ref name) = self.default {
            return Some(name.as_str());
        }
        self.enabled_providers().last().map(|(name, _)| *name)
    }
}

/// Credentials and endpoint of one AI provider.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEntry {
    pub enable: bool,

    #[serde(serialize_with = "serialize_secret")]
    pub api_key: Secret<String>,

    /// Model ID (for Volc: the bot ID).
    pub model: String,

    /// Override the API base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("enable", &self.enable)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for ProviderEntry {
    fn default() -> Self {
        Self {
            enable: false,
            api_key: Secret::new(String::new()),
            model: String::new(),
            api_url: None,
        }
    }
}

/// Session and dedup cache lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle lifetime of a conversation history.
    pub ttl_secs: u64,
    /// Size budget for one conversation, in bytes of JSON-encoded messages.
    pub max_context_len: usize,
    /// How long a processed inbound message ID is remembered.
    pub dedup_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 12 * 60 * 60,
            max_context_len: 16 * 1024,
            dedup_ttl_secs: 10 * 60 * 60,
        }
    }
}

/// Streaming card cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Interval between card content pushes while streaming.
    pub tick_ms: u64,
    /// Give up when the provider yields nothing for this long.
    pub idle_timeout_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_ms: 700,
            idle_timeout_secs: 10,
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
