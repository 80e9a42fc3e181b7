use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    tokio_util::{sync::CancellationToken, task::TaskTracker},
};

use {
    streambot_chat::{ChatEngine, ChatSettings},
    streambot_config::StreambotConfig,
    streambot_feishu::FeishuClient,
    streambot_providers::ProviderManager,
};

/// Shared state behind every route.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<ChatEngine>,
    /// Expected `token` of inbound Feishu callbacks, when configured.
    pub verification_token: Option<String>,
    /// Exchanges spawned from inbound events; drained on shutdown.
    pub tasks: TaskTracker,
    pub cancel: CancellationToken,
    pub version: &'static str,
}

impl GatewayState {
    pub fn new(
        engine: Arc<ChatEngine>,
        verification_token: Option<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            verification_token,
            tasks: TaskTracker::new(),
            cancel,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Wire the Feishu client, the chat engine and the providers from config.
    pub fn from_config(
        config: &StreambotConfig,
        providers: Arc<ProviderManager>,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self> {
        let Some(feishu) = config.enabled_feishu() else {
            anyhow::bail!("no IM platform enabled; set bot.feishu.enable = true");
        };
        let verification_token = feishu
            .app_verification_token
            .as_ref()
            .map(|t| t.expose_secret().clone())
            .filter(|t| !t.is_empty());

        let client = Arc::new(FeishuClient::new(feishu.clone()));
        let engine = ChatEngine::new(
            &ChatSettings::from_config(config),
            client.clone(),
            client,
            providers,
            cancel.clone(),
        );
        Ok(Self::new(Arc::new(engine), verification_token, cancel))
    }
}
