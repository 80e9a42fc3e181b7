use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    futures::StreamExt,
    streambot_common::ChatMessage,
    streambot_config::AiConfig,
    tracing::info,
};

use crate::{
    error::{Error, Result},
    model::{AiProvider, ProviderStream},
    openai::{self, OpenAiProvider},
    volc::{self, VolcProvider},
};

#[derive(Default)]
struct Inner {
    providers: HashMap<String, Arc<dyn AiProvider>>,
    default: Option<String>,
}

/// Named AI providers plus the one chat requests go to.
#[derive(Default)]
pub struct ProviderManager {
    inner: RwLock<Inner>,
}

impl ProviderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the `ai` config section.
    ///
    /// Enabled providers are registered (Volc first, then OpenAI) and the
    /// default is resolved from `ai.default`, else the last registered.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let manager = Self::new();
        for (name, entry) in config.enabled_providers() {
            let api_key = entry.api_key.clone();
            let provider: Arc<dyn AiProvider> = match name {
                "volc" => Arc::new(VolcProvider::new(
                    api_key,
                    entry.model.clone(),
                    entry
                        .api_url
                        .clone()
                        .unwrap_or_else(|| volc::DEFAULT_BASE_URL.to_string()),
                )),
                "openai" => Arc::new(OpenAiProvider::new(
                    api_key,
                    entry.model.clone(),
                    entry
                        .api_url
                        .clone()
                        .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
                )),
                other => {
                    return Err(Error::UnknownProvider {
                        id: other.to_string(),
                    });
                },
            };
            info!(provider = name, model = %entry.model, "registered AI provider");
            manager.register(provider);
        }

        if let Some(default) = config.default_provider() {
            manager.set_default(default)?;
        }
        Ok(manager)
    }

    /// Register (or replace) a provider under its `id()`.
    pub fn register(&self, provider: Arc<dyn AiProvider>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.providers.insert(provider.id().to_string(), provider);
    }

    /// Route chat requests to `id`, which must be registered.
    pub fn set_default(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !inner.providers.contains_key(id) {
            return Err(Error::UnknownProvider { id: id.to_string() });
        }
        inner.default = Some(id.to_string());
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AiProvider>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.providers.get(id).cloned()
    }

    pub fn default_id(&self) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.default.clone()
    }

    /// Registered provider ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<_> = inner.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn default_provider(&self) -> Result<Arc<dyn AiProvider>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .default
            .as_ref()
            .and_then(|id| inner.providers.get(id))
            .cloned()
            .ok_or(Error::NoDefaultProvider)
    }

    /// Stream a reply from the default provider.
    ///
    /// Without a default the stream yields a single `NoDefaultProvider` error.
    pub fn stream_chat(&self, history: Vec<ChatMessage>) -> ProviderStream<'static> {
        let provider = self.default_provider();
        Box::pin(async_stream::stream! {
            let provider = match provider {
                Ok(p) => p,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let mut inner = provider.stream_chat(history);
            while let Some(item) = inner.next().await {
                yield item;
            }
        })
    }
}
