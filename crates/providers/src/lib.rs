//! AI provider implementations and registry.

pub mod error;
pub mod manager;
pub mod model;
pub mod openai;
pub mod openai_compat;
pub mod volc;

pub use {
    error::{Error, Result},
    manager::ProviderManager,
    model::{AiProvider, MAX_TOKENS, ProviderEvent, ProviderStream},
    openai::OpenAiProvider,
    volc::VolcProvider,
};

/// Shared HTTP client for AI providers.
///
/// Providers reuse this client to share connection pools, DNS cache, and TLS
/// sessions.
pub fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: std::sync::LazyLock<reqwest::Client> =
        std::sync::LazyLock::new(reqwest::Client::new);
    &CLIENT
}
