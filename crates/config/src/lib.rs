//! Configuration loading, env substitution, and validation.
//!
//! Config files: `streambot.toml`, `streambot.yaml`, or `streambot.json`
//! Searched in `./` then `~/.config/streambot/`. When `ENV` is set,
//! `config_<ENV>.yaml` takes precedence.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, load_config, load_or_default, resolve_config_path},
    schema::{
        AiConfig, BotConfig, FeishuConfig, ProviderEntry, ServerConfig, SessionConfig,
        StreamConfig, StreambotConfig,
    },
    template::default_config_template,
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_file},
};
