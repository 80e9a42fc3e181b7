//! Configuration validation.
//!
//! Detects unknown/misspelled keys in the raw config tree and checks the
//! parsed config for the settings the bot cannot start without.

use std::{collections::HashMap, path::Path};

use secrecy::ExposeSecret;

use crate::{
    loader::load_config_value,
    schema::{ProviderEntry, StreambotConfig},
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "missing", "security"
    pub category: &'static str,
    /// Dotted path, e.g. "bot.feishu.app_id"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// One line per error, for startup failure messages.
    #[must_use]
    pub fn error_summary(&self) -> String {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let provider_entry = || {
        Struct(HashMap::from([
            ("enable", Leaf),
            ("api_key", Leaf),
            ("model", Leaf),
            ("api_url", Leaf),
        ]))
    };

    Struct(HashMap::from([
        (
            "server",
            Struct(HashMap::from([("bind", Leaf), ("port", Leaf)])),
        ),
        (
            "bot",
            Struct(HashMap::from([(
                "feishu",
                Struct(HashMap::from([
                    ("enable", Leaf),
                    ("app_id", Leaf),
                    ("app_secret", Leaf),
                    ("app_encrypt_key", Leaf),
                    ("app_verification_token", Leaf),
                    ("bot_name", Leaf),
                    ("assistant_name", Leaf),
                    ("base_url", Leaf),
                    ("finalize_delay_ms", Leaf),
                    ("card_link", Leaf),
                ])),
            )])),
        ),
        (
            "ai",
            Struct(HashMap::from([
                ("default", Leaf),
                ("openai", provider_entry()),
                ("volc", provider_entry()),
            ])),
        ),
        (
            "session",
            Struct(HashMap::from([
                ("ttl_secs", Leaf),
                ("max_context_len", Leaf),
                ("dedup_ttl_secs", Leaf),
            ])),
        ),
        (
            "stream",
            Struct(HashMap::from([
                ("tick_ms", Leaf),
                ("idle_timeout_secs", Leaf),
            ])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a parsed configuration.
///
/// Errors: no enabled IM platform, no enabled AI provider, missing
/// credentials on an enabled section, an unknown or disabled default provider.
#[must_use]
pub fn validate(config: &StreambotConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.bot.enabled_platforms().is_empty() {
        result.push(
            Severity::Error,
            "missing",
            "bot",
            "at least one IM platform must be enabled",
        );
    }

    if let Some(feishu) = config.enabled_feishu() {
        if feishu.app_id.trim().is_empty() {
            result.push(Severity::Error, "missing", "bot.feishu.app_id", "required");
        }
        if feishu.app_secret.expose_secret().trim().is_empty() {
            result.push(
                Severity::Error,
                "missing",
                "bot.feishu.app_secret",
                "required",
            );
        }
        if feishu.bot_name.trim().is_empty() {
            result.push(
                Severity::Warning,
                "missing",
                "bot.feishu.bot_name",
                "group messages will never match a mention",
            );
        }
        if feishu.app_verification_token.is_none() {
            result.push(
                Severity::Warning,
                "security",
                "bot.feishu.app_verification_token",
                "inbound events are not authenticated",
            );
        }
        if feishu.app_encrypt_key.is_some() {
            result.push(
                Severity::Warning,
                "security",
                "bot.feishu.app_encrypt_key",
                "encrypted event delivery is not supported; encrypted events will be rejected",
            );
        }
    }

    let enabled = config.ai.enabled_providers();
    if enabled.is_empty() {
        result.push(
            Severity::Error,
            "missing",
            "ai",
            "at least one AI provider must be enabled",
        );
    }
    for (name, entry) in &enabled {
        check_provider_entry(name, entry, &mut result);
    }

    if let Some(ref name) = config.ai.default
        && !enabled.iter().any(|(n, _)| n == name)
    {
        result.push(
            Severity::Error,
            "missing",
            "ai.default",
            format!("default provider \"{name}\" is not an enabled provider"),
        );
    }

    if config.stream.tick_ms == 0 {
        result.push(Severity::Error, "type-error", "stream.tick_ms", "must be > 0");
    }
    if config.stream.idle_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "type-error",
            "stream.idle_timeout_secs",
            "must be > 0",
        );
    }
    if config.server.port == 0 {
        result.push(
            Severity::Info,
            "type-error",
            "server.port",
            "port 0 binds a random port",
        );
    }

    result
}

/// Validate a config file: unknown keys in the raw tree, then the parsed
/// config.
#[must_use]
pub fn validate_file(path: &Path) -> ValidationResult {
    let mut result = ValidationResult {
        config_path: Some(path.to_path_buf()),
        ..Default::default()
    };

    match load_config_value(path) {
        Ok(value) => check_unknown_fields(&value, &build_schema_map(), "", &mut result),
        Err(e) => {
            result.push(Severity::Error, "syntax", "", e.to_string());
            return result;
        },
    }

    match crate::loader::load_config(path) {
        Ok(config) => result.diagnostics.extend(validate(&config).diagnostics),
        Err(e) => result.push(Severity::Error, "type-error", "", e.to_string()),
    }

    result
}

fn check_provider_entry(name: &str, entry: &ProviderEntry, result: &mut ValidationResult) {
    if entry.api_key.expose_secret().trim().is_empty() {
        result.push(
            Severity::Error,
            "missing",
            format!("ai.{name}.api_key"),
            "required",
        );
    }
    if entry.model.trim().is_empty() {
        result.push(
            Severity::Error,
            "missing",
            format!("ai.{name}.model"),
            "required",
        );
    }
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    result: &mut ValidationResult,
) {
    let (serde_json::Value::Object(map), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known: Vec<&str> = fields.keys().copied().collect();
    for (key, child) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match fields.get(key.as_str()) {
            Some(child_schema) => check_unknown_fields(child, child_schema, &path, result),
            None => {
                let message = match suggest(key, &known, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                result.push(Severity::Error, "unknown-field", path, message);
            },
        }
    }
}
