use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::StreambotConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "streambot.toml",
    "streambot.yaml",
    "streambot.yml",
    "streambot.json",
];

/// Environment variable selecting a `config_<ENV>.yaml` profile.
pub const PROFILE_ENV_VAR: &str = "ENV";

/// Profile used when the selected one has no file.
const FALLBACK_PROFILE: &str = "dev";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<StreambotConfig> {
    let raw = read_substituted(path)?;
    parse_config(&raw, path)
}

/// Load the raw config tree from the given path, after env substitution.
///
/// Used by validation to inspect keys the typed schema would silently drop.
pub fn load_config_value(path: &Path) -> Result<serde_json::Value> {
    let raw = read_substituted(path)?;
    parse_config_value(&raw, path)
}

/// Locate the config file.
///
/// Search order:
/// 1. `explicit`, when given (it does not need to exist yet; loading reports it)
/// 2. `./config_<ENV>.yaml` when `ENV` is set, then `./config_dev.yaml`
/// 3. `./streambot.{toml,yaml,yml,json}` (project-local)
/// 4. `~/.config/streambot/streambot.{toml,yaml,yml,json}` (user-global)
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    let profile = std::env::var(PROFILE_ENV_VAR).ok();
    let user_dir = config_dir();
    resolve_in(
        explicit,
        Path::new("."),
        profile.as_deref(),
        user_dir.as_deref(),
    )
}

/// Resolve and load the config, falling back to defaults when no file exists.
///
/// A file that exists but fails to load is an error rather than a silent
/// fallback: the bot cannot do anything useful without credentials.
pub fn load_or_default(explicit: Option<&Path>) -> Result<StreambotConfig> {
    match resolve_config_path(explicit) {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(StreambotConfig::default())
        },
    }
}

/// Returns the user-global config directory (`~/.config/streambot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "streambot").map(|d| d.config_dir().to_path_buf())
}

fn resolve_in(
    explicit: Option<&Path>,
    cwd: &Path,
    profile: Option<&str>,
    user_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }

    let profiles = profile
        .filter(|p| !p.is_empty())
        .into_iter()
        .chain(std::iter::once(FALLBACK_PROFILE));
    for name in profiles {
        let p = cwd.join(format!("config_{name}.yaml"));
        if p.exists() {
            return Some(p);
        }
    }

    for dir in std::iter::once(cwd).chain(user_dir) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn read_substituted(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(substitute_env(&raw))
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

fn parse_config(raw: &str, path: &Path) -> Result<StreambotConfig> {
    match extension(path) {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        ext => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

fn parse_config_value(raw: &str, path: &Path) -> Result<serde_json::Value> {
    match extension(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(raw).map_err(|e| Error::parse(path, e))?;
            serde_json::to_value(v).map_err(|e| Error::parse(path, e))
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e))?;
            serde_json::to_value(v).map_err(|e| Error::parse(path, e))
        },
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        ext => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
