// Configuration loader
// Defaults, then ~/.birdie/config.toml (or an explicit path), then environment

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::constants::{CONFIG_DIR, CONFIG_FILE};
use super::settings::Config;

/// Load configuration.
///
/// An explicit `path` must exist. Without one, `~/.birdie/config.toml` is
/// read when present. Environment variables override both.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    let file = match path {
        Some(p) => {
            if !p.exists() {
                bail!("Configuration file not found: {}", p.display());
            }
            Some(p.to_path_buf())
        }
        None => default_config_path().filter(|p| p.exists()),
    };

    if let Some(file) = file {
        let contents = fs::read_to_string(&file)
            .with_context(|| format!("Failed to read config from {}", file.display()))?;
        apply_toml(&mut config, &contents)
            .with_context(|| format!("Failed to parse config {}", file.display()))?;
        tracing::debug!(path = %file.display(), "loaded config file");
    }

    apply_env(&mut config, |key| std::env::var(key).ok())?;

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

/// `~/.birdie/config.toml`, if a home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    relay: TomlRelay,
    #[serde(default)]
    server: TomlServer,
    #[serde(default)]
    backend: TomlBackend,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRelay {
    model: Option<String>,
    max_output_tokens: Option<u32>,
    history_limit: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlServer {
    bind_address: Option<String>,
    port: Option<u16>,
    max_sessions: Option<usize>,
    session_timeout_minutes: Option<u64>,
    rate_limit_per_second: Option<f64>,
    rate_limit_burst: Option<f64>,
    cors_allow_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlBackend {
    api_key: Option<String>,
    base_url: Option<String>,
}

/// Overlay the fields present in a TOML document onto `config`
pub fn apply_toml(config: &mut Config, contents: &str) -> Result<()> {
    let toml_config: TomlConfig = toml::from_str(contents)?;

    let relay = toml_config.relay;
    if let Some(model) = relay.model {
        config.relay.model = model;
    }
    if let Some(tokens) = relay.max_output_tokens {
        config.relay.max_output_tokens = tokens;
    }
    if let Some(limit) = relay.history_limit {
        config.relay.history_limit = limit;
    }
    if let Some(secs) = relay.timeout_secs {
        config.relay.timeout = Duration::from_secs(secs);
    }

    let server = toml_config.server;
    if let Some(addr) = server.bind_address {
        config.server.bind_address = addr;
    }
    if let Some(port) = server.port {
        config.server.set_port(port);
    }
    if let Some(max) = server.max_sessions {
        config.server.max_sessions = max;
    }
    if let Some(minutes) = server.session_timeout_minutes {
        config.server.session_timeout_minutes = minutes;
    }
    if let Some(rate) = server.rate_limit_per_second {
        config.server.rate_limit_per_second = rate;
    }
    if let Some(burst) = server.rate_limit_burst {
        config.server.rate_limit_burst = burst;
    }
    if let Some(origins) = server.cors_allow_origins {
        config.server.cors_allow_origins = origins;
    }

    let backend = toml_config.backend;
    if backend.api_key.is_some() {
        config.backend.api_key = backend.api_key;
    }
    if let Some(url) = backend.base_url {
        config.backend.base_url = url;
    }

    Ok(())
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var` so tests don't touch process state.
pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("GOOGLE_API_KEY") {
        config.backend.api_key = Some(key);
    }

    if let Some(port) = non_empty("AI_PORT") {
        let port: u16 = port
            .trim()
            .parse()
            .with_context(|| format!("AI_PORT is not a valid port: '{port}'"))?;
        config.server.set_port(port);
    }

    if let Some(model) = non_empty("BIRDIE_MODEL") {
        config.relay.model = model;
    }

    if let Some(url) = non_empty("BIRDIE_BASE_URL") {
        config.backend.base_url = url;
    }

    Ok(())
}
