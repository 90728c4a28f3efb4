// Configuration structs

use anyhow::bail;
use std::net::SocketAddr;
use std::time::Duration;

use super::constants::*;

/// Top-level configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Per-call relay policy (model, budgets, history bound)
    pub relay: RelayConfig,

    /// HTTP surface
    pub server: ServerConfig,

    /// Generative backend connection
    pub backend: BackendConfig,
}

/// Explicit backend call configuration, fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Model identifier (not selectable per request)
    pub model: String,
    /// Upper bound on reply length
    pub max_output_tokens: u32,
    /// Retained user+model pairs per session (0 = stateless)
    pub history_limit: usize,
    /// Bound on a single backend round trip
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:4000")
    pub bind_address: String,
    /// Maximum number of live sessions
    pub max_sessions: usize,
    /// Idle timeout in minutes before a session is evicted
    pub session_timeout_minutes: u64,
    /// Sustained requests per second per client
    pub rate_limit_per_second: f64,
    /// Burst capacity per client
    pub rate_limit_burst: f64,
    /// Origins allowed by CORS; empty disables the CORS layer
    pub cors_allow_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDR.to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
            rate_limit_per_second: DEFAULT_RATE_LIMIT_PER_SECOND,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            cors_allow_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Replace the port of the bind address, keeping the host
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        self.bind_address = format!("{host}:{port}");
    }
}

/// Generative backend connection settings
#[derive(Clone)]
pub struct BackendConfig {
    /// API key; required to serve
    pub api_key: Option<String>,
    /// API base URL (overridable for proxies and tests)
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

// Keep the key out of `?config` debug logs
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Config {
    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.relay.model.trim().is_empty() {
            bail!("model must not be empty");
        }

        if self.relay.max_output_tokens == 0 {
            bail!("max_output_tokens must be greater than 0");
        }

        if self.relay.timeout.is_zero() {
            bail!("timeout_secs must be greater than 0");
        }

        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            bail!(
                "Invalid bind address: '{}'\n\
                 Bind address should be in format 'IP:PORT', e.g. 0.0.0.0:4000",
                self.server.bind_address
            );
        }

        if self.server.max_sessions == 0 {
            bail!("max_sessions must be greater than 0");
        }

        if self.server.session_timeout_minutes == 0 {
            bail!("session_timeout_minutes must be greater than 0");
        }

        if self.server.rate_limit_per_second <= 0.0 || self.server.rate_limit_burst < 1.0 {
            bail!("rate limit must allow at least one request (per_second > 0, burst >= 1)");
        }

        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            bail!("base_url must be an http(s) URL: '{}'", self.backend.base_url);
        }

        Ok(())
    }

    /// API key, or a setup hint when none was configured
    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        match self.backend.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!(
                "No API key configured for the generative backend.\n\n\
                 Set the environment variable:\n  \
                 export GOOGLE_API_KEY=\"...\"\n\
                 or add `api_key` under [backend] in ~/{CONFIG_DIR}/{CONFIG_FILE}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.relay.model, "gemini-2.5-flash");
        assert_eq!(config.relay.max_output_tokens, 200);
    }

    #[test]
    fn test_rejects_zero_token_budget() {
        let mut config = Config::default();
        config.relay.max_output_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = Config::default();
        config.relay.timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let mut config = Config::default();
        config.server.bind_address = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_port_keeps_host() {
        let mut server = ServerConfig {
            bind_address: "127.0.0.1:4000".to_string(),
            ..Default::default()
        };
        server.set_port(8080);
        assert_eq!(server.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn test_require_api_key() {
        let mut config = Config::default();
        assert!(config.require_api_key().is_err());

        config.backend.api_key = Some("   ".to_string());
        assert!(config.require_api_key().is_err());

        config.backend.api_key = Some("test-key".to_string());
        assert_eq!(config.require_api_key().unwrap(), "test-key");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = BackendConfig {
            api_key: Some("secret-value".to_string()),
            ..Default::default()
        };
        let rendered = format!("{backend:?}");
        assert!(!rendered.contains("secret-value"));
    }
}
