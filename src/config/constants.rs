// Project-wide constants
//
// Centralised here so ports, limits and other magic values have one
// source of truth. Import via `use crate::config::constants::*;`.

/// Default listening port, matching the dashboard's reverse proxy (`AI_PORT`).
pub const DEFAULT_PORT: u16 = 4000;

/// Default bind address (all interfaces, behind the dashboard's proxy).
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";

/// Model identifier sent to the generative backend. Fixed per process.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Upper bound on reply length per backend call.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 200;

/// Number of user+model pairs retained per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Backend call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Base URL of the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sessions idle longer than this are evicted.
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u64 = 30;

/// Maximum number of live sessions before the least recently active is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Sustained requests per second allowed per client.
pub const DEFAULT_RATE_LIMIT_PER_SECOND: f64 = 2.0;

/// Burst capacity per client.
pub const DEFAULT_RATE_LIMIT_BURST: f64 = 10.0;

/// Largest accepted request body (stat payloads are a few KiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Header carrying the caller's session key.
pub const SESSION_HEADER: &str = "x-session-id";

/// Cookie carrying the caller's session key when the header is absent.
pub const SESSION_COOKIE: &str = "birdie_session";

/// Session key used when the caller supplies none.
pub const ANONYMOUS_SESSION: &str = "anonymous";

/// Longest accepted session key.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// How often idle sessions and rate-limit buckets are swept.
pub const JANITOR_INTERVAL_SECS: u64 = 60;

/// Config file location under the home directory.
pub const CONFIG_DIR: &str = ".birdie";
pub const CONFIG_FILE: &str = "config.toml";
