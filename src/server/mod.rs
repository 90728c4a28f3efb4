// Birdie relay HTTP server
// Routes the dashboard's context updates and chat turns to the dispatcher

mod handlers;
mod middleware;
pub mod types;

pub use handlers::{
    create_router, handle_chat, handle_clear_context, handle_set_context, health_check,
    session_key,
};
pub use middleware::{rate_limit_middleware, RateLimiter};
pub use types::{ChatRequest, ChatResponse, ContextUpdate, EvictResponse, HealthResponse};

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::config::constants::JANITOR_INTERVAL_SECS;
use crate::config::{Config, PersonaPolicy, ServerConfig};
use crate::conversation::SessionStore;
use crate::providers::LlmProvider;
use crate::relay::RelayDispatcher;

/// Shared state behind every route
pub struct RelayServer {
    dispatcher: RelayDispatcher,
    persona: PersonaPolicy,
    config: ServerConfig,
    rate_limiter: RateLimiter,
    cors: Option<CorsLayer>,
}

impl RelayServer {
    /// Wire a session store and dispatcher around `provider`
    pub fn new(
        config: &Config,
        persona: PersonaPolicy,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let store = Arc::new(SessionStore::new(
            config.relay.history_limit,
            config.server.max_sessions,
        ));
        let dispatcher = RelayDispatcher::new(store, provider, &persona, config.relay.clone());
        let rate_limiter = RateLimiter::new(
            config.server.rate_limit_per_second,
            config.server.rate_limit_burst,
        );
        let cors = cors_layer(&config.server.cors_allow_origins)?;

        Ok(Self {
            dispatcher,
            persona,
            config: config.server.clone(),
            rate_limiter,
            cors,
        })
    }

    /// Bind and serve until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.config.bind_address))?;

        let janitor = self.spawn_janitor();
        let app = create_router(Arc::new(self));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        tracing::info!("Starting Birdie relay on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

        janitor.abort();
        Ok(())
    }

    /// Periodically drop idle sessions and stale rate-limit buckets
    fn spawn_janitor(&self) -> JoinHandle<()> {
        let store = Arc::clone(self.store());
        let limiter = self.rate_limiter.clone();
        let idle = Duration::from_secs(self.config.session_timeout_minutes * 60);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(JANITOR_INTERVAL_SECS));
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(idle);
                let purged = limiter.purge_idle(idle);
                if evicted > 0 || purged > 0 {
                    tracing::debug!(evicted, purged, live = store.len(), "janitor sweep");
                }
            }
        })
    }

    pub fn dispatcher(&self) -> &RelayDispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        self.dispatcher.store()
    }

    pub fn persona(&self) -> &PersonaPolicy {
        &self.persona
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn cors(&self) -> Option<&CorsLayer> {
        self.cors.as_ref()
    }
}

fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>> {
    if origins.is_empty() {
        return Ok(None);
    }

    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{o}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_disabled_without_origins() {
        assert!(cors_layer(&[]).unwrap().is_none());
    }

    #[test]
    fn test_cors_rejects_bad_origin() {
        assert!(cors_layer(&["https://ok.example".to_string()]).unwrap().is_some());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_err());
    }
}
