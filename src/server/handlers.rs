// HTTP request handlers

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, Request},
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::middleware::rate_limit_middleware;
use super::types::{
    ChatRequest, ChatResponse, ContextAccepted, ContextUpdate, EvictResponse, HealthResponse,
};
use super::RelayServer;
use crate::config::constants::{
    ANONYMOUS_SESSION, MAX_BODY_BYTES, MAX_SESSION_ID_LEN, SESSION_COOKIE, SESSION_HEADER,
};
use crate::context::{self, ConversationContext};
use crate::error::{RelayError, Result};

/// Create the router with all routes and layers
pub fn create_router(server: Arc<RelayServer>) -> Router {
    let limiter = server.rate_limiter().clone();
    let cors = server.cors().cloned();

    let router = Router::new()
        .route(
            "/ai-context",
            post(handle_set_context).delete(handle_clear_context),
        )
        .route("/ai", post(handle_chat))
        .route("/health", get(health_check))
        .with_state(server)
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<axum::body::Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        );

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Session key: `x-session-id` header, else the session cookie, else the
/// shared anonymous key
pub fn session_key(headers: &HeaderMap) -> Result<String> {
    let from_header = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let from_cookie = || {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.trim())
            .filter(|v| !v.is_empty())
    };

    let key = from_header.or_else(from_cookie).unwrap_or(ANONYMOUS_SESSION);
    if key.len() > MAX_SESSION_ID_LEN {
        return Err(RelayError::Validation(format!(
            "session key longer than {MAX_SESSION_ID_LEN} bytes"
        )));
    }
    Ok(key.to_string())
}

fn parse_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| RelayError::Validation(rejection.body_text()))
}

/// POST /ai-context: replace the caller's conversation context
pub async fn handle_set_context(
    State(server): State<Arc<RelayServer>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ContextAccepted>> {
    let session_id = session_key(&headers)?;
    let update = ContextUpdate::from_json(parse_body(payload)?)?;

    let context = match update {
        ContextUpdate::Prebuilt { context } => {
            ConversationContext::from_narrative(server.persona(), &context)?
        }
        ContextUpdate::Structured(payloads) => context::build(server.persona(), &payloads)?,
    };

    let context_chars = context.len();
    let created = server.store().set_context(&session_id, context);
    tracing::info!(session_id = %session_id, created, context_chars, "context updated");

    Ok(Json(ContextAccepted::default()))
}

/// POST /ai: one chat turn
pub async fn handle_chat(
    State(server): State<Arc<RelayServer>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let session_id = session_key(&headers)?;
    let request = parse_body(payload)?;

    let summary = server
        .dispatcher()
        .reply(&session_id, &request.prompt)
        .await?;

    Ok(Json(ChatResponse { summary }))
}

/// DELETE /ai-context: forget the caller's session
pub async fn handle_clear_context(
    State(server): State<Arc<RelayServer>>,
    headers: HeaderMap,
) -> Result<Json<EvictResponse>> {
    let session_id = session_key(&headers)?;
    let evicted = server.store().evict(&session_id);
    tracing::info!(session_id = %session_id, evicted, "session cleared");
    Ok(Json(EvictResponse { evicted }))
}

/// GET /health
pub async fn health_check(State(server): State<Arc<RelayServer>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: server.store().len(),
        model: server.dispatcher().config().model.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_key_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("  tab-42 "));
        headers.insert(header::COOKIE, HeaderValue::from_static("birdie_session=other"));
        assert_eq!(session_key(&headers).unwrap(), "tab-42");
    }

    #[test]
    fn test_session_key_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; birdie_session=abc123; lang=en"),
        );
        assert_eq!(session_key(&headers).unwrap(), "abc123");
    }

    #[test]
    fn test_session_key_defaults_to_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("   "));
        assert_eq!(session_key(&headers).unwrap(), ANONYMOUS_SESSION);
    }

    #[test]
    fn test_session_key_too_long() {
        let mut headers = HeaderMap::new();
        let long = "x".repeat(MAX_SESSION_ID_LEN + 1);
        headers.insert(SESSION_HEADER, HeaderValue::from_str(&long).unwrap());
        assert!(matches!(session_key(&headers), Err(RelayError::Validation(_))));
    }
}
