//! HTTP endpoints
//!
//! Voice webhook and media-stream entry for the telephony provider, plus
//! transcript presentation (list, fetch, live update feed) and operational
//! endpoints.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::connection::media_stream_handler;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.settings.server.cors_origins,
        state.settings.server.cors_enabled,
    );

    Router::new()
        // Telephony entry points
        .route("/incoming", post(voice_webhook))
        .route("/connection", get(media_stream_handler))
        // Transcript presentation
        .route("/transcripts", get(list_transcripts))
        .route("/transcripts/updates", get(transcript_updates))
        .route("/transcripts/:call_sid", get(get_transcript))
        // Operational
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Voice webhook: answer with the XML that connects the call's media
/// stream to this server
async fn voice_webhook(State(state): State<AppState>) -> impl IntoResponse {
    let host = &state.settings.telephony.public_host;
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Connect><Stream url=\"wss://{}/connection\" /></Connect></Response>",
        host
    );

    tracing::info!("incoming call, streaming to wss://{}/connection", host);

    ([("content-type", "text/xml")], xml)
}

/// List known call ids
async fn list_transcripts(State(state): State<AppState>) -> Json<serde_json::Value> {
    let calls = state.transcripts.list();
    Json(serde_json::json!({
        "calls": calls,
        "count": calls.len(),
    }))
}

/// Full transcript for one call
async fn get_transcript(
    State(state): State<AppState>,
    Path(call_sid): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let lines = state
        .transcripts
        .get(&call_sid)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(serde_json::json!({
        "call_sid": call_sid,
        "transcript": lines,
    })))
}

/// Live transcript feed: the full store is pushed on every change
async fn transcript_updates(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut updates = state.transcripts.subscribe();
    let store = state.transcripts.clone();

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Event::default().data(store.snapshot().to_string()));

        loop {
            match updates.recv().await {
                Ok(_changed) => {
                    yield Ok(Event::default().data(store.snapshot().to_string()));
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("transcript feed lagged by {}", skipped);
                    yield Ok(Event::default().data(store.snapshot().to_string()));
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
        "sessions": state.sessions.count(),
    }))
}

/// Prometheus metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use call_agent_config::Settings;

    #[test]
    fn test_router_creation() {
        let state = AppState::new(Settings::default()).unwrap();
        let _ = create_router(state);
    }
}
