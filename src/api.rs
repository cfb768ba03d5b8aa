//! HTTP webhook receiver.
//!
//! Grafana posts alert notifications here. Parsing failures are answered
//! with 400; anything that parses is accepted with 200 whether or not a
//! sound ends up playing.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PayloadError;
use crate::matcher::{Clock, Matcher};
use crate::payload;
use crate::playback::{PlaybackRequest, PlaybackSerializer};

#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<Matcher>,
    pub playback: PlaybackSerializer,
    pub clock: Arc<dyn Clock>,
    pub required_user_agent: Option<String>,
}

// --- Response types ---

#[derive(Debug, Serialize)]
struct AlertResponse {
    status: &'static str,
    alerts: usize,
    queued: usize,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    playing: bool,
    rules: usize,
    quiet_hours: QuietHoursStatus,
}

#[derive(Debug, Serialize)]
struct QuietHoursStatus {
    start_hr: u32,
    end_hr: u32,
    allowed_now: bool,
}

/// Build the axum router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_alert))
        .route("/alert", post(handle_alert))
        .route("/healthz", get(handle_health))
        .route("/status", get(handle_status))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting HTTP server on {addr}...");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
            }
        })
        .await?;

    info!("Stopping HTTP server...");
    Ok(())
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let quiet_hours = state.matcher.quiet_hours();
    Json(StatusResponse {
        playing: state.playback.is_playing(),
        rules: state.matcher.rules().len(),
        quiet_hours: QuietHoursStatus {
            start_hr: quiet_hours.start_hr(),
            end_hr: quiet_hours.end_hr(),
            allowed_now: quiet_hours.is_allowed(state.clock.current_hour()),
        },
    })
}

async fn handle_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AlertResponse>, PayloadError> {
    let events = check_user_agent(&headers, state.required_user_agent.as_deref())
        .and_then(|()| payload::decode(&body))
        .inspect_err(|e| warn!("Rejecting alert request: {e}"))?;

    let hour = state.clock.current_hour();
    let mut queued = 0;
    for event in &events {
        debug!("Got alert: {event:?}");
        let Some(file) = state.matcher.decide(event, hour) else {
            continue;
        };
        // Fire-and-forget: the response does not wait for the sound
        if state.playback.play(PlaybackRequest::new(file)).is_some() {
            queued += 1;
        }
    }

    Ok(Json(AlertResponse {
        status: "accepted",
        alerts: events.len(),
        queued,
    }))
}

fn check_user_agent(headers: &HeaderMap, required: Option<&str>) -> Result<(), PayloadError> {
    let Some(expected) = required else {
        return Ok(());
    };
    let found = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    if found == Some(expected) {
        Ok(())
    } else {
        Err(PayloadError::UserAgent {
            expected: expected.to_string(),
            found: found.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn user_agent_not_required() {
        assert!(check_user_agent(&HeaderMap::new(), None).is_ok());
    }

    #[test]
    fn user_agent_must_match_exactly() {
        let mut headers = HeaderMap::new();
        assert!(check_user_agent(&headers, Some("Grafana")).is_err());

        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8.0"));
        assert!(check_user_agent(&headers, Some("Grafana")).is_err());

        headers.insert(USER_AGENT, HeaderValue::from_static("Grafana"));
        assert!(check_user_agent(&headers, Some("Grafana")).is_ok());
    }
}
