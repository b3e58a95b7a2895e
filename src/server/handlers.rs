use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event as SseEvent, KeepAlive},
        Html, IntoResponse, Json, Response, Sse,
    },
};
use rust_embed::RustEmbed;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use super::events::FeedEvent;
use super::refresh::run_refresh;
use super::state::AppState;
use crate::encoding::{self, bucket_label, legend_entries, VisualEncoding};
use crate::html_template::get_map_html;
use crate::settings::Settings;

#[derive(RustEmbed)]
#[folder = "frontend/"]
struct Asset;

#[derive(Debug, Serialize)]
pub struct LegendRow {
    pub lower_bound: f64,
    pub color: &'static str,
    pub label: String,
}

pub async fn index_html(State(state): State<AppState>) -> Html<String> {
    Html(get_map_html(&state.settings))
}

fn embedded(path: &str, content_type: &'static str) -> Response {
    match Asset::get(path) {
        Some(file) => ([(header::CONTENT_TYPE, content_type)], file.data.into_owned()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn style_css() -> Response {
    embedded("style.css", "text/css")
}

pub async fn script_js() -> Response {
    embedded("script.js", "application/javascript")
}

// Styled earthquake markers as GeoJSON
pub async fn get_earthquakes(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.store.earthquakes_geojson())
}

// Plate boundaries, passed through untouched
pub async fn get_faultlines(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let doc = state
        .store
        .plates_geojson()
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        doc,
    )
        .into_response())
}

pub async fn get_legend() -> Json<Vec<LegendRow>> {
    let rows = legend_entries()
        .iter()
        .enumerate()
        .map(|(i, bucket)| LegendRow {
            lower_bound: bucket.lower_bound,
            color: bucket.color,
            label: bucket_label(i),
        })
        .collect();
    Json(rows)
}

/// `/api/encode?mag=4.7`
pub async fn encode_magnitude(
    Query(query_params): Query<HashMap<String, String>>,
) -> Result<Json<VisualEncoding>, (StatusCode, Json<serde_json::Value>)> {
    let bad_request = |message: String| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "status": "error", "message": message })),
        )
    };

    let raw = query_params
        .get("mag")
        .ok_or_else(|| bad_request("missing `mag` parameter".to_string()))?;
    let magnitude = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| bad_request(format!("`{}` is not a number", raw)))?;

    encoding::encode(magnitude)
        .map(Json)
        .map_err(|e| bad_request(e.to_string()))
}

pub async fn get_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.store.snapshot();
    Json(serde_json::json!({
        "markers": snapshot.markers.len(),
        "fault_lines_loaded": snapshot.plates_geojson.is_some(),
        "fetched_at": snapshot.fetched_at.map(|t| t.to_rfc3339()),
        "refreshing": state.refreshing.load(Ordering::SeqCst),
        "stats": snapshot.stats,
    }))
}

// API endpoint to get current settings (token is never serialized)
pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(Settings::clone(&state.settings))
}

// API endpoint to start a feed refresh in the background
pub async fn trigger_refresh(State(state): State<AppState>) -> Json<serde_json::Value> {
    if state.refreshing.load(Ordering::SeqCst) {
        return Json(serde_json::json!({
            "status": "busy",
            "message": "A refresh is already running"
        }));
    }

    tokio::spawn(async move {
        run_refresh(&state).await;
    });

    Json(serde_json::json!({
        "status": "started",
        "message": "Refreshing earthquake and plate boundary feeds"
    }))
}

// SSE endpoint for refresh notifications
pub async fn feed_events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);
    let mut event_receiver = state.event_sender.subscribe();

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                received = event_receiver.recv() => match received {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "SSE client lagged behind");
                        continue;
                    }
                    Err(_) => break, // Channel closed
                },
                _ = tokio::time::sleep(Duration::from_secs(30)) => FeedEvent::heartbeat(),
            };

            let sse_event = SseEvent::default()
                .json_data(&event)
                .unwrap_or_else(|_| SseEvent::default().data("Error serializing event"));

            if tx.send(Ok(sse_event)).await.is_err() {
                break; // Client disconnected
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive-message"),
    )
}
