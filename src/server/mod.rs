use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

pub mod events;
pub mod handlers;
pub mod refresh;
pub mod state;

pub use self::refresh::spawn_refresh_loop;
pub use self::state::AppState;
use handlers::{
    encode_magnitude, feed_events_stream, get_earthquakes, get_faultlines, get_legend,
    get_settings, get_status, index_html, script_js, style_css, trigger_refresh,
};

// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_html))
        .route("/style.css", get(style_css))
        .route("/script.js", get(script_js))
        .route("/api/earthquakes", get(get_earthquakes))
        .route("/api/faultlines", get(get_faultlines))
        .route("/api/legend", get(get_legend))
        .route("/api/encode", get(encode_magnitude))
        .route("/api/status", get(get_status))
        .route("/api/settings", get(get_settings))
        .route("/api/refresh", post(trigger_refresh))
        .route("/api/events", get(feed_events_stream))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = create_app(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("HTTP server listening at http://{}", addr);
    tracing::info!("  GET  /api/earthquakes  styled earthquake GeoJSON");
    tracing::info!("  GET  /api/faultlines   tectonic plate boundaries");
    tracing::info!("  GET  /api/encode?mag=  magnitude -> radius/color");
    tracing::info!("  POST /api/refresh      refetch both feeds");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{FeedStore, QuakeMarker, RefreshStats};
    use crate::settings::Settings;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(
            FeedStore::new(),
            Settings::default(),
            crate::feeds::http_client().unwrap(),
            None,
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn encode_endpoint_returns_style() {
        let (status, body) = get_json(create_app(test_state()), "/api/encode?mag=5.2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["color"], "#ea2c2c");
        assert_eq!(body["radius"], 5.2 * crate::constants::CIRCLE_RADIUS_SCALE);
    }

    #[tokio::test]
    async fn encode_endpoint_rejects_bad_input() {
        let (status, body) = get_json(create_app(test_state()), "/api/encode?mag=NaN").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("invalid magnitude"));

        let (status, _) = get_json(create_app(test_state()), "/api/encode?mag=strong").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(create_app(test_state()), "/api/encode").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json(create_app(test_state()), "/api/encode?mag=1e305").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("invalid magnitude"));
    }

    #[tokio::test]
    async fn legend_endpoint_matches_encoder_table() {
        let (status, body) = get_json(create_app(test_state()), "/api/legend").await;
        assert_eq!(status, StatusCode::OK);

        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), crate::encoding::MAGNITUDE_BUCKETS.len());
        for (row, bucket) in rows.iter().zip(crate::encoding::legend_entries()) {
            assert_eq!(row["color"], bucket.color);
            assert_eq!(row["lower_bound"], bucket.lower_bound);
        }
        assert_eq!(rows[5]["label"], "5+");
    }

    #[tokio::test]
    async fn faultlines_unavailable_until_loaded() {
        let state = test_state();
        let (status, _) = get_json(create_app(state.clone()), "/api/faultlines").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state
            .store
            .replace_plates(r#"{"type":"FeatureCollection","features":[]}"#.to_string(), 0);
        let (status, body) = get_json(create_app(state), "/api/faultlines").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "FeatureCollection");
    }

    #[tokio::test]
    async fn earthquakes_endpoint_serves_store() {
        let state = test_state();
        state.store.replace_markers(
            vec![QuakeMarker {
                id: "hv1".to_string(),
                lat: 19.4,
                lng: -155.3,
                depth_km: Some(2.0),
                magnitude: 3.1,
                place: "5 km SW of Volcano, Hawaii".to_string(),
                time_ms: Some(1_700_000_000_000),
                url: None,
                radius: crate::encoding::radius(3.1),
                color: crate::encoding::color(3.1).to_string(),
            }],
            RefreshStats::default(),
        );

        let (status, body) = get_json(create_app(state.clone()), "/api/earthquakes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["features"][0]["id"], "hv1");
        assert_eq!(body["features"][0]["properties"]["color"], "#ee9c00");

        let (_, status_body) = get_json(create_app(state), "/api/status").await;
        assert_eq!(status_body["markers"], 1);
        assert_eq!(status_body["fault_lines_loaded"], false);
    }

    #[tokio::test]
    async fn index_and_assets_are_served() {
        let app = create_app(test_state());
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = response.into_body().collect().await.unwrap().to_bytes();
        assert!(std::str::from_utf8(&html).unwrap().contains("window.QUAKEMAP_CONFIG"));

        let response = app
            .oneshot(Request::builder().uri("/script.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            "application/javascript"
        );
    }

    #[tokio::test]
    async fn refresh_reports_busy() {
        let state = test_state();
        state
            .refreshing
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let response = create_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "busy");
    }
}
