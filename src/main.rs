use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

mod constants;
mod database;
mod encoding;
mod feeds;
mod html_template;
mod server;
mod settings;
mod utils;

use database::FeedStore;
use server::{spawn_refresh_loop, start_server, AppState};
use settings::Settings;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quakemap=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    tracing::info!("QuakeMap v{} starting", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load().context("Failed to load settings")?;
    tracing::info!(
        config = %Settings::config_path().display(),
        port = settings.port,
        refresh_secs = settings.refresh_interval_secs,
        mapbox = settings.mapbox_token.is_some(),
        "settings loaded"
    );
    if !Settings::config_path().exists() {
        if let Err(e) = settings.save() {
            tracing::warn!(error = %e, "could not write default config file");
        }
    }

    // Serve cached data until the first refresh lands
    let store = FeedStore::new();
    let cache_path = utils::get_cache_path();
    let sources = vec![settings.quake_feed_url.clone(), settings.plates_feed_url.clone()];
    match store.load_from_disk(&cache_path, &sources) {
        Ok(true) => tracing::info!(markers = store.marker_count(), "restored feeds from cache"),
        Ok(false) => tracing::info!("no usable feed cache, waiting for first fetch"),
        Err(e) => tracing::warn!(error = %e, "failed to read feed cache"),
    }

    let client = feeds::http_client().context("Failed to build HTTP client")?;
    let port = settings.port;
    let refresh_secs = settings.refresh_interval_secs;
    let state = AppState::new(store, settings, client, Some(cache_path));

    let refresher = spawn_refresh_loop(state.clone(), refresh_secs);

    let served = start_server(state, port).await;
    refresher.abort();
    served.with_context(|| format!("HTTP server on port {} failed", port))?;

    tracing::info!("bye");
    Ok(())
}
