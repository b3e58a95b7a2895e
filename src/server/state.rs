use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::events::FeedEvent;
use crate::database::FeedStore;
use crate::settings::Settings;

// Application state shared by handlers and the refresh task
#[derive(Clone)]
pub struct AppState {
    pub store: FeedStore,
    pub settings: Arc<Settings>,
    pub event_sender: broadcast::Sender<FeedEvent>,
    pub client: reqwest::Client,
    /// `None` disables the on-disk feed cache.
    pub cache_path: Option<PathBuf>,
    pub refreshing: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        store: FeedStore,
        settings: Settings,
        client: reqwest::Client,
        cache_path: Option<PathBuf>,
    ) -> Self {
        let (event_sender, _) = broadcast::channel(100);
        Self {
            store,
            settings: Arc::new(settings),
            event_sender,
            client,
            cache_path,
            refreshing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Feed URLs in the order the cache records them.
    pub fn source_urls(&self) -> Vec<String> {
        vec![
            self.settings.quake_feed_url.clone(),
            self.settings.plates_feed_url.clone(),
        ]
    }
}
