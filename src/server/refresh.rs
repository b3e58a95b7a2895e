use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::events::FeedEvent;
use super::state::AppState;
use crate::feeds::{refresh_feeds, RefreshOutcome};

// Clears the busy flag however the refresh ends
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs one refresh of both feeds and announces the result.
/// Returns `None` when another refresh is already running.
pub async fn run_refresh(state: &AppState) -> Option<RefreshOutcome> {
    if state.refreshing.swap(true, Ordering::SeqCst) {
        tracing::debug!("refresh already in progress");
        return None;
    }
    let _guard = RefreshGuard(&state.refreshing);

    let _ = state.event_sender.send(FeedEvent::started());

    let urls = state.source_urls();
    let outcome = refresh_feeds(&state.client, &state.store, &urls[0], &urls[1]).await;

    if let Some(ref message) = outcome.quake_error {
        let _ = state.event_sender.send(FeedEvent::error("earthquakes", message.clone()));
    }
    if let Some(ref message) = outcome.plates_error {
        let _ = state.event_sender.send(FeedEvent::error("faultlines", message.clone()));
    }

    if outcome.is_complete() {
        tracing::debug!("both feeds refreshed");
    }

    let anything_new = outcome.quake_error.is_none() || outcome.plates_error.is_none();
    if anything_new {
        if let Some(ref path) = state.cache_path {
            let store = state.store.clone();
            let path = path.clone();
            let result =
                tokio::task::spawn_blocking(move || store.save_to_disk(&path, &urls)).await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "failed to write feed cache"),
                Err(e) => tracing::warn!(error = %e, "feed cache task failed"),
            }
        }

        let snapshot = state.store.snapshot();
        let _ = state
            .event_sender
            .send(FeedEvent::refreshed(&snapshot.stats, snapshot.markers.len()));
    }

    Some(outcome)
}

/// Refreshes immediately, then every `interval_secs`. An interval of 0 only
/// does the initial refresh.
pub fn spawn_refresh_loop(state: AppState, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if interval_secs == 0 {
            run_refresh(&state).await;
            return;
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_refresh(&state).await;
        }
    })
}
