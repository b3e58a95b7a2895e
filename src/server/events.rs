use serde::{Deserialize, Serialize};

use crate::database::RefreshStats;

// SSE Event types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEvent {
    pub event_type: String,
    pub data: FeedEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeedEventData {
    pub markers: Option<usize>,
    pub total_features: Option<usize>,
    pub skipped_invalid_magnitude: Option<usize>,
    pub skipped_missing_geometry: Option<usize>,
    pub plate_features: Option<usize>,
    pub duration_ms: Option<u64>,
    pub feed: Option<String>,
    pub message: Option<String>,
    pub phase: Option<String>,
}

impl FeedEvent {
    pub fn started() -> Self {
        Self {
            event_type: "refresh_started".to_string(),
            data: FeedEventData {
                message: Some("Fetching earthquake and plate boundary feeds".to_string()),
                phase: Some("fetching".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn refreshed(stats: &RefreshStats, markers: usize) -> Self {
        Self {
            event_type: "feed_refreshed".to_string(),
            data: FeedEventData {
                markers: Some(markers),
                total_features: Some(stats.total_features),
                skipped_invalid_magnitude: Some(stats.skipped_invalid_magnitude),
                skipped_missing_geometry: Some(stats.skipped_missing_geometry),
                plate_features: Some(stats.plate_features),
                duration_ms: Some(stats.duration_ms),
                message: Some(format!("{} earthquakes on the map", markers)),
                phase: Some("completed".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn error(feed: &str, message: String) -> Self {
        Self {
            event_type: "feed_error".to_string(),
            data: FeedEventData {
                feed: Some(feed.to_string()),
                message: Some(message),
                phase: Some("error".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn heartbeat() -> Self {
        Self {
            event_type: "heartbeat".to_string(),
            data: FeedEventData {
                message: Some("SSE connection alive".to_string()),
                ..Default::default()
            },
        }
    }
}
