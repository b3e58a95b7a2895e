use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::constants::{CACHE_VERSION, CIRCLE_FILL_OPACITY};
use crate::utils::escape_html;

// One encoded earthquake, ready to be drawn as a circle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuakeMarker {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub depth_km: Option<f64>,
    pub magnitude: f64,
    pub place: String,
    pub time_ms: Option<i64>,
    pub url: Option<String>,
    pub radius: f64,
    pub color: String,
}

impl QuakeMarker {
    /// Popup body: place as a heading, then the event time.
    pub fn popup_html(&self) -> String {
        format!(
            "<h3>{}</h3><hr><p>{}</p>",
            escape_html(&self.place),
            format_event_time(self.time_ms)
        )
    }

    pub fn to_geojson(&self) -> serde_json::Value {
        let mut coordinates = vec![self.lng, self.lat];
        if let Some(depth) = self.depth_km {
            coordinates.push(depth);
        }

        serde_json::json!({
            "type": "Feature",
            "id": self.id,
            "geometry": {
                "type": "Point",
                "coordinates": coordinates,
            },
            "properties": {
                "mag": self.magnitude,
                "place": self.place,
                "time": self.time_ms,
                "url": self.url,
                "radius": self.radius,
                "color": self.color,
                "fillColor": self.color,
                "fillOpacity": CIRCLE_FILL_OPACITY,
                "popup": self.popup_html(),
            }
        })
    }
}

pub fn format_event_time(time_ms: Option<i64>) -> String {
    match time_ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
        Some(time) => time.format("%a %b %d %Y %H:%M:%S UTC").to_string(),
        None => "Unknown time".to_string(),
    }
}

// Counters for one refresh pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RefreshStats {
    pub total_features: usize,
    pub encoded: usize,
    pub skipped_invalid_magnitude: usize,
    pub skipped_missing_geometry: usize,
    pub plate_features: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub markers: Vec<QuakeMarker>,
    /// Plate boundary FeatureCollection, kept as the raw document.
    pub plates_geojson: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub stats: RefreshStats,
}

// Structure for disk persistence
#[derive(Serialize, Deserialize)]
pub struct CachedFeeds {
    pub version: u32,
    pub source_urls: Vec<String>,
    pub markers: Vec<QuakeMarker>,
    pub plates_geojson: Option<String>,
    /// Unix milliseconds
    pub fetched_at_ms: Option<i64>,
}

// Shared in-memory store of the latest feed data
#[derive(Clone, Default)]
pub struct FeedStore {
    snapshot: Arc<RwLock<FeedSnapshot>>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_markers(&self, markers: Vec<QuakeMarker>, stats: RefreshStats) {
        let mut snapshot = self.write();
        let plate_features = snapshot.stats.plate_features;
        snapshot.markers = markers;
        snapshot.stats = RefreshStats { plate_features, ..stats };
        snapshot.fetched_at = Some(Utc::now());
    }

    pub fn replace_plates(&self, plates_geojson: String, plate_features: usize) {
        let mut snapshot = self.write();
        snapshot.plates_geojson = Some(plates_geojson);
        snapshot.stats.plate_features = plate_features;
    }

    pub fn marker_count(&self) -> usize {
        self.read().markers.len()
    }

    pub fn plates_geojson(&self) -> Option<String> {
        self.read().plates_geojson.clone()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.read().clone()
    }

    /// Stored markers as a GeoJSON FeatureCollection with style properties.
    pub fn earthquakes_geojson(&self) -> serde_json::Value {
        let snapshot = self.read();
        let features: Vec<serde_json::Value> =
            snapshot.markers.iter().map(QuakeMarker::to_geojson).collect();

        serde_json::json!({
            "type": "FeatureCollection",
            "metadata": {
                "count": features.len(),
                "generated": snapshot.fetched_at.map(|t| t.to_rfc3339()),
            },
            "features": features,
        })
    }

    /// Save the current feed state to disk using bincode
    pub fn save_to_disk(&self, cache_path: &Path, source_urls: &[String]) -> Result<()> {
        let cache = {
            let snapshot = self.read();
            CachedFeeds {
                version: CACHE_VERSION,
                source_urls: source_urls.to_vec(),
                markers: snapshot.markers.clone(),
                plates_geojson: snapshot.plates_geojson.clone(),
                fetched_at_ms: snapshot.fetched_at.map(|t| t.timestamp_millis()),
            }
        };

        if let Some(parent) = cache_path.parent() {
            crate::utils::ensure_directory_exists(parent)?;
        }

        let file = std::fs::File::create(cache_path)?;
        let mut writer = std::io::BufWriter::new(file);
        bincode::serialize_into(&mut writer, &cache)?;
        writer.flush()?;
        tracing::debug!(path = %cache_path.display(), markers = cache.markers.len(), "feed cache saved");

        Ok(())
    }

    /// Load cached feeds if the source URLs match exactly.
    /// Returns `false` when there is nothing usable on disk.
    pub fn load_from_disk(&self, cache_path: &Path, expected_urls: &[String]) -> Result<bool> {
        if !cache_path.exists() {
            return Ok(false);
        }

        let file = std::fs::File::open(cache_path)?;
        let cache: CachedFeeds = match bincode::deserialize_from(std::io::BufReader::new(file)) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "feed cache corrupted or incompatible, deleting");
                let _ = std::fs::remove_file(cache_path);
                return Ok(false);
            }
        };

        if cache.version != CACHE_VERSION {
            tracing::warn!(found = cache.version, expected = CACHE_VERSION, "feed cache version mismatch, deleting");
            let _ = std::fs::remove_file(cache_path);
            return Ok(false);
        }

        if cache.source_urls != expected_urls {
            tracing::info!("feed cache was built from different sources, ignoring");
            return Ok(false);
        }

        let mut snapshot = self.write();
        snapshot.stats = RefreshStats {
            total_features: cache.markers.len(),
            encoded: cache.markers.len(),
            ..RefreshStats::default()
        };
        snapshot.markers = cache.markers;
        snapshot.plates_geojson = cache.plates_geojson;
        snapshot.fetched_at = cache
            .fetched_at_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        Ok(true)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, FeedSnapshot> {
        self.snapshot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, FeedSnapshot> {
        self.snapshot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
