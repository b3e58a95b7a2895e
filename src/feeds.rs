use rayon::prelude::*;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::constants::FETCH_TIMEOUT_SECS;
use crate::database::{FeedStore, QuakeMarker, RefreshStats};
use crate::encoding::{self, EncodingError};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("document is not a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    #[error("marker encoding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// Subset of the USGS summary feed that the map needs
#[derive(Debug, Clone, Deserialize)]
pub struct QuakeCollection {
    #[serde(default)]
    pub features: Vec<QuakeFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuakeFeature {
    #[serde(default)]
    pub id: Option<String>,
    /// GeoJSON allows `"properties": null`.
    #[serde(default)]
    pub properties: Option<QuakeProperties>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuakeProperties {
    #[serde(default)]
    pub mag: Option<f64>,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: serde_json::Value,
}

impl Geometry {
    /// `(lat, lng, depth)` for a Point with in-range coordinates.
    pub fn point(&self) -> Option<(f64, f64, Option<f64>)> {
        if self.kind != "Point" {
            return None;
        }
        let coords = self.coordinates.as_array()?;
        let lng = coords.first()?.as_f64()?;
        let lat = coords.get(1)?.as_f64()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        let depth = coords.get(2).and_then(|d| d.as_f64());
        Some((lat, lng, depth))
    }
}

#[derive(Debug)]
pub enum SkipReason {
    InvalidMagnitude(EncodingError),
    MissingGeometry,
}

#[derive(Debug, Default)]
pub struct RefreshOutcome {
    pub stats: RefreshStats,
    pub quake_error: Option<String>,
    pub plates_error: Option<String>,
}

impl RefreshOutcome {
    pub fn is_complete(&self) -> bool {
        self.quake_error.is_none() && self.plates_error.is_none()
    }
}

pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .user_agent(concat!("quakemap/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub fn parse_earthquakes(body: &[u8]) -> Result<Vec<QuakeFeature>, FeedError> {
    let collection: QuakeCollection = serde_json::from_slice(body)?;
    Ok(collection.features)
}

/// Checks the plate document is a FeatureCollection and counts its features.
pub fn inspect_plates(body: &str) -> Result<usize, FeedError> {
    let doc: serde_json::Value = serde_json::from_str(body)?;
    if doc.get("type").and_then(|t| t.as_str()) != Some("FeatureCollection") {
        return Err(FeedError::NotFeatureCollection);
    }
    doc.get("features")
        .and_then(|f| f.as_array())
        .map(|features| features.len())
        .ok_or(FeedError::NotFeatureCollection)
}

pub fn to_marker(index: usize, feature: &QuakeFeature) -> Result<QuakeMarker, SkipReason> {
    let properties = feature.properties.as_ref();
    let magnitude = properties.and_then(|p| p.mag).unwrap_or(f64::NAN);
    let style = encoding::encode(magnitude).map_err(SkipReason::InvalidMagnitude)?;

    let (lat, lng, depth_km) = feature
        .geometry
        .as_ref()
        .and_then(Geometry::point)
        .ok_or(SkipReason::MissingGeometry)?;

    Ok(QuakeMarker {
        id: feature.id.clone().unwrap_or_else(|| format!("quake-{}", index)),
        lat,
        lng,
        depth_km,
        magnitude,
        place: properties
            .and_then(|p| p.place.clone())
            .unwrap_or_else(|| "Unknown location".to_string()),
        time_ms: properties.and_then(|p| p.time),
        url: properties.and_then(|p| p.url.clone()),
        radius: style.radius,
        color: style.color.to_string(),
    })
}

/// Encodes every feature in parallel. Output keeps feed order.
pub fn build_markers(features: &[QuakeFeature]) -> (Vec<QuakeMarker>, RefreshStats) {
    let results: Vec<Result<QuakeMarker, SkipReason>> = features
        .par_iter()
        .enumerate()
        .map(|(i, feature)| to_marker(i, feature))
        .collect();

    let mut stats = RefreshStats {
        total_features: features.len(),
        ..RefreshStats::default()
    };
    let mut markers = Vec::with_capacity(results.len());

    for result in results {
        match result {
            Ok(marker) => markers.push(marker),
            Err(SkipReason::InvalidMagnitude(e)) => {
                tracing::trace!(error = %e, "skipping feature");
                stats.skipped_invalid_magnitude += 1;
            }
            Err(SkipReason::MissingGeometry) => stats.skipped_missing_geometry += 1,
        }
    }
    stats.encoded = markers.len();

    (markers, stats)
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String, FeedError> {
    let http_err = |source: reqwest::Error| FeedError::Http {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(http_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().await.map_err(http_err)
}

pub async fn fetch_earthquakes(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<QuakeFeature>, FeedError> {
    let body = fetch_body(client, url).await?;
    parse_earthquakes(body.as_bytes())
}

pub async fn fetch_plates(client: &reqwest::Client, url: &str) -> Result<(String, usize), FeedError> {
    let body = fetch_body(client, url).await?;
    let count = inspect_plates(&body)?;
    Ok((body, count))
}

/// Fetches both feeds concurrently. Each one is stored as soon as it is
/// ready; a failure in one leaves the other (and the previous data) intact.
pub async fn refresh_feeds(
    client: &reqwest::Client,
    store: &FeedStore,
    quake_url: &str,
    plates_url: &str,
) -> RefreshOutcome {
    let start = Instant::now();

    let quakes = async {
        let features = fetch_earthquakes(client, quake_url).await?;
        let (markers, mut stats) =
            tokio::task::spawn_blocking(move || build_markers(&features)).await?;
        stats.duration_ms = start.elapsed().as_millis() as u64;
        store.replace_markers(markers, stats.clone());
        Ok::<_, FeedError>(stats)
    };

    let plates = async {
        let (doc, count) = fetch_plates(client, plates_url).await?;
        store.replace_plates(doc, count);
        Ok::<_, FeedError>(count)
    };

    let (quakes, plates) = tokio::join!(quakes, plates);
    let mut outcome = RefreshOutcome::default();

    match quakes {
        Ok(stats) => {
            tracing::info!(
                total = stats.total_features,
                encoded = stats.encoded,
                invalid_magnitude = stats.skipped_invalid_magnitude,
                missing_geometry = stats.skipped_missing_geometry,
                elapsed_ms = stats.duration_ms,
                "earthquake feed refreshed"
            );
            outcome.stats = stats;
        }
        Err(e) => {
            tracing::warn!(error = %e, url = quake_url, "earthquake feed refresh failed");
            outcome.quake_error = Some(e.to_string());
        }
    }

    match plates {
        Ok(count) => {
            tracing::info!(features = count, "plate boundaries refreshed");
            outcome.stats.plate_features = count;
        }
        Err(e) => {
            tracing::warn!(error = %e, url = plates_url, "plate boundary refresh failed");
            outcome.plates_error = Some(e.to_string());
        }
    }

    outcome
}
