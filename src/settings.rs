use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_CENTER, DEFAULT_PLATES_FEED_URL, DEFAULT_PORT, DEFAULT_QUAKE_FEED_URL,
    DEFAULT_REFRESH_SECS, DEFAULT_ZOOM,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub quake_feed_url: String,
    pub plates_feed_url: String,
    /// Seconds between background refreshes, 0 disables the timer.
    pub refresh_interval_secs: u64,
    /// Enables the Mapbox base layers; OpenStreetMap is used without it.
    #[serde(default, skip_serializing)]
    pub mapbox_token: Option<String>,
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            quake_feed_url: DEFAULT_QUAKE_FEED_URL.to_string(),
            plates_feed_url: DEFAULT_PLATES_FEED_URL.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            mapbox_token: None,
            center_lat: DEFAULT_CENTER.0,
            center_lng: DEFAULT_CENTER.1,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl Settings {
    /// Loads from the default config file, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::config_path())?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut settings = Settings::default();
        if !config_path.exists() {
            return Ok(settings);
        }

        let file = File::open(config_path).context("Failed to open config file")?;
        let reader = BufReader::new(file);
        let mut config_map = HashMap::new();

        for line in reader.lines() {
            let line = line.context("Failed to read line from config")?;
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(
                    key.trim().to_string(),
                    value.trim().trim_matches('"').to_string(),
                );
            }
        }

        settings.apply(|key| config_map.get(key).cloned());
        Ok(settings)
    }

    /// Environment wins over the file. `MAPBOX_ACCESS_TOKEN` is accepted as
    /// a fallback name for the token.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply(|key| {
            let env_key = format!("QUAKEMAP_{}", key.to_uppercase());
            lookup(&env_key).or_else(|| match key {
                "mapbox_token" => lookup("MAPBOX_ACCESS_TOKEN"),
                "refresh_interval_secs" => lookup("QUAKEMAP_REFRESH_SECS"),
                _ => None,
            })
        });
    }

    fn apply<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = get("port").and_then(|v| v.parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(url) = get("quake_feed_url").filter(|v| !v.is_empty()) {
            self.quake_feed_url = url;
        }
        if let Some(url) = get("plates_feed_url").filter(|v| !v.is_empty()) {
            self.plates_feed_url = url;
        }
        if let Some(secs) = get("refresh_interval_secs").and_then(|v| v.parse::<u64>().ok()) {
            self.refresh_interval_secs = secs;
        }
        if let Some(token) = get("mapbox_token") {
            self.mapbox_token = if token.is_empty() { None } else { Some(token) };
        }
        if let Some(lat) = get("center_lat").and_then(|v| v.parse::<f64>().ok()) {
            if (-90.0..=90.0).contains(&lat) {
                self.center_lat = lat;
            }
        }
        if let Some(lng) = get("center_lng").and_then(|v| v.parse::<f64>().ok()) {
            if (-180.0..=180.0).contains(&lng) {
                self.center_lng = lng;
            }
        }
        if let Some(zoom) = get("zoom").and_then(|v| v.parse::<u8>().ok()) {
            self.zoom = zoom;
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Creating config directory")?;
        }

        let mut content = String::new();
        content.push_str("# QuakeMap Configuration File\n");
        content.push_str(&format!("port = {}\n", self.port));
        content.push_str(&format!("quake_feed_url = \"{}\"\n", self.quake_feed_url));
        content.push_str(&format!("plates_feed_url = \"{}\"\n", self.plates_feed_url));
        content.push_str(&format!("refresh_interval_secs = {}\n", self.refresh_interval_secs));
        if let Some(ref token) = self.mapbox_token {
            content.push_str(&format!("mapbox_token = \"{}\"\n", token));
        }
        content.push_str(&format!("center_lat = {}\n", self.center_lat));
        content.push_str(&format!("center_lng = {}\n", self.center_lng));
        content.push_str(&format!("zoom = {}\n", self.zoom));

        std::fs::write(config_path, content).context("Failed to write to config file")?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        crate::utils::get_config_path()
    }
}
