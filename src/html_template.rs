use serde::Serialize;

use crate::constants::{CIRCLE_FILL_OPACITY, FAULT_LINE_COLOR, FAULT_LINE_WEIGHT, MAX_ZOOM};
use crate::encoding::legend_html;
use crate::settings::Settings;

const MAPBOX_TILE_URL: &str =
    "https://api.mapbox.com/styles/v1/{id}/tiles/{z}/{x}/{y}?access_token={accessToken}";
const MAPBOX_ATTRIBUTION: &str = "Map data &copy; <a href=\"https://www.openstreetmap.org/\">OpenStreetMap</a> contributors, <a href=\"https://creativecommons.org/licenses/by-sa/2.0/\">CC-BY-SA</a>, Imagery &copy; <a href=\"https://www.mapbox.com/\">Mapbox</a>";
const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

#[derive(Debug, Clone, Serialize)]
pub struct BaseLayer {
    pub name: &'static str,
    pub url: &'static str,
    pub attribution: &'static str,
    pub options: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MapConfig {
    center: [f64; 2],
    zoom: u8,
    max_zoom: u8,
    base_layers: Vec<BaseLayer>,
    default_base_layer: &'static str,
    fault_style: serde_json::Value,
    fill_opacity: f64,
    legend_html: String,
    endpoints: serde_json::Value,
}

/// Selectable base imagery. Mapbox styles need a token; otherwise the map
/// falls back to plain OpenStreetMap tiles.
pub fn base_layers(settings: &Settings) -> Vec<BaseLayer> {
    match settings.mapbox_token.as_deref() {
        Some(token) => [
            ("Satellite Map", "mapbox/satellite-v9"),
            ("Grayscale Map", "mapbox/light-v10"),
            ("Outdoors Map", "mapbox/outdoors-v11"),
        ]
        .into_iter()
        .map(|(name, id)| BaseLayer {
            name,
            url: MAPBOX_TILE_URL,
            attribution: MAPBOX_ATTRIBUTION,
            options: serde_json::json!({
                "id": id,
                "accessToken": token,
                "tileSize": 512,
                "zoomOffset": -1,
            }),
        })
        .collect(),
        None => vec![BaseLayer {
            name: "Street Map",
            url: OSM_TILE_URL,
            attribution: OSM_ATTRIBUTION,
            options: serde_json::json!({}),
        }],
    }
}

fn default_base_layer(settings: &Settings) -> &'static str {
    if settings.mapbox_token.is_some() {
        "Grayscale Map"
    } else {
        "Street Map"
    }
}

/// Map page with the view, layers and legend baked in as a JSON blob.
pub fn get_map_html(settings: &Settings) -> String {
    let config = MapConfig {
        center: [settings.center_lat, settings.center_lng],
        zoom: settings.zoom,
        max_zoom: MAX_ZOOM,
        base_layers: base_layers(settings),
        default_base_layer: default_base_layer(settings),
        fault_style: serde_json::json!({
            "color": FAULT_LINE_COLOR,
            "weight": FAULT_LINE_WEIGHT,
            "fillOpacity": 0,
        }),
        fill_opacity: CIRCLE_FILL_OPACITY,
        legend_html: legend_html(),
        endpoints: serde_json::json!({
            "earthquakes": "/api/earthquakes",
            "faultLines": "/api/faultlines",
            "events": "/api/events",
        }),
    };

    // `</` inside a JSON string would close the surrounding <script> early
    let config_json = serde_json::to_string(&config)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");

    MAP_HTML.replace("/* QUAKEMAP_CONFIG */", &format!("window.QUAKEMAP_CONFIG = {};", config_json))
}

// HTML template for the map page
const MAP_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Earthquakes – last 7 days</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <link rel="stylesheet" href="/style.css" />
</head>
<body>
    <div id="map"></div>

    <script>
        /* QUAKEMAP_CONFIG */
    </script>
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <script src="/script.js"></script>
</body>
</html>
"#;
