// Port configuration
pub const DEFAULT_PORT: u16 = 3001;

// Feed sources
pub const DEFAULT_QUAKE_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson";
pub const DEFAULT_PLATES_FEED_URL: &str =
    "https://raw.githubusercontent.com/fraxen/tectonicplates/master/GeoJSON/PB2002_plates.json";
pub const DEFAULT_REFRESH_SECS: u64 = 300;
pub const FETCH_TIMEOUT_SECS: u64 = 30;

// Circle markers: radius is in meters (Leaflet L.circle), not pixels
pub const CIRCLE_RADIUS_SCALE: f64 = 20_000.0;
pub const MIN_CIRCLE_RADIUS: f64 = 1_000.0;
pub const CIRCLE_FILL_OPACITY: f64 = 0.8;

// Plate boundary overlay style
pub const FAULT_LINE_COLOR: &str = "#F39C12";
pub const FAULT_LINE_WEIGHT: u32 = 2;

// Initial view over North America
pub const DEFAULT_CENTER: (f64, f64) = (37.09, -95.71);
pub const DEFAULT_ZOOM: u8 = 4;
pub const MAX_ZOOM: u8 = 18;

// Cache file format
pub const CACHE_VERSION: u32 = 1;
pub const CACHE_FILE_NAME: &str = "feeds_v1.bin";
pub const CONFIG_FILE_NAME: &str = "quakemap.ini";
pub const APP_DIR_NAME: &str = "QuakeMap";
