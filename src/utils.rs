use std::path::{Path, PathBuf};

use crate::constants::{APP_DIR_NAME, CACHE_FILE_NAME, CONFIG_FILE_NAME};

/// Returns the cross-platform directory for application data
pub fn get_app_data_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let mut path = PathBuf::from(home_dir);
        path.push("Library");
        path.push("Application Support");
        path.push(APP_DIR_NAME);
        path
    } else if cfg!(target_os = "windows") {
        // %APPDATA%/QuakeMap on Windows
        if let Ok(appdata) = std::env::var("APPDATA") {
            PathBuf::from(appdata).join(APP_DIR_NAME)
        } else {
            PathBuf::from(".").join(APP_DIR_NAME)
        }
    } else if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data_home).join(APP_DIR_NAME)
    } else {
        // ~/.local/share/QuakeMap
        let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let mut path = PathBuf::from(home_dir);
        path.push(".local");
        path.push("share");
        path.push(APP_DIR_NAME);
        path
    }
}

/// Ensures the directory exists, creating it if necessary
pub fn ensure_directory_exists(path: &Path) -> Result<(), std::io::Error> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Returns the path to the application configuration file
pub fn get_config_path() -> PathBuf {
    get_app_data_dir().join(CONFIG_FILE_NAME)
}

pub fn get_cache_path() -> PathBuf {
    get_app_data_dir().join(CACHE_FILE_NAME)
}

/// Minimal HTML escaping for text placed inside element bodies and quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"Ridge\" & 'Rise'</b>"),
            "&lt;b&gt;&quot;Ridge&quot; &amp; &#39;Rise&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("10 km SW of Volcano, Hawaii"), "10 km SW of Volcano, Hawaii");
    }

    #[test]
    fn config_and_cache_live_in_app_dir() {
        let dir = get_app_data_dir();
        assert!(get_config_path().starts_with(&dir));
        assert!(get_cache_path().starts_with(&dir));
        assert!(get_config_path().ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn ensure_directory_creates_nested_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_directory_exists(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_directory_exists(&nested).unwrap();
    }
}
