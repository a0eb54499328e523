//! Configuration file support for research-extract.
//!
//! # Configuration File Format
//!
//! ```toml
//! [structured]
//! url = "http://localhost:8070"
//! liveness_path = "/liveness"
//! parse_path = "/parse"
//! probe_timeout_ms = 2000
//! timeout_ms = 60000
//!
//! [registry]
//! base_url = "https://api.crossref.org"
//! mailto = "you@example.org"
//! timeout_ms = 10000
//!
//! [text_layer]
//! min_chars = 50
//! min_accept_chars = 100
//!
//! [scan]
//! min_pages = 4
//! min_chars_per_page = 80.0
//!
//! [ocr]
//! enabled = true
//! max_pages = 10
//! page_timeout_ms = 30000
//! language = "eng"
//!
//! [extraction]
//! max_timeout_ms = 120000
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use std::path::{Path, PathBuf};

use super::Settings;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "research-extract.toml";

impl Settings {
    /// Save configuration to a TOML file, creating parent directories
    pub fn save_file(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Locate a configuration file: `./research-extract.toml`, then
/// `<config dir>/research-extract/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("research-extract").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
