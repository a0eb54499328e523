//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `RESEARCH_EXTRACT_*` environment variables (`__` separates sections, e.g.
//! `RESEARCH_EXTRACT_OCR__MAX_PAGES=4`).

pub mod file_config;

pub use file_config::{find_config_file, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::clients::{StructuredSettings, CROSSREF_API_BASE};
use crate::models::{structured_url_from_env, ExtractOptions, DEFAULT_MAX_TIMEOUT_MS};
use crate::ocr::OcrSettings;
use crate::pdf::{ScanThresholds, TextLayerExtractor};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "RESEARCH_EXTRACT";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub structured: StructuredConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub text_layer: TextLayerConfig,

    #[serde(default)]
    pub scan: ScanThresholds,

    #[serde(default)]
    pub ocr: OcrSettings,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Per-call options derived from these settings
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .structured_service_url(self.structured.url.clone())
            .enable_ocr(self.ocr.enabled)
            .max_timeout_ms(self.extraction.max_timeout_ms)
    }
}

/// Structuring service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredConfig {
    /// Base URL of the service
    #[serde(default = "structured_url_from_env")]
    pub url: String,

    #[serde(default = "default_liveness_path")]
    pub liveness_path: String,

    #[serde(default = "default_parse_path")]
    pub parse_path: String,

    /// Health probe timeout
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Parse request timeout
    #[serde(default = "default_structured_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_min_markup_bytes")]
    pub min_markup_bytes: usize,

    #[serde(default = "default_true")]
    pub include_raw_citations: bool,

    #[serde(default = "default_true")]
    pub include_raw_affiliations: bool,
}

impl Default for StructuredConfig {
    fn default() -> Self {
        Self {
            url: structured_url_from_env(),
            liveness_path: default_liveness_path(),
            parse_path: default_parse_path(),
            probe_timeout_ms: default_probe_timeout_ms(),
            timeout_ms: default_structured_timeout_ms(),
            min_markup_bytes: default_min_markup_bytes(),
            include_raw_citations: true,
            include_raw_affiliations: true,
        }
    }
}

impl StructuredConfig {
    pub fn client_settings(&self) -> StructuredSettings {
        StructuredSettings {
            liveness_path: self.liveness_path.clone(),
            parse_path: self.parse_path.clone(),
            min_markup_bytes: self.min_markup_bytes,
            include_raw_citations: self.include_raw_citations,
            include_raw_affiliations: self.include_raw_affiliations,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_liveness_path() -> String {
    StructuredSettings::default().liveness_path
}

fn default_parse_path() -> String {
    StructuredSettings::default().parse_path
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_structured_timeout_ms() -> u64 {
    60_000
}

fn default_min_markup_bytes() -> usize {
    StructuredSettings::default().min_markup_bytes
}

fn default_true() -> bool {
    true
}

/// Bibliographic registry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Set to false to skip the DOI shortcut entirely
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_registry_url")]
    pub base_url: String,

    /// Contact address sent in the User-Agent
    #[serde(default)]
    pub mailto: Option<String>,

    #[serde(default = "default_registry_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_registry_url(),
            mailto: None,
            timeout_ms: default_registry_timeout_ms(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_registry_url() -> String {
    CROSSREF_API_BASE.to_string()
}

fn default_registry_timeout_ms() -> u64 {
    10_000
}

/// Text-layer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayerConfig {
    /// Below this many characters the extractor reports failure
    #[serde(default = "default_text_min_chars")]
    pub min_chars: usize,

    /// Full-text length required to accept the text-layer tier
    #[serde(default = "default_text_min_accept_chars")]
    pub min_accept_chars: usize,

    #[serde(default = "default_text_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TextLayerConfig {
    fn default() -> Self {
        Self {
            min_chars: default_text_min_chars(),
            min_accept_chars: default_text_min_accept_chars(),
            timeout_ms: default_text_timeout_ms(),
        }
    }
}

impl TextLayerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_text_min_chars() -> usize {
    TextLayerExtractor::DEFAULT_MIN_CHARS
}

fn default_text_min_accept_chars() -> usize {
    100
}

fn default_text_timeout_ms() -> u64 {
    30_000
}

/// Call-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Soft budget for one extraction call
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,

    /// Files extracted concurrently by the CLI
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_timeout_ms: default_max_timeout_ms(),
            jobs: default_jobs(),
        }
    }
}

fn default_max_timeout_ms() -> u64 {
    DEFAULT_MAX_TIMEOUT_MS
}

fn default_jobs() -> usize {
    2
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from an optional TOML file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Settings, ::config::ConfigError> {
    let mut builder = ::config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(
            ::config::File::from(path)
                .format(::config::FileFormat::Toml)
                .required(true),
        );
    }

    let settings = builder
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Get the configuration from the discovered config file and environment,
/// falling back to defaults when it cannot be loaded
pub fn get_config() -> Settings {
    let path = find_config_file();
    match load_config(path.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load configuration, using defaults: {}", e);
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let settings = Settings::default();
        assert_eq!(settings.scan.min_pages, 4);
        assert_eq!(settings.scan.min_chars_per_page, 80.0);
        assert_eq!(settings.text_layer.min_accept_chars, 100);
        assert_eq!(settings.ocr.min_chars, 50);
        assert_eq!(settings.extraction.max_timeout_ms, DEFAULT_MAX_TIMEOUT_MS);
        assert_eq!(settings.structured.liveness_path, "/liveness");
        assert_eq!(settings.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_extract_options_follow_settings() {
        let mut settings = Settings::default();
        settings.structured.url = "http://grobid:8070".to_string();
        settings.ocr.enabled = false;
        settings.extraction.max_timeout_ms = 5_000;

        let options = settings.extract_options();
        assert_eq!(options.structured_service_url, "http://grobid:8070");
        assert!(!options.enable_ocr);
        assert_eq!(options.max_timeout_ms, 5_000);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
[structured]
url = "http://parser.internal:8070"
probe_timeout_ms = 500

[scan]
min_pages = 1
min_chars_per_page = 100.0

[ocr]
enabled = false
language = "deu"
"#,
        )
        .unwrap();

        let settings = load_config(Some(&path)).unwrap();
        assert_eq!(settings.structured.url, "http://parser.internal:8070");
        assert_eq!(settings.structured.probe_timeout_ms, 500);
        assert_eq!(settings.structured.parse_path, "/parse");
        assert_eq!(settings.scan.min_pages, 1);
        assert!(!settings.ocr.enabled);
        assert_eq!(settings.ocr.language, "deu");
        assert_eq!(settings.ocr.max_pages, 10);
    }

    #[test]
    fn test_environment_overrides_use_single_underscore_prefix() {
        std::env::set_var("RESEARCH_EXTRACT_OCR__DPI", "150");
        std::env::set_var("RESEARCH_EXTRACT_REGISTRY__TIMEOUT_MS", "2500");
        let settings = load_config(None);
        std::env::remove_var("RESEARCH_EXTRACT_OCR__DPI");
        std::env::remove_var("RESEARCH_EXTRACT_REGISTRY__TIMEOUT_MS");

        let settings = settings.unwrap();
        assert_eq!(settings.ocr.dpi, 150);
        assert_eq!(settings.registry.timeout_ms, 2500);
    }

    #[test]
    fn test_load_config_missing_file_is_error() {
        let missing = Path::new("/nonexistent/research-extract.toml");
        assert!(load_config(Some(missing)).is_err());
    }
}
