//! Per-call extraction options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default structuring service used when neither the caller nor the environment names one
pub const DEFAULT_STRUCTURED_URL: &str = "http://localhost:8070";

/// Default overall time budget for one extraction call
pub const DEFAULT_MAX_TIMEOUT_MS: u64 = 120_000;

/// Options for a single `extract()` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    /// Base URL of the structured-parser service
    pub structured_service_url: String,

    /// Whether the OCR tier may run
    pub enable_ocr: bool,

    /// Soft budget for the whole call, in milliseconds
    pub max_timeout_ms: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            structured_service_url: structured_url_from_env(),
            enable_ocr: true,
            max_timeout_ms: DEFAULT_MAX_TIMEOUT_MS,
        }
    }
}

impl ExtractOptions {
    /// Create options with the environment defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the structured-parser service URL
    pub fn structured_service_url(mut self, url: impl Into<String>) -> Self {
        self.structured_service_url = url.into();
        self
    }

    /// Enable or disable the OCR tier
    pub fn enable_ocr(mut self, enabled: bool) -> Self {
        self.enable_ocr = enabled;
        self
    }

    /// Set the overall time budget
    pub fn max_timeout_ms(mut self, ms: u64) -> Self {
        self.max_timeout_ms = ms;
        self
    }

    /// Overall budget as a [`Duration`]
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }
}

/// Resolve the structuring service URL from the environment
///
/// Checks `RESEARCH_EXTRACT_STRUCTURED_URL`, then `GROBID_URL`, then falls back
/// to [`DEFAULT_STRUCTURED_URL`].
pub fn structured_url_from_env() -> String {
    ["RESEARCH_EXTRACT_STRUCTURED_URL", "GROBID_URL"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_STRUCTURED_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = ExtractOptions::new()
            .structured_service_url("http://grobid:8070")
            .enable_ocr(false)
            .max_timeout_ms(5_000);

        assert_eq!(options.structured_service_url, "http://grobid:8070");
        assert!(!options.enable_ocr);
        assert_eq!(options.budget(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_url_is_never_empty() {
        assert!(!structured_url_from_env().is_empty());
    }
}
