//! Optical character recognition for documents without a text layer.
//!
//! Pages are rendered by a [`PageRasterizer`] into a scratch directory and
//! recognized one at a time by an engine obtained from an [`EngineProvider`].
//! The engine is held by an [`EngineGuard`] so it is released exactly once,
//! and the scratch directory is removed on every exit path.

mod engine;
mod raster;
mod tesseract;

pub use engine::{EngineGuard, EngineProvider, RecognitionEngine};
pub use raster::{PageRasterizer, PdftoppmRasterizer};
pub use tesseract::{TesseractEngine, TesseractProvider};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::pdf::content_chars;
use crate::tiers::TierError;

/// OCR limits and tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Whether the OCR tier runs when the caller does not say otherwise
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Leading pages rendered and recognized
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Per-page recognition limit in milliseconds
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Limit for the whole OCR tier in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// OCR is not started with less budget than this left
    #[serde(default = "default_min_budget_ms")]
    pub min_budget_ms: u64,

    /// Recognized characters required for a usable result
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    #[serde(default = "default_dpi")]
    pub dpi: u32,

    #[serde(default = "default_language")]
    pub language: String,

    /// Tesseract page segmentation mode
    #[serde(default = "default_page_segmentation")]
    pub page_segmentation: u8,

    #[serde(default = "default_tesseract_binary")]
    pub tesseract_binary: String,

    #[serde(default = "default_pdftoppm_binary")]
    pub pdftoppm_binary: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_pages: default_max_pages(),
            page_timeout_ms: default_page_timeout_ms(),
            timeout_ms: default_timeout_ms(),
            min_budget_ms: default_min_budget_ms(),
            min_chars: default_min_chars(),
            dpi: default_dpi(),
            language: default_language(),
            page_segmentation: default_page_segmentation(),
            tesseract_binary: default_tesseract_binary(),
            pdftoppm_binary: default_pdftoppm_binary(),
        }
    }
}

impl OcrSettings {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn min_budget(&self) -> Duration {
        Duration::from_millis(self.min_budget_ms)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_pages() -> usize {
    10
}

fn default_page_timeout_ms() -> u64 {
    30_000
}

fn default_timeout_ms() -> u64 {
    90_000
}

fn default_min_budget_ms() -> u64 {
    5_000
}

fn default_min_chars() -> usize {
    50
}

fn default_dpi() -> u32 {
    300
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_page_segmentation() -> u8 {
    1
}

fn default_tesseract_binary() -> String {
    "tesseract".to_string()
}

fn default_pdftoppm_binary() -> String {
    "pdftoppm".to_string()
}

/// Text recognized from a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOutput {
    pub text: String,
    pub pages_recognized: usize,
    /// Per-page problems that did not abort the run
    pub notes: Vec<String>,
}

/// Rasterize-then-recognize pipeline
#[derive(Debug, Clone)]
pub struct OcrExtractor {
    provider: Arc<dyn EngineProvider>,
    rasterizer: Arc<dyn PageRasterizer>,
    settings: OcrSettings,
}

impl OcrExtractor {
    pub fn new(
        provider: Arc<dyn EngineProvider>,
        rasterizer: Arc<dyn PageRasterizer>,
        settings: OcrSettings,
    ) -> Self {
        Self {
            provider,
            rasterizer,
            settings,
        }
    }

    /// Tesseract and pdftoppm, as configured
    pub fn from_settings(settings: OcrSettings) -> Self {
        let provider = TesseractProvider::new(
            settings.tesseract_binary.clone(),
            settings.language.clone(),
            settings.page_segmentation,
        );
        let rasterizer = PdftoppmRasterizer::new(settings.pdftoppm_binary.clone(), settings.dpi);
        Self::new(Arc::new(provider), Arc::new(rasterizer), settings)
    }

    pub fn settings(&self) -> &OcrSettings {
        &self.settings
    }

    /// Whether both the rasterizer and the engine are installed
    pub async fn is_available(&self) -> bool {
        self.rasterizer.is_available().await && self.provider.is_available().await
    }

    /// Recognize the leading pages of `pdf` within `timeout`.
    ///
    /// A page that fails or times out is noted and skipped. The run fails only
    /// when nothing could be rendered or too little text was recognized.
    pub async fn recognize(&self, pdf: &[u8], timeout: Duration) -> Result<OcrOutput, TierError> {
        let started = Instant::now();
        let scratch = tempfile::Builder::new()
            .prefix("research-extract-ocr-")
            .tempdir()?;

        let pages = tokio::time::timeout(
            timeout,
            self.rasterizer
                .rasterize(pdf, self.settings.max_pages, scratch.path()),
        )
        .await
        .map_err(|_| TierError::Timeout(timeout))??;

        tracing::info!(pages = pages.len(), "rasterized pages for OCR");

        let mut guard = EngineGuard::new(self.provider.acquire().await?);
        let mut texts = Vec::with_capacity(pages.len());
        let mut notes = Vec::new();

        for (i, page) in pages.iter().enumerate() {
            let page_number = i + 1;
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                notes.push(format!(
                    "stopped before page {}: time budget exhausted",
                    page_number
                ));
                break;
            }

            let limit = self.settings.page_timeout().min(remaining);
            match tokio::time::timeout(limit, guard.recognize(page)).await {
                Ok(Ok(text)) => {
                    tracing::debug!(page = page_number, chars = text.len(), "recognized page");
                    texts.push(text);
                }
                Ok(Err(e)) => {
                    tracing::warn!(page = page_number, "page recognition failed: {}", e);
                    notes.push(format!("page {}: {}", page_number, e));
                }
                Err(_) => {
                    tracing::warn!(page = page_number, "page recognition timed out");
                    notes.push(format!(
                        "page {}: timed out after {}ms",
                        page_number,
                        limit.as_millis()
                    ));
                }
            }
        }

        guard.release();
        drop(scratch);

        let text = texts
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let chars = content_chars(&text);

        if chars < self.settings.min_chars {
            return Err(TierError::InsufficientContent(format!(
                "recognized {} characters across {} pages (minimum {}, {} page problems)",
                chars,
                texts.len(),
                self.settings.min_chars,
                notes.len()
            )));
        }

        Ok(OcrOutput {
            text,
            pages_recognized: texts.len(),
            notes,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use std::sync::atomic::Ordering;

    fn extractor(pages: usize, provider: Arc<FakeProvider>, page_timeout_ms: u64) -> OcrExtractor {
        OcrExtractor::new(
            provider,
            Arc::new(FakeRasterizer { pages }),
            OcrSettings {
                page_timeout_ms,
                ..OcrSettings::default()
            },
        )
    }

    const SENTENCE: &str = "The quick brown fox jumps over the lazy dog again and again.";

    fn sentence() -> FakePage {
        FakePage::Text(SENTENCE.to_string())
    }

    #[tokio::test]
    async fn test_pages_are_concatenated_and_engine_released() {
        let provider = Arc::new(FakeProvider::new(vec![sentence(), sentence()]));
        let output = extractor(2, Arc::clone(&provider), 1000)
            .recognize(b"%PDF-", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output.pages_recognized, 2);
        assert!(output.notes.is_empty());
        assert_eq!(output.text.matches("quick brown fox").count(), 2);
        assert_eq!(provider.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(provider.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_and_hung_pages_are_skipped() {
        let provider = Arc::new(FakeProvider::new(vec![
            FakePage::Fail,
            sentence(),
            FakePage::Hang,
            sentence(),
        ]));
        let output = extractor(4, Arc::clone(&provider), 50)
            .recognize(b"%PDF-", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output.pages_recognized, 2);
        assert_eq!(output.notes.len(), 2);
        assert!(output.notes[0].starts_with("page 1:"));
        assert!(output.notes[1].contains("timed out"));
        assert_eq!(provider.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_too_little_text_fails_but_still_releases() {
        let provider = Arc::new(FakeProvider::new(vec![FakePage::Text("x".to_string())]));
        let err = extractor(1, Arc::clone(&provider), 1000)
            .recognize(b"%PDF-", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, TierError::InsufficientContent(_)));
        assert_eq!(provider.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_releases_engine_once() {
        let provider = Arc::new(FakeProvider::new(vec![FakePage::Hang]));
        let ocr = extractor(1, Arc::clone(&provider), 60_000);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(50),
            ocr.recognize(b"%PDF-", Duration::from_secs(60)),
        )
        .await;

        assert!(cancelled.is_err());
        assert_eq!(provider.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(provider.released.load(Ordering::SeqCst), 1);
    }
}
