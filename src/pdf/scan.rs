//! Scanned-document classification.
//!
//! A document is treated as scanned only when it is long enough for a low text
//! density to be meaningful: a one-page flyer naturally has little text without
//! being an image scan.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::text_layer::{DocumentProbe, TextLayerReader};

/// Thresholds used by [`ScanClassifier`]
///
/// Density is the number of non-whitespace characters found on the sampled
/// leading pages divided by the document's page count. Spaces and line breaks
/// are not counted, so tune `min_chars_per_page` against visible glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanThresholds {
    /// Documents with fewer pages are never classified as scanned
    #[serde(default = "default_min_pages")]
    pub min_pages: usize,

    /// Density (non-whitespace chars per page) below which a document is scanned
    #[serde(default = "default_min_chars_per_page")]
    pub min_chars_per_page: f64,

    /// Number of leading pages whose text is sampled
    #[serde(default = "default_sample_pages")]
    pub sample_pages: usize,
}

impl Default for ScanThresholds {
    fn default() -> Self {
        Self {
            min_pages: default_min_pages(),
            min_chars_per_page: default_min_chars_per_page(),
            sample_pages: default_sample_pages(),
        }
    }
}

fn default_min_pages() -> usize {
    4
}

fn default_min_chars_per_page() -> f64 {
    80.0
}

fn default_sample_pages() -> usize {
    1
}

/// Decides whether a PDF lacks a usable text layer
#[derive(Debug, Clone)]
pub struct ScanClassifier {
    reader: Arc<dyn TextLayerReader>,
    thresholds: ScanThresholds,
}

impl ScanClassifier {
    pub fn new(reader: Arc<dyn TextLayerReader>, thresholds: ScanThresholds) -> Self {
        Self { reader, thresholds }
    }

    pub fn thresholds(&self) -> &ScanThresholds {
        &self.thresholds
    }

    /// Classify raw PDF bytes.
    ///
    /// Never fails: if the document cannot be read the answer is `false`
    /// ("assume a usable text layer") so the cheaper tier is tried first.
    pub fn is_scanned(&self, pdf: &[u8]) -> bool {
        match self.reader.probe(pdf, self.thresholds.sample_pages) {
            Ok(probe) => self.classify(&probe),
            Err(e) => {
                tracing::debug!("scan classifier could not read document: {}", e);
                false
            }
        }
    }

    /// Classify an already-computed probe
    pub fn classify(&self, probe: &DocumentProbe) -> bool {
        probe.page_count >= self.thresholds.min_pages
            && probe.chars_per_page() < self.thresholds.min_chars_per_page
    }
}
