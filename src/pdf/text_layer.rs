//! Embedded text-layer reading.
//!
//! [`PdfTextReader`] uses `lopdf` for page structure and per-page text, and the
//! `pdf-extract` crate for whole-document text (falling back to `lopdf` when
//! `pdf-extract` fails or panics on a malformed file).

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::{content_chars, has_pdf_signature, PdfError};

/// Page count and leading-page text, read once per extraction call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentProbe {
    /// Number of pages the document reports
    pub page_count: usize,
    /// Text of page 1 (empty when the page has no text layer)
    pub first_page_text: String,
    /// Number of leading pages whose text was read
    pub sampled_pages: usize,
    /// Non-whitespace characters across the sampled pages
    pub sampled_chars: usize,
}

impl DocumentProbe {
    /// Sampled non-whitespace characters spread over the reported page count.
    ///
    /// Only the leading pages are read, so a long document with a short
    /// first page scores low.
    pub fn chars_per_page(&self) -> f64 {
        if self.page_count == 0 {
            0.0
        } else {
            self.sampled_chars as f64 / self.page_count as f64
        }
    }
}

/// Read access to a PDF's embedded text layer.
///
/// Implementations are blocking; callers run them on a blocking thread.
pub trait TextLayerReader: Send + Sync + std::fmt::Debug {
    /// Number of pages in the document
    fn page_count(&self, pdf: &[u8]) -> Result<usize, PdfError>;

    /// Text of a single page (1-based)
    fn page_text(&self, pdf: &[u8], page: usize) -> Result<String, PdfError>;

    /// Text of the whole document
    fn full_text(&self, pdf: &[u8]) -> Result<String, PdfError>;

    /// Page count plus the text of the first `sample_pages` pages
    fn probe(&self, pdf: &[u8], sample_pages: usize) -> Result<DocumentProbe, PdfError> {
        let page_count = self.page_count(pdf)?;
        let mut probe = DocumentProbe {
            page_count,
            ..Default::default()
        };

        for page in 1..=sample_pages.max(1).min(page_count) {
            let text = self.page_text(pdf, page).unwrap_or_default();
            probe.sampled_chars += content_chars(&text);
            probe.sampled_pages += 1;
            if page == 1 {
                probe.first_page_text = text;
            }
        }

        Ok(probe)
    }
}

/// Default reader backed by `lopdf` and `pdf-extract`
#[derive(Debug, Clone, Default)]
pub struct PdfTextReader;

impl PdfTextReader {
    pub fn new() -> Self {
        Self
    }

    fn load(pdf: &[u8]) -> Result<lopdf::Document, PdfError> {
        if !has_pdf_signature(pdf) {
            return Err(PdfError::InvalidFile("missing %PDF- header".to_string()));
        }
        Ok(lopdf::Document::load_mem(pdf)?)
    }

    fn lopdf_text(doc: &lopdf::Document) -> Result<String, PdfError> {
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        doc.extract_text(&pages)
            .map_err(|e| PdfError::ExtractionFailed(e.to_string()))
    }
}

impl TextLayerReader for PdfTextReader {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, PdfError> {
        Ok(Self::load(pdf)?.get_pages().len())
    }

    fn page_text(&self, pdf: &[u8], page: usize) -> Result<String, PdfError> {
        let doc = Self::load(pdf)?;
        let number = u32::try_from(page)
            .map_err(|_| PdfError::PageOutOfRange(page))?;
        if !doc.get_pages().contains_key(&number) {
            return Err(PdfError::PageOutOfRange(page));
        }
        doc.extract_text(&[number])
            .map_err(|e| PdfError::ExtractionFailed(e.to_string()))
    }

    fn full_text(&self, pdf: &[u8]) -> Result<String, PdfError> {
        if !has_pdf_signature(pdf) {
            return Err(PdfError::InvalidFile("missing %PDF- header".to_string()));
        }

        // pdf-extract is known to panic on some malformed inputs
        let primary = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(pdf)
        }));

        match primary {
            Ok(Ok(text)) if content_chars(&text) > 0 => Ok(text),
            Ok(Ok(_)) => {
                tracing::debug!("pdf-extract returned no text, trying lopdf");
                Self::lopdf_text(&Self::load(pdf)?)
            }
            Ok(Err(e)) => {
                tracing::debug!("pdf-extract failed ({}), trying lopdf", e);
                Self::lopdf_text(&Self::load(pdf)?)
            }
            Err(_) => {
                tracing::warn!("pdf-extract panicked, trying lopdf");
                Self::lopdf_text(&Self::load(pdf)?)
            }
        }
    }
}

/// Text layer accepted by [`TextLayerExtractor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayer {
    pub text: String,
    pub page_count: usize,
}

/// Whole-document text extraction with a minimum-content check
#[derive(Debug, Clone)]
pub struct TextLayerExtractor {
    reader: Arc<dyn TextLayerReader>,
    min_chars: usize,
}

impl TextLayerExtractor {
    /// Default minimum number of non-whitespace characters for a usable text layer
    pub const DEFAULT_MIN_CHARS: usize = 50;

    pub fn new(reader: Arc<dyn TextLayerReader>, min_chars: usize) -> Self {
        Self { reader, min_chars }
    }

    /// Extract the text layer, rejecting output with fewer than `min_chars` characters.
    ///
    /// A PDF that parses but yields a handful of characters is treated as a failure.
    pub fn extract_text(&self, pdf: &[u8]) -> Result<TextLayer, PdfError> {
        let text = self.reader.full_text(pdf)?;
        let chars = content_chars(&text);
        if chars < self.min_chars {
            return Err(PdfError::TooLittleText {
                chars,
                min: self.min_chars,
            });
        }

        let page_count = self.reader.page_count(pdf).unwrap_or(0);
        Ok(TextLayer {
            text: text.trim().to_string(),
            page_count,
        })
    }
}
