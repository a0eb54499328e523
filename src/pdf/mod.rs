//! PDF text-layer access and scanned-document classification.
//!
//! - [`TextLayerReader`]: reads page counts and embedded text (default: [`PdfTextReader`])
//! - [`TextLayerExtractor`]: full-text extraction with a minimum-content check
//! - [`ScanClassifier`]: decides whether a document lacks a usable text layer

mod scan;
mod text_layer;

pub use scan::{ScanClassifier, ScanThresholds};
pub use text_layer::{
    DocumentProbe, PdfTextReader, TextLayer, TextLayerExtractor, TextLayerReader,
};

use thiserror::Error;

/// Bytes searched for the `%PDF-` header
pub const SIGNATURE_WINDOW: usize = 1024;

/// Errors that can occur while reading a PDF's text layer
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Not a PDF document: {0}")]
    InvalidFile(String),

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Failed to extract text from PDF: {0}")]
    ExtractionFailed(String),

    #[error("Page {0} not found")]
    PageOutOfRange(usize),

    #[error("Text layer too small: {chars} characters (minimum {min})")]
    TooLittleText { chars: usize, min: usize },
}

impl From<lopdf::Error> for PdfError {
    fn from(err: lopdf::Error) -> Self {
        PdfError::Parse(err.to_string())
    }
}

/// Check for a `%PDF-` header within the first [`SIGNATURE_WINDOW`] bytes
pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Count characters that carry content (whitespace excluded)
pub fn content_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
pub(crate) mod test_pdf {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build a small PDF with one Courier text line per page
    pub fn build(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let stream = Stream::new(dictionary! {}, content.encode().unwrap());
            let content_id = doc.add_object(stream);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_detection() {
        assert!(has_pdf_signature(b"%PDF-1.7\n..."));
        assert!(has_pdf_signature(b"\xEF\xBB\xBF  %PDF-1.4"));
        assert!(!has_pdf_signature(b""));
        assert!(!has_pdf_signature(b"<html><body>not a pdf</body></html>"));

        let mut late = vec![b' '; SIGNATURE_WINDOW];
        late.extend_from_slice(b"%PDF-1.4");
        assert!(!has_pdf_signature(&late));
    }

    #[test]
    fn test_content_chars_ignores_whitespace() {
        assert_eq!(content_chars(" a b\n\tc "), 3);
        assert_eq!(content_chars("\n\n\n"), 0);
    }

    #[test]
    fn test_generated_pdf_has_signature() {
        let bytes = test_pdf::build(&["Hello World"]);
        assert!(has_pdf_signature(&bytes));
    }
}
