//! Optical character recognition, the last content tier.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{Gate, PdfInput, Tier, TierContext, TierError};
use crate::heuristics::FieldPatterns;
use crate::models::{ExtractionMethod, PartialRecord};
use crate::ocr::OcrExtractor;

#[derive(Debug, Clone)]
pub struct OcrTier {
    ocr: OcrExtractor,
    patterns: Arc<FieldPatterns>,
}

impl OcrTier {
    pub fn new(ocr: OcrExtractor, patterns: Arc<FieldPatterns>) -> Self {
        Self { ocr, patterns }
    }
}

#[async_trait]
impl Tier for OcrTier {
    fn id(&self) -> &str {
        "ocr"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Ocr
    }

    fn timeout(&self) -> Duration {
        self.ocr.settings().timeout()
    }

    fn min_budget(&self) -> Duration {
        self.ocr.settings().min_budget()
    }

    async fn gate(&self, _input: &PdfInput, ctx: &mut TierContext) -> Gate {
        if ctx.options.enable_ocr {
            Gate::Open
        } else {
            Gate::closed("OCR disabled")
        }
    }

    async fn attempt(
        &self,
        input: &PdfInput,
        ctx: &mut TierContext,
    ) -> Result<PartialRecord, TierError> {
        let output = self
            .ocr
            .recognize(input.bytes(), ctx.attempt_budget())
            .await?;
        for note in &output.notes {
            ctx.note(self.id(), note);
        }

        tracing::debug!(pages = output.pages_recognized, "OCR finished");
        Ok(self
            .patterns
            .extract_ocr_record(&output.text)
            .full_text(output.text))
    }
}
