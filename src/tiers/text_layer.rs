//! Embedded text layer plus field heuristics.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{Gate, PdfInput, Tier, TierContext, TierError};
use crate::heuristics::FieldPatterns;
use crate::models::{ExtractionMethod, PartialRecord};
use crate::pdf::{ScanClassifier, TextLayerExtractor};

#[derive(Debug, Clone)]
pub struct TextLayerTier {
    extractor: TextLayerExtractor,
    classifier: ScanClassifier,
    patterns: Arc<FieldPatterns>,
    timeout: Duration,
}

impl TextLayerTier {
    pub fn new(
        extractor: TextLayerExtractor,
        classifier: ScanClassifier,
        patterns: Arc<FieldPatterns>,
        timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            classifier,
            patterns,
            timeout,
        }
    }
}

#[async_trait]
impl Tier for TextLayerTier {
    fn id(&self) -> &str {
        "text-layer"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::TextLayer
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Scan classifier, evaluated once per call
    async fn gate(&self, input: &PdfInput, ctx: &mut TierContext) -> Gate {
        if ctx.scanned() == Some(true) {
            return Gate::closed("document appears to be scanned");
        }

        let verdict = match ctx.probe(input).await {
            Some(probe) => {
                let scanned = self.classifier.classify(probe);
                tracing::debug!(
                    pages = probe.page_count,
                    chars_per_page = probe.chars_per_page(),
                    scanned,
                    "classified document"
                );
                scanned.then(|| {
                    format!(
                        "document appears to be scanned ({} pages, {:.0} chars/page)",
                        probe.page_count,
                        probe.chars_per_page()
                    )
                })
            }
            // Unreadable: assume a usable text layer and let the attempt decide
            None => None,
        };

        ctx.set_scanned(verdict.is_some());
        match verdict {
            Some(reason) => Gate::Closed(reason),
            None => Gate::Open,
        }
    }

    async fn attempt(
        &self,
        input: &PdfInput,
        _ctx: &mut TierContext,
    ) -> Result<PartialRecord, TierError> {
        let extractor = self.extractor.clone();
        let bytes = input.shared();
        let layer = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await??;

        tracing::debug!(
            pages = layer.page_count,
            chars = layer.text.len(),
            "read text layer"
        );
        let record = self.patterns.extract_record(&layer.text);
        Ok(record.full_text(layer.text))
    }
}
