//! Tier orchestration.
//!
//! [`Extractor::extract`] runs the configured tiers in order and returns the
//! first record that passes the [`AcceptancePolicy`]. It never fails: input
//! errors, tier errors, timeouts and panics all end up as diagnostic lines,
//! and when nothing works a placeholder record is returned.

use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::{CrossRefClient, StructuredClient};
use crate::config::Settings;
use crate::heuristics::FieldPatterns;
use crate::models::{ExtractOptions, ExtractionMethod, ExtractionResult, PartialRecord};
use crate::ocr::OcrExtractor;
use crate::pdf::{
    has_pdf_signature, PdfTextReader, ScanClassifier, TextLayerExtractor, TextLayerReader,
};
use crate::tiers::{
    DoiLookupTier, Gate, OcrTier, PdfInput, StructuredParseTier, TextLayerTier, Tier, TierContext,
    TierError, TierOutcome,
};
use crate::utils::HttpClient;

/// Minimum content a tier's record must carry to be returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptancePolicy {
    pub min_text_layer_chars: usize,
    pub min_ocr_chars: usize,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            min_text_layer_chars: 100,
            min_ocr_chars: 50,
        }
    }
}

impl AcceptancePolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_text_layer_chars: settings.text_layer.min_accept_chars,
            min_ocr_chars: settings.ocr.min_chars,
        }
    }

    /// Decide whether `record`, produced by a tier using `method`, is usable
    pub fn check(&self, method: ExtractionMethod, record: &PartialRecord) -> Result<(), TierError> {
        let insufficient = |msg: String| Err(TierError::InsufficientContent(msg));
        match method {
            ExtractionMethod::DoiLookup if !record.has_title() => {
                insufficient("registry record has no title".to_string())
            }
            ExtractionMethod::DoiLookup if record.full_text_chars() == 0 => {
                insufficient("registry record has no full text".to_string())
            }
            ExtractionMethod::StructuredParse if !record.has_title() => {
                insufficient("structured response has no title".to_string())
            }
            ExtractionMethod::StructuredParse if record.full_text_chars() == 0 => {
                insufficient("structured response has no body text".to_string())
            }
            ExtractionMethod::TextLayer if record.full_text_chars() < self.min_text_layer_chars => {
                insufficient(format!(
                    "text layer has {} characters (minimum {})",
                    record.full_text_chars(),
                    self.min_text_layer_chars
                ))
            }
            ExtractionMethod::Ocr if record.full_text_chars() < self.min_ocr_chars => {
                insufficient(format!(
                    "OCR produced {} characters (minimum {})",
                    record.full_text_chars(),
                    self.min_ocr_chars
                ))
            }
            _ => Ok(()),
        }
    }
}

/// The tiered extractor.
///
/// Holds only immutable configuration and shared client handles, so one
/// instance can serve any number of concurrent [`extract`](Self::extract) calls.
#[derive(Debug, Clone)]
pub struct Extractor {
    tiers: Vec<Arc<dyn Tier>>,
    reader: Arc<dyn TextLayerReader>,
    policy: AcceptancePolicy,
    sample_pages: usize,
}

impl Extractor {
    /// Build an extractor from explicit parts
    pub fn new(
        tiers: Vec<Arc<dyn Tier>>,
        reader: Arc<dyn TextLayerReader>,
        policy: AcceptancePolicy,
        sample_pages: usize,
    ) -> Self {
        Self {
            tiers,
            reader,
            policy,
            sample_pages,
        }
    }

    /// Build the default tier chain: DOI lookup, structured parse, text layer, OCR
    pub fn from_settings(settings: &Settings) -> Result<Self, TierError> {
        let current_year = chrono::Datelike::year(&chrono::Utc::now());
        let patterns = Arc::new(
            FieldPatterns::new(current_year)
                .map_err(|e| TierError::Setup(format!("field patterns: {}", e)))?,
        );
        let reader: Arc<dyn TextLayerReader> = Arc::new(PdfTextReader::new());
        let text = TextLayerExtractor::new(Arc::clone(&reader), settings.text_layer.min_chars);

        let mut tiers: Vec<Arc<dyn Tier>> = Vec::new();

        if settings.registry.enabled {
            let registry = CrossRefClient::new(
                &settings.registry.base_url,
                settings.registry.mailto.as_deref(),
            )?;
            tiers.push(Arc::new(DoiLookupTier::new(
                Arc::new(registry),
                Arc::clone(&patterns),
                text.clone(),
                settings.registry.timeout(),
            )));
        }

        let structured = StructuredClient::new(
            HttpClient::new()?,
            settings.structured.client_settings(),
        );
        tiers.push(Arc::new(StructuredParseTier::new(
            Arc::new(structured),
            settings.structured.probe_timeout(),
            settings.structured.timeout(),
        )));

        tiers.push(Arc::new(TextLayerTier::new(
            text,
            ScanClassifier::new(Arc::clone(&reader), settings.scan),
            Arc::clone(&patterns),
            settings.text_layer.timeout(),
        )));

        tiers.push(Arc::new(OcrTier::new(
            OcrExtractor::from_settings(settings.ocr.clone()),
            patterns,
        )));

        Ok(Self::new(
            tiers,
            reader,
            AcceptancePolicy::from_settings(settings),
            settings.scan.sample_pages,
        ))
    }

    /// Tier identifiers in the order they are tried
    pub fn tier_ids(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.id()).collect()
    }

    /// Extract the best available record from `pdf`.
    ///
    /// Never fails and returns within `options.max_timeout_ms` plus the time
    /// needed to release resources of the tier that was running.
    pub async fn extract(
        &self,
        pdf: impl Into<Arc<[u8]>>,
        options: &ExtractOptions,
    ) -> ExtractionResult {
        let input = PdfInput::new(pdf);
        let mut ctx = TierContext::new(
            options.clone(),
            Arc::clone(&self.reader),
            self.sample_pages,
        );
        tracing::info!(
            bytes = input.len(),
            budget_ms = options.max_timeout_ms,
            "starting extraction"
        );

        if let Err(e) = validate_input(&input) {
            tracing::warn!("rejecting input: {}", e);
            ctx.note("input", format!("rejected: {}", e));
            return finish_fallback(ctx);
        }

        for tier in &self.tiers {
            let id = tier.id().to_string();
            match self.run_tier(tier.as_ref(), &input, &mut ctx).await {
                TierOutcome::Success(record) => {
                    ctx.note(&id, "accepted");
                    tracing::info!(
                        tier = %id,
                        elapsed_ms = ctx.deadline.elapsed_ms(),
                        chars = record.full_text_chars(),
                        "extraction succeeded"
                    );
                    return ExtractionResult::from_record(
                        record,
                        tier.method(),
                        ctx.deadline.elapsed_ms(),
                        ctx.diagnostics,
                    );
                }
                TierOutcome::Skipped(reason) => {
                    tracing::debug!(tier = %id, "skipped: {}", reason);
                    ctx.note(&id, format!("skipped: {}", reason));
                }
                TierOutcome::Failed(err) => {
                    tracing::warn!(tier = %id, "failed: {}", err);
                    ctx.note(&id, format!("failed: {}", err));
                }
            }
        }

        finish_fallback(ctx)
    }

    async fn run_tier(
        &self,
        tier: &dyn Tier,
        input: &PdfInput,
        ctx: &mut TierContext,
    ) -> TierOutcome {
        let remaining = ctx.deadline.remaining();
        if ctx.deadline.is_exhausted() || remaining < tier.min_budget() {
            return TierOutcome::Skipped(format!(
                "time budget nearly exhausted ({}ms left)",
                remaining.as_millis()
            ));
        }

        match guarded(remaining, tier.gate(input, ctx)).await {
            Ok(Gate::Open) => {}
            Ok(Gate::Closed(reason)) => return TierOutcome::Skipped(reason),
            Err(e) => return TierOutcome::Failed(e),
        }

        let limit = ctx.deadline.cap(tier.timeout());
        if limit.is_zero() {
            return TierOutcome::Skipped("time budget exhausted".to_string());
        }
        ctx.set_attempt_budget(limit);

        let record = match guarded(limit, tier.attempt(input, ctx)).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) | Err(e) => return TierOutcome::Failed(e),
        };

        match self.policy.check(tier.method(), &record) {
            Ok(()) => TierOutcome::Success(record),
            Err(e) => TierOutcome::Failed(e),
        }
    }
}

/// Run a tier step under a timeout, turning a panic into an error
async fn guarded<T, F>(limit: Duration, fut: F) -> Result<T, TierError>
where
    F: Future<Output = T>,
{
    let fut = AssertUnwindSafe(fut).catch_unwind();
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(panic)) => Err(TierError::Panicked(panic_message(panic.as_ref()))),
        Err(_) => Err(TierError::Timeout(limit)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Reject buffers that cannot be a PDF before any tier runs
pub fn validate_input(input: &PdfInput) -> Result<(), TierError> {
    if input.is_empty() {
        return Err(TierError::Input("empty buffer".to_string()));
    }
    if !has_pdf_signature(input.bytes()) {
        return Err(TierError::Input("no %PDF- signature in the first 1024 bytes".to_string()));
    }
    Ok(())
}

fn finish_fallback(mut ctx: TierContext) -> ExtractionResult {
    ctx.note(
        "fallback",
        "no tier produced a usable record, returning placeholders",
    );
    let doi = ctx.doi_hint().map(str::to_string);
    let elapsed_ms = ctx.deadline.elapsed_ms();
    tracing::info!(elapsed_ms, "extraction fell back to placeholder record");
    ExtractionResult::fallback(doi, elapsed_ms, ctx.diagnostics)
}
