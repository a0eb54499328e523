//! Extraction tiers.
//!
//! Each tier is one strategy for turning PDF bytes into a record. The
//! orchestrator tries them in order and stops at the first accepted result:
//!
//! - [`DoiLookupTier`]: DOI on page one, metadata from a bibliographic registry
//! - [`StructuredParseTier`]: full parse by an external structuring service
//! - [`TextLayerTier`]: embedded text layer plus field heuristics
//! - [`OcrTier`]: page rasterization and optical character recognition
//!
//! Tiers are trait objects so they can be registered, reordered or replaced
//! with fakes in tests.

mod doi_lookup;
mod ocr;
mod structured;
mod text_layer;

pub use doi_lookup::DoiLookupTier;
pub use ocr::OcrTier;
pub use structured::StructuredParseTier;
pub use text_layer::TextLayerTier;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Diagnostics, ExtractOptions, ExtractionMethod, PartialRecord};
use crate::pdf::{DocumentProbe, PdfError, TextLayerReader};
use crate::utils::{within, Deadline};

/// Upper bound on reading page count and page-one text
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared, immutable PDF bytes for one extraction call
#[derive(Debug, Clone)]
pub struct PdfInput {
    bytes: Arc<[u8]>,
}

impl PdfInput {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// A cheap handle for moving the bytes onto another task
    pub fn shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Errors raised by a single tier attempt.
///
/// None of these escape an extraction call: the orchestrator records them in
/// the diagnostics and moves on to the next tier.
#[derive(Debug, thiserror::Error)]
pub enum TierError {
    /// The input was rejected before any tier ran
    #[error("Invalid input: {0}")]
    Input(String),

    /// A required external service did not answer its health probe
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The attempt did not finish in time
    #[error("Timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A response or document could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The attempt produced too little usable content
    #[error("Insufficient content: {0}")]
    InsufficientContent(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// A remote service answered with an error status
    #[error("API error: {0}")]
    Api(String),

    /// The registry has no entry for the identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// The PDF could not be read
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Rasterization or recognition failed
    #[error("OCR error: {0}")]
    Ocr(String),

    /// IO error (file system, subprocess)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The tier panicked; the panic was contained
    #[error("Tier panicked: {0}")]
    Panicked(String),

    /// A component could not be constructed
    #[error("Setup error: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for TierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TierError::Network(format!("request timed out: {}", err))
        } else {
            TierError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TierError {
    fn from(err: serde_json::Error) -> Self {
        TierError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for TierError {
    fn from(err: quick_xml::Error) -> Self {
        TierError::Parse(format!("XML: {}", err))
    }
}

impl From<PdfError> for TierError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::TooLittleText { .. } => TierError::InsufficientContent(err.to_string()),
            other => TierError::Pdf(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for TierError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            TierError::Panicked("blocking task panicked".to_string())
        } else {
            TierError::Pdf(format!("blocking task cancelled: {}", err))
        }
    }
}

/// Whether a tier's precondition holds for this document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Open,
    /// Skip the tier, with the reason recorded in the diagnostics
    Closed(String),
}

impl Gate {
    pub fn closed(reason: impl Into<String>) -> Self {
        Gate::Closed(reason.into())
    }
}

/// Result of running one tier
#[derive(Debug)]
pub enum TierOutcome {
    Success(PartialRecord),
    Skipped(String),
    Failed(TierError),
}

/// One extraction strategy.
///
/// Tiers hold only immutable configuration and client handles; everything
/// that belongs to a single call lives in [`TierContext`].
#[async_trait]
pub trait Tier: Send + Sync + std::fmt::Debug {
    /// Identifier used in diagnostics
    fn id(&self) -> &str;

    /// Method reported when this tier's record is accepted
    fn method(&self) -> ExtractionMethod;

    /// Upper bound for one attempt
    fn timeout(&self) -> Duration;

    /// Minimum budget that must remain for the tier to be worth starting
    fn min_budget(&self) -> Duration {
        Duration::ZERO
    }

    /// Check the tier's precondition
    async fn gate(&self, _input: &PdfInput, _ctx: &mut TierContext) -> Gate {
        Gate::Open
    }

    /// Produce a candidate record; acceptance is decided by the caller
    async fn attempt(
        &self,
        input: &PdfInput,
        ctx: &mut TierContext,
    ) -> Result<PartialRecord, TierError>;
}

/// State that belongs to exactly one extraction call
#[derive(Debug)]
pub struct TierContext {
    pub options: ExtractOptions,
    pub deadline: Deadline,
    pub diagnostics: Diagnostics,
    reader: Arc<dyn TextLayerReader>,
    sample_pages: usize,
    probe: Option<Result<DocumentProbe, String>>,
    scanned: Option<bool>,
    doi_hint: Option<String>,
    attempt_budget: Duration,
}

impl TierContext {
    pub fn new(
        options: ExtractOptions,
        reader: Arc<dyn TextLayerReader>,
        sample_pages: usize,
    ) -> Self {
        let deadline = Deadline::new(options.budget());
        Self {
            attempt_budget: deadline.remaining(),
            options,
            deadline,
            diagnostics: Diagnostics::new(),
            reader,
            sample_pages,
            probe: None,
            scanned: None,
            doi_hint: None,
        }
    }

    /// Record a diagnostic line for `tier`
    pub fn note(&mut self, tier: &str, message: impl AsRef<str>) {
        self.diagnostics.note(tier, message);
    }

    /// Page count and page-one text, read at most once per call.
    ///
    /// Returns `None` when the text layer cannot be read; the failure is
    /// recorded once in the diagnostics.
    pub async fn probe(&mut self, input: &PdfInput) -> Option<&DocumentProbe> {
        if self.probe.is_none() {
            let reader = Arc::clone(&self.reader);
            let bytes = input.shared();
            let sample_pages = self.sample_pages;
            let limit = self.deadline.cap(PROBE_TIMEOUT);

            let task = tokio::task::spawn_blocking(move || reader.probe(&bytes, sample_pages));
            let result = match within(limit, task).await {
                Some(Ok(Ok(probe))) => Ok(probe),
                Some(Ok(Err(e))) => Err(e.to_string()),
                Some(Err(e)) => Err(TierError::from(e).to_string()),
                None => Err(format!("timed out after {}ms", limit.as_millis())),
            };

            match &result {
                Ok(probe) => tracing::debug!(
                    pages = probe.page_count,
                    chars_per_page = probe.chars_per_page(),
                    "probed text layer"
                ),
                Err(e) => self.note("probe", format!("could not read text layer: {}", e)),
            }
            self.probe = Some(result);
        }

        self.probe.as_ref().and_then(|r| r.as_ref().ok())
    }

    /// Scan verdict, if one has been computed
    pub fn scanned(&self) -> Option<bool> {
        self.scanned
    }

    pub fn set_scanned(&mut self, scanned: bool) {
        self.scanned = Some(scanned);
    }

    /// DOI seen on page one, kept for the fallback record
    pub fn doi_hint(&self) -> Option<&str> {
        self.doi_hint.as_deref()
    }

    pub fn set_doi_hint(&mut self, doi: impl Into<String>) {
        self.doi_hint = Some(doi.into());
    }

    /// Time allotted to the attempt currently running
    pub fn attempt_budget(&self) -> Duration {
        self.attempt_budget
    }

    pub(crate) fn set_attempt_budget(&mut self, budget: Duration) {
        self.attempt_budget = budget;
    }
}
