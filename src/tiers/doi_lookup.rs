//! DOI shortcut: find a DOI on page one and resolve it with a registry.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{Gate, PdfInput, Tier, TierContext, TierError};
use crate::clients::BibliographicLookup;
use crate::heuristics::FieldPatterns;
use crate::models::{ExtractionMethod, PartialRecord};
use crate::pdf::TextLayerExtractor;
use crate::utils::within;

#[derive(Debug, Clone)]
pub struct DoiLookupTier {
    lookup: Arc<dyn BibliographicLookup>,
    patterns: Arc<FieldPatterns>,
    text: TextLayerExtractor,
    timeout: Duration,
}

impl DoiLookupTier {
    /// `text` is used to attach the document body to registry metadata when possible
    pub fn new(
        lookup: Arc<dyn BibliographicLookup>,
        patterns: Arc<FieldPatterns>,
        text: TextLayerExtractor,
        timeout: Duration,
    ) -> Self {
        Self {
            lookup,
            patterns,
            text,
            timeout,
        }
    }
}

#[async_trait]
impl Tier for DoiLookupTier {
    fn id(&self) -> &str {
        "doi-lookup"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::DoiLookup
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn gate(&self, input: &PdfInput, ctx: &mut TierContext) -> Gate {
        // Page one only, the whole document is not read here
        let doi = match ctx.probe(input).await {
            Some(probe) => self.patterns.doi(&probe.first_page_text),
            None => return Gate::closed("first page has no readable text"),
        };

        match doi {
            Some(doi) => {
                tracing::debug!(%doi, "found DOI on first page");
                ctx.set_doi_hint(doi);
                Gate::Open
            }
            None => Gate::closed("no DOI on first page"),
        }
    }

    async fn attempt(
        &self,
        input: &PdfInput,
        ctx: &mut TierContext,
    ) -> Result<PartialRecord, TierError> {
        let doi = ctx
            .doi_hint()
            .map(str::to_string)
            .ok_or_else(|| TierError::Input("no DOI on first page".to_string()))?;

        let budget = ctx.attempt_budget();
        let started = Instant::now();
        let record = self.lookup.lookup(&doi, budget).await?;
        tracing::debug!(%doi, registry = self.lookup.name(), "registry answered");

        if !record.has_title() {
            return Ok(record);
        }

        let extractor = self.text.clone();
        let bytes = input.shared();
        let task = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes));
        let remaining = budget.saturating_sub(started.elapsed());

        let problem = match within(remaining, task).await {
            Some(Ok(Ok(layer))) => return Ok(record.full_text(layer.text)),
            Some(Ok(Err(e))) => TierError::from(e),
            Some(Err(e)) => TierError::from(e),
            None => TierError::Timeout(remaining),
        };
        Err(TierError::InsufficientContent(format!(
            "registry metadata found but no full text ({})",
            problem
        )))
    }
}
