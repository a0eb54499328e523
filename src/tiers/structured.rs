//! Full structured parse through an external structuring service.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{Gate, PdfInput, Tier, TierContext, TierError};
use crate::clients::StructuredParser;
use crate::models::{ExtractionMethod, PartialRecord};

#[derive(Debug, Clone)]
pub struct StructuredParseTier {
    parser: Arc<dyn StructuredParser>,
    probe_timeout: Duration,
    timeout: Duration,
}

impl StructuredParseTier {
    pub fn new(
        parser: Arc<dyn StructuredParser>,
        probe_timeout: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            parser,
            probe_timeout,
            timeout,
        }
    }
}

#[async_trait]
impl Tier for StructuredParseTier {
    fn id(&self) -> &str {
        "structured-parse"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::StructuredParse
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Liveness probe; a down service is skipped for the rest of the call
    async fn gate(&self, _input: &PdfInput, ctx: &mut TierContext) -> Gate {
        let url = ctx.options.structured_service_url.trim();
        if url.is_empty() {
            return Gate::closed("no service URL configured");
        }

        let limit = ctx.deadline.cap(self.probe_timeout);
        if self.parser.is_alive(url, limit).await {
            Gate::Open
        } else {
            Gate::Closed(TierError::ServiceUnavailable(url.to_string()).to_string())
        }
    }

    async fn attempt(
        &self,
        input: &PdfInput,
        ctx: &mut TierContext,
    ) -> Result<PartialRecord, TierError> {
        let url = ctx.options.structured_service_url.trim().to_string();
        self.parser
            .parse(input.shared(), &url, ctx.attempt_budget())
            .await
    }
}
