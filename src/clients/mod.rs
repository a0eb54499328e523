//! Clients for the external services used by the extraction tiers.
//!
//! - [`BibliographicLookup`]: resolve a DOI to metadata (default: [`CrossRefClient`])
//! - [`StructuredParser`]: full structured parse of a PDF (default: [`StructuredClient`])
//!
//! Both are traits so tests and alternative deployments can swap the backend.

mod crossref;
mod structured;
pub mod tei;

pub use crossref::{CrossRefClient, CROSSREF_API_BASE};
pub use structured::{StructuredClient, StructuredSettings};
pub use tei::TeiNode;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::models::PartialRecord;
use crate::tiers::TierError;

/// Resolves a DOI to bibliographic metadata
#[async_trait]
pub trait BibliographicLookup: Send + Sync + std::fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Look up `doi`, giving up after `timeout`
    async fn lookup(&self, doi: &str, timeout: Duration) -> Result<PartialRecord, TierError>;
}

/// Parses a whole PDF into a structured record
#[async_trait]
pub trait StructuredParser: Send + Sync + std::fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Health probe against the service at `base_url`; never errors
    async fn is_alive(&self, base_url: &str, timeout: Duration) -> bool;

    /// Upload `pdf` to the service at `base_url` and map its response to a record
    async fn parse(
        &self,
        pdf: Arc<[u8]>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<PartialRecord, TierError>;
}
