//! Client for a GROBID-compatible structuring service.
//!
//! The service takes a multipart PDF upload and answers with TEI XML carrying
//! the header metadata and the segmented body text.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use std::time::Duration;

use super::tei::TeiNode;
use super::StructuredParser;
use crate::models::PartialRecord;
use crate::tiers::TierError;
use crate::utils::{join_url, validate_service_url, HttpClient};

/// Endpoint and request settings for the structuring service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredSettings {
    /// Health endpoint, relative to the service URL
    pub liveness_path: String,
    /// Full-text parse endpoint, relative to the service URL
    pub parse_path: String,
    /// Responses shorter than this are treated as malformed
    pub min_markup_bytes: usize,
    pub include_raw_citations: bool,
    pub include_raw_affiliations: bool,
}

impl Default for StructuredSettings {
    fn default() -> Self {
        Self {
            liveness_path: "/liveness".to_string(),
            parse_path: "/parse".to_string(),
            min_markup_bytes: 200,
            include_raw_citations: true,
            include_raw_affiliations: true,
        }
    }
}

/// HTTP client for the structuring service
#[derive(Debug, Clone)]
pub struct StructuredClient {
    client: HttpClient,
    settings: StructuredSettings,
}

impl StructuredClient {
    pub fn new(client: HttpClient, settings: StructuredSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &StructuredSettings {
        &self.settings
    }

    fn form(&self, pdf: Arc<[u8]>) -> Result<Form, TierError> {
        let file = Part::bytes(pdf.to_vec())
            .file_name("document.pdf")
            .mime_str("application/pdf")?;

        Ok(Form::new()
            .part("file", file)
            .text("consolidateHeader", "0")
            .text(
                "includeRawCitations",
                flag(self.settings.include_raw_citations),
            )
            .text(
                "includeRawAffiliations",
                flag(self.settings.include_raw_affiliations),
            ))
    }
}

fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

#[async_trait]
impl StructuredParser for StructuredClient {
    fn name(&self) -> &str {
        "structured-service"
    }

    async fn is_alive(&self, base_url: &str, timeout: Duration) -> bool {
        let base = match validate_service_url(base_url) {
            Ok(base) => base,
            Err(e) => {
                tracing::debug!("structured service URL rejected: {}", e);
                return false;
            }
        };

        let url = join_url(&base, &self.settings.liveness_path);
        match self.client.get(&url, timeout).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::debug!(%url, status = %response.status(), "health probe failed");
                false
            }
            Err(e) => {
                tracing::debug!(%url, "health probe failed: {}", e);
                false
            }
        }
    }

    async fn parse(
        &self,
        pdf: Arc<[u8]>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<PartialRecord, TierError> {
        let base = validate_service_url(base_url)
            .map_err(|e| TierError::Input(e.to_string()))?;
        let url = join_url(&base, &self.settings.parse_path);
        tracing::debug!(%url, bytes = pdf.len(), "uploading PDF for structured parse");

        let response = self
            .client
            .post(&url, timeout)
            .multipart(self.form(pdf)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TierError::Api(format!(
                "structured service returned status {}",
                status
            )));
        }

        let markup = response.text().await?;
        if markup.trim().len() < self.settings.min_markup_bytes {
            return Err(TierError::Parse(format!(
                "response too short to be TEI ({} bytes)",
                markup.trim().len()
            )));
        }

        let root = TeiNode::parse(&markup)?;
        Ok(record_from_tei(&root))
    }
}

/// Map a TEI document to a record; absent parts stay empty
pub fn record_from_tei(root: &TeiNode) -> PartialRecord {
    let header = root.find("teiHeader");
    let bibl = header
        .and_then(|h| h.path(&["fileDesc", "sourceDesc", "biblStruct"]));

    let title = header
        .and_then(|h| h.path(&["fileDesc", "titleStmt", "title"]))
        .or_else(|| bibl.and_then(|b| b.path(&["analytic", "title"])))
        .map(TeiNode::text);

    let authors = bibl
        .and_then(|b| b.child("analytic"))
        .map(|analytic| {
            analytic
                .children_named("author")
                .filter_map(|a| a.child("persName"))
                .map(person_name)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let abstract_text = header
        .and_then(|h| h.path(&["profileDesc", "abstract"]))
        .map(TeiNode::text);

    let venue = bibl
        .and_then(|b| b.path(&["monogr", "title"]))
        .map(TeiNode::text);

    let doi = header.and_then(|h| {
        h.find_all("idno")
            .into_iter()
            .find(|n| {
                n.attr("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("doi"))
            })
            .map(TeiNode::text)
    });

    let year = header.and_then(|h| {
        h.find_all("date")
            .into_iter()
            .filter_map(|d| d.attr("when"))
            .find_map(|when| when.get(..4).and_then(|y| y.parse::<i32>().ok()))
    });

    let body = root.path(&["text", "body"]).map(TeiNode::text);

    let mut record = PartialRecord::new().authors(authors);
    if let Some(title) = title {
        record = record.title(title);
    }
    if let Some(abstract_text) = abstract_text {
        record = record.abstract_text(abstract_text);
    }
    if let Some(venue) = venue {
        record = record.venue(venue);
    }
    if let Some(doi) = doi {
        record = record.doi(doi);
    }
    if let Some(year) = year {
        record = record.year(year);
    }
    if let Some(body) = body {
        record = record.full_text(body);
    }
    record
}

fn person_name(pers: &TeiNode) -> String {
    pers.children_named("forename")
        .chain(pers.children_named("surname"))
        .map(TeiNode::text)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
