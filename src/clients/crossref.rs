//! CrossRef DOI metadata lookup.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::BibliographicLookup;
use crate::models::PartialRecord;
use crate::tiers::TierError;
use crate::utils::{polite_user_agent, validate_doi, HttpClient};

pub const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// CrossRef REST API client
///
/// `GET {base}/works/{doi}`; accepts both the usual `{"message": {...}}`
/// envelope and a bare work object.
#[derive(Debug, Clone)]
pub struct CrossRefClient {
    client: HttpClient,
    base_url: String,
}

impl CrossRefClient {
    pub fn new(base_url: &str, mailto: Option<&str>) -> Result<Self, TierError> {
        let client = HttpClient::with_user_agent(&polite_user_agent(mailto))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BibliographicLookup for CrossRefClient {
    fn name(&self) -> &str {
        "crossref"
    }

    async fn lookup(&self, doi: &str, timeout: Duration) -> Result<PartialRecord, TierError> {
        let doi = validate_doi(doi)
            .map_err(|e| TierError::Input(e.to_string()))?;
        let url = format!("{}/works/{}", self.base_url, urlencoding::encode(&doi));
        tracing::debug!(%url, "looking up DOI");

        let response = self
            .client
            .get(&url, timeout)
            .send()
            .await
            .map_err(|e| TierError::Network(format!("Failed to fetch DOI: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TierError::NotFound(format!("DOI {} not registered", doi)));
        }
        if !status.is_success() {
            return Err(TierError::Api(format!("registry returned status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TierError::Network(format!("Failed to read response: {}", e)))?;
        let payload: CRPayload = serde_json::from_str(&body)?;

        Ok(payload.into_work().into_record(&doi))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CRPayload {
    Envelope { message: CRWork },
    Bare(CRWork),
}

impl CRPayload {
    fn into_work(self) -> CRWork {
        match self {
            CRPayload::Envelope { message } => message,
            CRPayload::Bare(work) => work,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CRWork {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CRAuthor>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    published: Option<CRDate>,
    #[serde(rename = "published-print")]
    published_print: Option<CRDate>,
    #[serde(rename = "published-online")]
    published_online: Option<CRDate>,
    issued: Option<CRDate>,
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
    /// Organisational authors carry a single name
    name: Option<String>,
}

impl CRAuthor {
    fn display_name(&self) -> Option<String> {
        let person = [self.given.as_deref(), self.family.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !person.is_empty() {
            Some(person)
        } else {
            self.name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
    }
}

#[derive(Debug, Deserialize)]
struct CRDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl CRDate {
    fn year(&self) -> Option<i32> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

impl CRWork {
    fn year(&self) -> Option<i32> {
        [
            &self.published,
            &self.published_print,
            &self.published_online,
            &self.issued,
        ]
        .into_iter()
        .flatten()
        .find_map(CRDate::year)
    }

    fn into_record(self, requested_doi: &str) -> PartialRecord {
        let mut record = PartialRecord::new()
            .authors(self.author.iter().filter_map(CRAuthor::display_name))
            .doi(self.doi.as_deref().unwrap_or(requested_doi));

        if let Some(year) = self.year() {
            record = record.year(year);
        }
        if let Some(title) = self.title.first() {
            record = record.title(collapse_whitespace(title));
        }
        if let Some(venue) = self.container_title.first() {
            record = record.venue(collapse_whitespace(venue));
        }
        if let Some(abstract_text) = self.abstract_text.as_deref() {
            record = record.abstract_text(strip_markup(abstract_text));
        }
        record
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove JATS/XML tags from a registry abstract
fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    let collapsed = collapse_whitespace(&out);
    match collapsed.strip_prefix("Abstract ") {
        Some(rest) => rest.to_string(),
        None => collapsed,
    }
}
