//! Extraction record models shared by every tier.

use serde::{Deserialize, Serialize};

/// Placeholder strings used by the terminal fallback tier
pub const FALLBACK_TITLE: &str = "Untitled Document";
pub const FALLBACK_AUTHOR: &str = "Unknown Author";
pub const FALLBACK_ABSTRACT: &str = "No abstract could be extracted from this document.";
pub const FALLBACK_FULL_TEXT: &str = "Text extraction failed for this document.";

/// The technique that produced an extraction result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    DoiLookup,
    StructuredParse,
    TextLayer,
    Ocr,
    Fallback,
}

impl ExtractionMethod {
    /// Returns the wire identifier of the method
    pub fn id(&self) -> &'static str {
        match self {
            ExtractionMethod::DoiLookup => "doi-lookup",
            ExtractionMethod::StructuredParse => "structured-parse",
            ExtractionMethod::TextLayer => "text-layer",
            ExtractionMethod::Ocr => "ocr",
            ExtractionMethod::Fallback => "fallback",
        }
    }

    /// Confidence level implied by the method
    pub fn confidence(&self) -> Confidence {
        match self {
            ExtractionMethod::DoiLookup | ExtractionMethod::StructuredParse => Confidence::High,
            ExtractionMethod::TextLayer => Confidence::Medium,
            ExtractionMethod::Ocr | ExtractionMethod::Fallback => Confidence::Low,
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Coarse trust label attached to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        write!(f, "{}", label)
    }
}

/// Fields recovered by a single tier.
///
/// Every field is optional; tiers fill in what they can and the orchestrator
/// decides whether the record is good enough to return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialRecord {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub r#abstract: Option<String>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub year: Option<i32>,
    pub full_text: Option<String>,
}

impl PartialRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set title (blank strings are ignored)
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = non_blank(title.into());
        self
    }

    /// Set authors, dropping blank names
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors
            .into_iter()
            .filter_map(|a| non_blank(a.into()))
            .collect();
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.r#abstract = non_blank(abstract_text.into());
        self
    }

    /// Set venue
    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = non_blank(venue.into());
        self
    }

    /// Set DOI
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = non_blank(doi.into());
        self
    }

    /// Set publication year
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Set full body text
    pub fn full_text(mut self, text: impl Into<String>) -> Self {
        self.full_text = non_blank(text.into());
        self
    }

    /// True when the record carries a non-empty title
    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Length of the full text in characters (0 when absent)
    pub fn full_text_chars(&self) -> usize {
        self.full_text
            .as_deref()
            .map(|t| t.trim().chars().count())
            .unwrap_or(0)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Append-only trail of notes recording every tier decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<String>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a note attributed to a tier
    pub fn note(&mut self, tier: &str, message: impl AsRef<str>) {
        self.0.push(format!("{}: {}", tier, message.as_ref()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// True if any note contains `needle` (case-insensitive)
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.0.iter().any(|n| n.to_lowercase().contains(&needle))
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// The annotated result of one extraction call
///
/// `confidence` is always derived from `method`; there is no way to build a
/// result where the two disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub r#abstract: Option<String>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub year: Option<i32>,
    pub full_text: Option<String>,
    pub method: ExtractionMethod,
    pub confidence: Confidence,
    pub elapsed_ms: u64,
    pub diagnostics: Vec<String>,
}

impl ExtractionResult {
    /// Build a result from a tier's record
    pub fn from_record(
        record: PartialRecord,
        method: ExtractionMethod,
        elapsed_ms: u64,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            title: record.title,
            authors: record.authors,
            r#abstract: record.r#abstract,
            venue: record.venue,
            doi: record.doi,
            year: record.year,
            full_text: record.full_text,
            method,
            confidence: method.confidence(),
            elapsed_ms,
            diagnostics: diagnostics.into_vec(),
        }
    }

    /// Build the terminal fallback result with placeholder fields
    pub fn fallback(doi: Option<String>, elapsed_ms: u64, diagnostics: Diagnostics) -> Self {
        let mut record = PartialRecord::new()
            .title(FALLBACK_TITLE)
            .authors([FALLBACK_AUTHOR])
            .abstract_text(FALLBACK_ABSTRACT)
            .full_text(FALLBACK_FULL_TEXT);
        record.doi = doi;
        Self::from_record(record, ExtractionMethod::Fallback, elapsed_ms, diagnostics)
    }

    /// Returns the author names joined for display
    pub fn author_line(&self) -> String {
        self.authors.join("; ")
    }
}
