//! Core data models for extraction requests and results.

mod options;
mod record;

pub use options::{
    structured_url_from_env, ExtractOptions, DEFAULT_MAX_TIMEOUT_MS, DEFAULT_STRUCTURED_URL,
};
pub use record::{
    Confidence, Diagnostics, ExtractionMethod, ExtractionResult, PartialRecord, FALLBACK_ABSTRACT,
    FALLBACK_AUTHOR, FALLBACK_FULL_TEXT, FALLBACK_TITLE,
};
