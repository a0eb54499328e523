//! Utility modules supporting extraction.
//!
//! - [`Deadline`]: a single time budget shared by every tier of one call
//! - [`within`]: run a future under a time limit
//! - [`HttpClient`]: shared reqwest client with per-request timeouts
//! - [`validate_service_url`] / [`validate_doi`]: input validation
//! - [`render_reports`]: table, plain and JSON rendering of results

mod deadline;
mod display;
mod http;
mod validate;

pub use deadline::{within, Deadline};
pub use display::{render_reports, truncate_with_ellipsis, FileReport, ResultFormat};
pub use http::{join_url, polite_user_agent, HttpClient, DEFAULT_USER_AGENT};
pub use validate::{validate_doi, validate_service_url, ValidationError};
