//! # Research Extract
//!
//! Pulls bibliographic metadata and full text out of PDF documents by running
//! a chain of extraction tiers, cheapest-and-most-trusted first, under one
//! shared time budget. Every call returns a result: when no tier produces a
//! usable record the caller gets placeholder fields with `low` confidence and
//! a diagnostic trail explaining what was tried.
//!
//! ## Architecture
//!
//! - [`orchestrator`]: the [`Extractor`] tier chain and acceptance policy
//! - [`tiers`]: DOI lookup, structured parse, text layer and OCR tiers
//! - [`clients`]: CrossRef and structured-parsing service clients
//! - [`pdf`]: text-layer reading and scanned-document classification
//! - [`ocr`]: rasterization and OCR engine lifecycle
//! - [`heuristics`]: field extraction from raw text
//! - [`models`]: options and result types
//! - [`config`]: layered configuration (file and environment)
//!
//! ```rust,no_run
//! use research_extract::{ExtractOptions, Extractor, Settings};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = Extractor::from_settings(&Settings::default())?;
//! let bytes = std::fs::read("paper.pdf")?;
//! let result = extractor.extract(bytes, &ExtractOptions::new()).await;
//! println!("{:?} ({})", result.title, result.confidence);
//! # Ok(())
//! # }
//! ```

pub mod clients;
pub mod config;
pub mod heuristics;
pub mod models;
pub mod ocr;
pub mod orchestrator;
pub mod pdf;
pub mod tiers;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use models::{Confidence, ExtractOptions, ExtractionMethod, ExtractionResult};
pub use orchestrator::{AcceptancePolicy, Extractor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
