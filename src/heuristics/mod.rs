//! Heuristic field extractors shared by the text-layer and OCR tiers.

mod fields;

pub use fields::{
    head_chars, FieldPatterns, ABSTRACT_MAX_CHARS, ABSTRACT_MIN_CHARS, MAX_AUTHORS, MIN_YEAR,
    TITLE_MAX_CHARS, TITLE_MIN_CHARS, VENUE_MAX_CHARS, YEAR_SCAN_CHARS,
};
