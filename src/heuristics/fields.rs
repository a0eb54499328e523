//! Pattern-based recovery of bibliographic fields from raw document text.
//!
//! All patterns are compiled once into a [`FieldPatterns`] value which callers
//! construct explicitly and share (it is immutable and `Send + Sync`).

use regex::Regex;

use crate::models::PartialRecord;

/// Only this many leading characters are scanned for a publication year
pub const YEAR_SCAN_CHARS: usize = 5000;

/// Maximum number of authors returned by [`FieldPatterns::authors`]
pub const MAX_AUTHORS: usize = 10;

/// Plausible title length bounds, in characters
pub const TITLE_MIN_CHARS: usize = 10;
pub const TITLE_MAX_CHARS: usize = 200;

/// Abstract length bounds, in characters
pub const ABSTRACT_MIN_CHARS: usize = 50;
pub const ABSTRACT_MAX_CHARS: usize = 3000;

/// Maximum venue tail captured after a venue marker
pub const VENUE_MAX_CHARS: usize = 100;

/// Earliest year accepted as a publication year
pub const MIN_YEAR: i32 = 1990;

/// How many leading lines are considered when looking for a title
const TITLE_SCAN_LINES: usize = 40;

/// How many lines after the title may hold the author list
const AUTHOR_SCAN_LINES: usize = 6;

/// Lines of OCR text joined into the light-weight abstract
const OCR_ABSTRACT_LINES: usize = 5;
const OCR_ABSTRACT_MAX_CHARS: usize = 1000;

/// Compiled field-extraction patterns.
#[derive(Debug, Clone)]
pub struct FieldPatterns {
    current_year: i32,
    doi: Regex,
    year: Regex,
    author_line: Regex,
    author_split: Regex,
    name: Regex,
    name_noise: Regex,
    abstract_block: Regex,
    venue: Regex,
    running_header: Regex,
    whitespace: Regex,
}

impl FieldPatterns {
    /// Compile the pattern table.
    ///
    /// `current_year` bounds the accepted publication years.
    pub fn new(current_year: i32) -> Result<Self, regex::Error> {
        Ok(Self {
            current_year,
            doi: Regex::new(r#"\b10\.\d{4,9}/[^\s"'<>]+"#)?,
            year: Regex::new(r"\b\d{4}\b")?,
            author_line: Regex::new(r"(?im)^\s*(?:authors?\s*[:\-]|by\s*[:\-]?)\s*(.+)$")?,
            author_split: Regex::new(r"\s*(?:,|;|&|\band\b)\s*")?,
            name: Regex::new(
                r"^[A-Z][A-Za-z'\-]+(?:\s+[A-Z]\.)*(?:\s+(?:van|von|de|der|da|del|di|le|la)\b)?(?:\s+[A-Z][A-Za-z'\-]+){1,2}$",
            )?,
            name_noise: Regex::new(r"[\d\*†‡§¶]+")?,
            abstract_block: Regex::new(
                r"(?ims)^\s*abstract\b[\s.:\-—–]*(.+?)(?:\n\s*(?:(?:\d+|[IVX]+)\.?\s*)?(?:introduction|keywords|key words|index terms|background|ccs concepts)\b|\z)",
            )?,
            venue: Regex::new(
                r"(?i)\b(published in|journal of|proceedings of|conference on|transactions on)\s*:?\s*([^\n]{0,100})",
            )?,
            running_header: Regex::new(
                r"(?i)^(?:page\s+\d+.*|\d+(?:\s*(?:of|/)\s*\d+)?|arxiv:\S+.*|preprint\b.*|vol(?:ume)?\.?\s*\d+.*|doi:?\s*10\..*|https?://\S+.*|.*©.*|copyright\b.*|.*\bissn\b.*|received\b.*|accepted\b.*|published\b.*|journal of .*|proceedings of .*|.*all rights reserved.*|.*\blicen[cs]ed?\b.*|under review.*|submitted to .*)$",
            )?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Year used as the upper bound for publication years
    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Recover every field from text-layer output
    pub fn extract_record(&self, text: &str) -> PartialRecord {
        let mut record = PartialRecord::new();
        record.title = self.title(text);
        record.authors = self.authors(text);
        record.r#abstract = self.abstract_text(text);
        record.doi = self.doi(text);
        record.year = self.year(text);
        record.venue = self.venue(text);
        record
    }

    /// Lighter heuristic for OCR output, which has no reliable structural markers:
    /// first substantial line as title, the following few lines as abstract.
    pub fn extract_ocr_record(&self, text: &str) -> PartialRecord {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let title = lines
            .by_ref()
            .find(|l| l.chars().count() >= TITLE_MIN_CHARS)
            .map(|l| truncate_chars(l, TITLE_MAX_CHARS));

        let abstract_text = lines.take(OCR_ABSTRACT_LINES).collect::<Vec<_>>().join(" ");
        let abstract_text = self.collapse(&abstract_text);

        let mut record = PartialRecord::new();
        record.title = title;
        if !abstract_text.is_empty() {
            record.r#abstract = Some(truncate_chars(&abstract_text, OCR_ABSTRACT_MAX_CHARS));
        }
        record.doi = self.doi(text);
        record.year = self.year(text);
        record
    }

    /// First plausible title line: 10-200 chars, contains a space, not a running header/footer
    pub fn title(&self, text: &str) -> Option<String> {
        self.title_line(text).map(|(_, line)| line.to_string())
    }

    fn title_line<'a>(&self, text: &'a str) -> Option<(usize, &'a str)> {
        text.lines()
            .map(str::trim)
            .enumerate()
            .take(TITLE_SCAN_LINES)
            .find(|(_, line)| self.is_plausible_title(line))
    }

    fn is_plausible_title(&self, line: &str) -> bool {
        let len = line.chars().count();
        if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len) || !line.contains(' ') {
            return false;
        }
        if self.running_header.is_match(line) || self.doi.is_match(line) {
            return false;
        }
        if line.to_lowercase().starts_with("abstract") {
            return false;
        }
        let letters = line.chars().filter(|c| c.is_alphabetic()).count();
        letters * 2 >= len
    }

    /// Author names from an "Author(s):"/"By" line, or from the lines that follow the title.
    ///
    /// Order is appearance order; at most [`MAX_AUTHORS`] entries.
    pub fn authors(&self, text: &str) -> Vec<String> {
        let header = head_chars(text, YEAR_SCAN_CHARS);

        if let Some(caps) = self.author_line.captures(header) {
            let names = self.split_names(&caps[1]);
            if !names.is_empty() {
                return names;
            }
        }

        let Some((title_idx, _)) = self.title_line(header) else {
            return Vec::new();
        };

        header
            .lines()
            .skip(title_idx + 1)
            .take(AUTHOR_SCAN_LINES)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| self.split_names(l))
            .find(|names| !names.is_empty())
            .unwrap_or_default()
    }

    fn split_names(&self, line: &str) -> Vec<String> {
        let cleaned = self.name_noise.replace_all(line, "");
        let parts: Vec<String> = self
            .author_split
            .split(&cleaned)
            .map(|p| self.collapse(p))
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() || !parts.iter().all(|p| self.name.is_match(p)) {
            return Vec::new();
        }

        parts.into_iter().take(MAX_AUTHORS).collect()
    }

    /// Text between an "Abstract" marker and the next section marker
    pub fn abstract_text(&self, text: &str) -> Option<String> {
        let caps = self.abstract_block.captures(text)?;
        let body = self.collapse(caps.get(1)?.as_str());
        if body.chars().count() < ABSTRACT_MIN_CHARS {
            return None;
        }
        Some(truncate_at_word(&body, ABSTRACT_MAX_CHARS))
    }

    /// First DOI-shaped token (`10.<registrant>/<suffix>`)
    pub fn doi(&self, text: &str) -> Option<String> {
        self.doi
            .find(text)
            .map(|m| trim_doi(m.as_str()))
            .filter(|d| d.contains('/') && !d.ends_with('/'))
    }

    /// First year between 1990 and the current year within the leading characters
    pub fn year(&self, text: &str) -> Option<i32> {
        self.year
            .find_iter(head_chars(text, YEAR_SCAN_CHARS))
            .filter_map(|m| m.as_str().parse::<i32>().ok())
            .find(|y| (MIN_YEAR..=self.current_year).contains(y))
    }

    /// Venue phrase such as "Journal of ..." or the text after "Published in"
    pub fn venue(&self, text: &str) -> Option<String> {
        let caps = self.venue.captures(text)?;
        let marker = caps.get(1)?;
        let tail = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        let venue = if marker.as_str().eq_ignore_ascii_case("published in") {
            tail.to_string()
        } else {
            format!("{} {}", marker.as_str(), tail)
        };

        let venue = self.collapse(&venue);
        let venue = venue
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':'))
            .to_string();

        if venue.chars().count() < 5 {
            None
        } else {
            Some(truncate_chars(&venue, VENUE_MAX_CHARS + 20))
        }
    }

    fn collapse(&self, text: &str) -> String {
        self.whitespace.replace_all(text.trim(), " ").into_owned()
    }
}

/// Strip trailing punctuation that is almost never part of a DOI
fn trim_doi(raw: &str) -> String {
    let mut doi = raw.trim_end_matches(['.', ',', ';', ':']).to_string();
    for (open, close) in [('(', ')'), ('[', ']'), ('{', '}')] {
        while doi.ends_with(close) && doi.matches(open).count() < doi.matches(close).count() {
            doi.pop();
        }
    }
    doi.trim_end_matches(['.', ',', ';', ':']).to_string()
}

/// Slice of at most `max` leading characters, on a char boundary
pub fn head_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    head_chars(text, max).trim_end().to_string()
}

fn truncate_at_word(text: &str, max: usize) -> String {
    let head = head_chars(text, max);
    if head.len() == text.len() {
        return text.to_string();
    }
    match head.rfind(' ') {
        Some(idx) if idx > 0 => head[..idx].to_string(),
        _ => head.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> FieldPatterns {
        FieldPatterns::new(2026).unwrap()
    }

    const PAPER: &str = "arXiv:2101.00001v2 [cs.LG] 4 Jan 2021\n\
Learning Sparse Representations for Document Retrieval\n\
Jane Smith1, Robert K. Jones2 and Mei Chen*\n\
1 University of Somewhere\n\
Published in Journal of Machine Learning Research, vol. 22\n\
DOI: 10.1234/jmlr.2021.0042.\n\
Abstract\n\
We study sparse learned representations for first-stage retrieval and show that a simple \n\
regularizer closes most of the gap to dense models at a fraction of the cost.\n\
1 Introduction\n\
Retrieval systems have long relied on inverted indexes.";

    #[test]
    fn test_doi_round_trip() {
        let p = patterns();
        assert_eq!(
            p.doi("DOI: 10.1234/abc.def").as_deref(),
            Some("10.1234/abc.def")
        );
    }

    #[test]
    fn test_doi_trims_trailing_punctuation() {
        let p = patterns();
        assert_eq!(
            p.doi("see (doi:10.5555/xyz-123).").as_deref(),
            Some("10.5555/xyz-123")
        );
        assert_eq!(
            p.doi("10.1002/(SICI)1097-4571(199806)49:8").as_deref(),
            Some("10.1002/(SICI)1097-4571(199806)49:8")
        );
        assert!(p.doi("no identifier here").is_none());
    }

    #[test]
    fn test_title_skips_running_header() {
        let p = patterns();
        assert_eq!(
            p.title(PAPER).as_deref(),
            Some("Learning Sparse Representations for Document Retrieval")
        );
    }

    #[test]
    fn test_title_requires_space_and_length() {
        let p = patterns();
        assert!(p.title("Short\nNoSpacesInThisVeryLongLine\n").is_none());
    }

    #[test]
    fn test_authors_after_title() {
        let p = patterns();
        assert_eq!(
            p.authors(PAPER),
            vec!["Jane Smith", "Robert K. Jones", "Mei Chen"]
        );
    }

    #[test]
    fn test_authors_from_labelled_line() {
        let p = patterns();
        let text = "A Survey of Everything Important\nAuthors: Alice Walker; Bob Stone\n";
        assert_eq!(p.authors(text), vec!["Alice Walker", "Bob Stone"]);
    }

    #[test]
    fn test_authors_capped() {
        let p = patterns();
        let names: Vec<String> = (0..15).map(|i| format!("Author Number{}x", i)).collect();
        let names: Vec<String> = names
            .iter()
            .map(|n| n.replace(char::is_numeric, ""))
            .collect();
        let text = format!("Authors: {}", names.join(", "));
        assert_eq!(p.authors(&text).len(), MAX_AUTHORS);
    }

    #[test]
    fn test_abstract_between_markers() {
        let p = patterns();
        let abstract_text = p.abstract_text(PAPER).unwrap();
        assert!(abstract_text.starts_with("We study sparse learned representations"));
        assert!(abstract_text.ends_with("fraction of the cost."));
        assert!(!abstract_text.contains("Introduction"));
    }

    #[test]
    fn test_abstract_too_short_is_rejected() {
        let p = patterns();
        assert!(p.abstract_text("Abstract: tiny.\nIntroduction\n").is_none());
    }

    #[test]
    fn test_year_bounds() {
        let p = patterns();
        assert_eq!(p.year(PAPER), Some(2021));
        assert_eq!(p.year("founded 1850, revised 2031, printed 1999"), Some(1999));
        assert!(p.year("no years at all").is_none());
    }

    #[test]
    fn test_year_only_scans_leading_text() {
        let p = patterns();
        let text = format!("{}2015", "x ".repeat(YEAR_SCAN_CHARS));
        assert!(p.year(&text).is_none());
    }

    #[test]
    fn test_venue() {
        let p = patterns();
        assert_eq!(
            p.venue(PAPER).as_deref(),
            Some("Journal of Machine Learning Research, vol. 22")
        );
        assert_eq!(
            p.venue("Appeared in the Proceedings of the ACM Web Conference.\n")
                .as_deref(),
            Some("Proceedings of the ACM Web Conference")
        );
    }

    #[test]
    fn test_extract_record() {
        let record = patterns().extract_record(PAPER);
        assert!(record.has_title());
        assert_eq!(record.doi.as_deref(), Some("10.1234/jmlr.2021.0042"));
        assert_eq!(record.year, Some(2021));
        assert_eq!(record.authors.len(), 3);
        assert!(record.full_text.is_none());
    }

    #[test]
    fn test_ocr_record_uses_first_lines() {
        let text =
            "\n  Deep\nNoisy Scanned Title Here\nline one of the body\nline two\nline three\n";
        let record = patterns().extract_ocr_record(text);
        assert_eq!(record.title.as_deref(), Some("Noisy Scanned Title Here"));
        assert_eq!(
            record.r#abstract.as_deref(),
            Some("line one of the body line two line three")
        );
    }

    #[test]
    fn test_head_chars_respects_char_boundaries() {
        assert_eq!(head_chars("héllo", 2), "hé");
        assert_eq!(head_chars("abc", 10), "abc");
    }
}
