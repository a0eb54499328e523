//! Rendering extraction results for the terminal.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::time::Duration;

use crate::models::{Confidence, ExtractionResult};
use crate::pdf::content_chars;
use crate::ui::format_duration;

/// Concrete output format (after resolving "auto")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Table,
    Json,
    Plain,
}

/// One processed file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    #[serde(flatten)]
    pub result: ExtractionResult,
}

/// Truncate text to at most `max_chars` characters, appending "..." when cut
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

fn confidence_color(confidence: Confidence) -> Color {
    match confidence {
        Confidence::High => Color::Green,
        Confidence::Medium => Color::Yellow,
        Confidence::Low => Color::Red,
    }
}

fn elapsed(result: &ExtractionResult) -> String {
    format_duration(Duration::from_millis(result.elapsed_ms))
}

fn body_chars(result: &ExtractionResult) -> usize {
    result.full_text.as_deref().map(content_chars).unwrap_or(0)
}

/// Render reports in the requested format
pub fn render_reports(
    reports: &[FileReport],
    format: ResultFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ResultFormat::Json => serde_json::to_string_pretty(reports),
        ResultFormat::Plain => Ok(render_plain(reports)),
        ResultFormat::Table => Ok(render_table(reports)),
    }
}

fn render_table(reports: &[FileReport]) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "File",
            "Title",
            "Authors",
            "Year",
            "Method",
            "Confidence",
            "Chars",
            "Time",
        ]);

    for report in reports {
        let r = &report.result;
        table.add_row(vec![
            Cell::new(truncate_with_ellipsis(&report.file, 30)),
            Cell::new(truncate_with_ellipsis(r.title.as_deref().unwrap_or("-"), 50))
                .add_attribute(Attribute::Bold),
            Cell::new(truncate_with_ellipsis(&r.author_line(), 30)),
            Cell::new(r.year.map(|y| y.to_string()).unwrap_or_default()),
            Cell::new(r.method.to_string()),
            Cell::new(r.confidence.to_string())
                .fg(confidence_color(r.confidence)),
            Cell::new(body_chars(r).to_string()),
            Cell::new(elapsed(r)),
        ]);
    }
    table.to_string()
}

fn render_plain(reports: &[FileReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let r = &report.result;
        out.push_str(&format!("{}\n", report.file));
        let title = r.title.as_deref().unwrap_or("-");
        out.push_str(&format!("  Title:      {}\n", title));
        out.push_str(&format!("  Authors:    {}\n", r.author_line()));
        if let Some(venue) = &r.venue {
            out.push_str(&format!("  Venue:      {}\n", venue));
        }
        if let Some(year) = r.year {
            out.push_str(&format!("  Year:       {}\n", year));
        }
        if let Some(doi) = &r.doi {
            out.push_str(&format!("  DOI:        {}\n", doi));
        }
        out.push_str(&format!(
            "  Method:     {} ({} confidence, {})\n",
            r.method,
            r.confidence,
            elapsed(r)
        ));
        out.push_str(&format!("  Full text:  {} characters\n", body_chars(r)));
        for note in &r.diagnostics {
            out.push_str(&format!("    - {}\n", note));
        }
        out.push('\n');
    }
    out
}
