//! Terminal styling and progress indicators for the CLI.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if stderr is a terminal (progress output goes there).
pub fn stderr_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a styled status line to stdout.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => println!("{} {}", icon.red().bold(), msg),
        Status::Warning => println!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Format a duration as "850ms" or "2.3s".
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Progress bar for a batch of files.
///
/// Hidden unless there is more than one file and stderr is a terminal, so
/// piped JSON output stays clean.
pub struct BatchProgress {
    pb: indicatif::ProgressBar,
}

impl BatchProgress {
    pub fn new(len: usize, msg: &str) -> Self {
        let pb = if len > 1 && stderr_is_terminal() {
            indicatif::ProgressBar::new(len as u64)
        } else {
            indicatif::ProgressBar::hidden()
        };
        pb.set_style(
            indicatif::ProgressStyle::with_template(
                "{msg}: {bar:40.cyan/blue} {pos}/{len} ({percent}%)",
            )
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("█▓▒░"),
        );
        pb.set_message(msg.to_string());
        Self { pb }
    }

    /// Mark one file as done
    pub fn advance(&self, file: &str) {
        self.pb.set_message(file.to_string());
        self.pb.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Spinner shown while a single slow operation runs.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    pub fn new(msg: &str) -> Self {
        let pb = if stderr_is_terminal() {
            indicatif::ProgressBar::new_spinner()
        } else {
            indicatif::ProgressBar::hidden()
        };
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
