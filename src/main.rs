use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures_util::stream::{self, StreamExt};
use research_extract::clients::{StructuredClient, StructuredParser};
use research_extract::config::{get_config, load_config, LogFormat, Settings};
use research_extract::ocr::OcrExtractor;
use research_extract::pdf::{content_chars, PdfTextReader, ScanClassifier, TextLayerReader};
use research_extract::ui::{self, BatchProgress, Spinner, Status};
use research_extract::utils::{render_reports, FileReport, HttpClient, ResultFormat};
use research_extract::{ExtractOptions, Extractor};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Extract - Pull metadata and full text out of PDF papers
#[derive(Parser, Debug)]
#[command(name = "research-extract")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Extract bibliographic metadata and full text from PDF documents",
    long_about = None
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log format (overrides the configuration file)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> ResultFormat {
        match self {
            OutputFormat::Auto if ui::is_terminal() => ResultFormat::Table,
            OutputFormat::Auto | OutputFormat::Json => ResultFormat::Json,
            OutputFormat::Table => ResultFormat::Table,
            OutputFormat::Plain => ResultFormat::Plain,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormatArg {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract metadata and full text from one or more PDF files
    #[command(alias = "x")]
    Extract {
        /// PDF files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of files processed concurrently
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Structured-parsing service base URL (empty string disables the tier)
        #[arg(long)]
        service_url: Option<String>,

        /// Never fall back to OCR
        #[arg(long)]
        no_ocr: bool,

        /// Overall time budget per file in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Check which external services and tools are reachable
    Health,

    /// Report whether a PDF looks like a scanned document
    Classify {
        /// PDF file to inspect
        file: PathBuf,
    },

    /// Write a configuration file with default settings
    InitConfig {
        /// Destination path
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => load_config(Some(path))
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => get_config(),
    };

    init_tracing(&cli, &settings);
    let format = cli.output.resolve();

    match cli.command {
        Commands::Extract {
            ref files,
            jobs,
            ref service_url,
            no_ocr,
            timeout_ms,
        } => {
            let mut options = settings.extract_options();
            if let Some(url) = service_url {
                options = options.structured_service_url(url.clone());
            }
            if no_ocr {
                options = options.enable_ocr(false);
            }
            if let Some(ms) = timeout_ms {
                options = options.max_timeout_ms(ms);
            }
            let jobs = jobs.unwrap_or(settings.extraction.jobs).max(1);
            run_extract(&settings, files, options, jobs, format).await
        }
        Commands::Health => run_health(&settings, format).await,
        Commands::Classify { ref file } => run_classify(&settings, file, format).await,
        Commands::InitConfig { ref path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            Settings::default()
                .save_file(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                ui::print_status(
                    Status::Success,
                    &format!("Wrote default configuration to {}", path.display()),
                );
            }
            Ok(())
        }
    }
}

fn init_tracing(cli: &Cli, settings: &Settings) {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => settings.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let directives = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("research_extract={}", level));
    let filter = tracing_subscriber::EnvFilter::new(directives);

    let format = match cli.log_format {
        Some(LogFormatArg::Json) => LogFormat::Json,
        Some(LogFormatArg::Text) => LogFormat::Text,
        None => settings.logging.format,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run_extract(
    settings: &Settings,
    files: &[PathBuf],
    options: ExtractOptions,
    jobs: usize,
    format: ResultFormat,
) -> Result<()> {
    let extractor = Extractor::from_settings(settings)
        .context("Failed to build extractor")?;
    let extractor = Arc::new(extractor);
    tracing::debug!(
        "tier chain: {}",
        extractor.tier_ids().join(" -> ")
    );

    let progress = BatchProgress::new(files.len(), "Extracting");
    let options = Arc::new(options);

    let outcomes: Vec<Result<FileReport>> = stream::iter(files.iter().cloned())
        .map(|path| {
            let extractor = Arc::clone(&extractor);
            let options = Arc::clone(&options);
            let progress = &progress;
            async move {
                let file = path.display().to_string();
                let outcome = match tokio::fs::read(&path).await {
                    Ok(bytes) => Ok(FileReport {
                        result: extractor.extract(bytes, &options).await,
                        file: file.clone(),
                    }),
                    Err(e) => Err(anyhow::anyhow!("{}: {}", file, e)),
                };
                progress.advance(&file);
                outcome
            }
        })
        .buffered(jobs)
        .collect()
        .await;
    progress.finish();

    let mut reports = Vec::new();
    let mut unreadable = 0;
    for outcome in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                unreadable += 1;
                tracing::error!("Could not read file {}", e);
            }
        }
    }

    if !reports.is_empty() {
        println!("{}", render_reports(&reports, format)?);
    }

    if unreadable > 0 {
        anyhow::bail!(
            "{} of {} files could not be read",
            unreadable,
            files.len()
        );
    }
    Ok(())
}

async fn run_health(settings: &Settings, format: ResultFormat) -> Result<()> {
    let spinner = Spinner::new("Checking services");

    let structured = StructuredClient::new(
        HttpClient::new()?,
        settings.structured.client_settings(),
    );
    let structured_up = !settings.structured.url.is_empty()
        && structured
            .is_alive(
                &settings.structured.url,
                settings.structured.probe_timeout(),
            )
            .await;

    let ocr = OcrExtractor::from_settings(settings.ocr.clone());
    let ocr_up = settings.ocr.enabled && ocr.is_available().await;
    spinner.finish();

    match format {
        ResultFormat::Json => {
            let report = json!({
                "structuredService": {
                    "url": settings.structured.url,
                    "available": structured_up,
                },
                "ocr": {
                    "enabled": settings.ocr.enabled,
                    "available": ocr_up,
                },
                "registry": {
                    "enabled": settings.registry.enabled,
                    "url": settings.registry.base_url,
                },
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ResultFormat::Table | ResultFormat::Plain => {
            ui::print_section("Health");
            let line = |up: bool, msg: String| {
                ui::print_status(if up { Status::Success } else { Status::Error }, &msg)
            };
            line(
                structured_up,
                format!(
                    "Structured parsing service ({})",
                    display_url(&settings.structured.url)
                ),
            );
            line(ocr_up, "OCR (pdftoppm + tesseract)".to_string());

            let (status, state) = if settings.registry.enabled {
                (Status::Info, "enabled")
            } else {
                (Status::Warning, "disabled")
            };
            ui::print_status(
                status,
                &format!("DOI registry {} ({})", state, settings.registry.base_url),
            );
        }
    }
    Ok(())
}

fn display_url(url: &str) -> &str {
    if url.is_empty() {
        "not configured"
    } else {
        url
    }
}

async fn run_classify(settings: &Settings, file: &Path, format: ResultFormat) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let reader: Arc<dyn TextLayerReader> = Arc::new(PdfTextReader::new());
    let thresholds = settings.scan;
    let probe = {
        let reader = Arc::clone(&reader);
        tokio::task::spawn_blocking(move || reader.probe(&bytes, thresholds.sample_pages))
            .await?
            .with_context(|| format!("Failed to read PDF {}", file.display()))?
    };
    let scanned = ScanClassifier::new(reader, thresholds).classify(&probe);

    match format {
        ResultFormat::Json => {
            let report = json!({
                "file": file.display().to_string(),
                "pages": probe.page_count,
                "firstPageChars": content_chars(&probe.first_page_text),
                "sampledPages": probe.sampled_pages,
                "charsPerPage": probe.chars_per_page(),
                "scanned": scanned,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ResultFormat::Table | ResultFormat::Plain => {
            let (status, verdict) = if scanned {
                (Status::Warning, "scanned")
            } else {
                (Status::Success, "has a text layer")
            };
            ui::print_status(
                status,
                &format!(
                    "{}: {} ({} pages, {} chars on page 1, {:.1} chars/page)",
                    file.display(),
                    verdict,
                    probe.page_count,
                    content_chars(&probe.first_page_text),
                    probe.chars_per_page()
                ),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_extract_defaults() {
        let cli = Cli::parse_from(["research-extract", "extract", "a.pdf", "b.pdf"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        match cli.command {
            Commands::Extract {
                files,
                jobs,
                service_url,
                no_ocr,
                timeout_ms,
            } => {
                assert_eq!(files, vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);
                assert_eq!(jobs, None);
                assert_eq!(service_url, None);
                assert!(!no_ocr);
                assert_eq!(timeout_ms, None);
            }
            other => panic!("expected extract, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_flags() {
        let cli = Cli::parse_from([
            "research-extract",
            "-vv",
            "extract",
            "paper.pdf",
            "--jobs",
            "4",
            "--service-url",
            "",
            "--no-ocr",
            "--timeout-ms",
            "5000",
            "-o",
            "json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Extract {
                jobs,
                service_url,
                no_ocr,
                timeout_ms,
                ..
            } => {
                assert_eq!(jobs, Some(4));
                assert_eq!(service_url.as_deref(), Some(""));
                assert!(no_ocr);
                assert_eq!(timeout_ms, Some(5000));
            }
            other => panic!("expected extract, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_requires_files() {
        let result = Cli::try_parse_from(["research-extract", "extract"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_alias() {
        let cli = Cli::parse_from(["research-extract", "x", "a.pdf"]);
        assert!(matches!(cli.command, Commands::Extract { .. }));
    }

    #[test]
    fn test_other_subcommands() {
        let cli = Cli::parse_from(["research-extract", "health"]);
        assert!(matches!(cli.command, Commands::Health));

        let cli = Cli::parse_from(["research-extract", "classify", "scan.pdf"]);
        assert!(matches!(cli.command, Commands::Classify { .. }));

        let cli = Cli::parse_from(["research-extract", "init-config", "cfg.toml", "--force"]);
        match cli.command {
            Commands::InitConfig { path, force } => {
                assert_eq!(path, PathBuf::from("cfg.toml"));
                assert!(force);
            }
            other => panic!("expected init-config, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "research-extract",
            "health",
            "--config",
            "custom.toml",
            "--log-format",
            "json",
            "-q",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert_eq!(cli.log_format, Some(LogFormatArg::Json));
        assert!(cli.quiet);
    }

    #[test]
    fn test_explicit_output_formats_resolve() {
        assert_eq!(OutputFormat::Json.resolve(), ResultFormat::Json);
        assert_eq!(OutputFormat::Table.resolve(), ResultFormat::Table);
        assert_eq!(OutputFormat::Plain.resolve(), ResultFormat::Plain);
    }

    #[test]
    fn test_display_url() {
        assert_eq!(display_url(""), "not configured");
        assert_eq!(display_url("http://grobid:8070"), "http://grobid:8070");
    }
}
