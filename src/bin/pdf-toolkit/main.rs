//! CLI binary for pdf-toolkit.
//!
//! A thin shim over the library crate: maps subcommands and flags to
//! `PdfToolkit` calls, installs logging, and turns the result into an exit
//! code (0 on success, 1 on any failure).

mod progress;
mod webhook;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_toolkit::{
    CompressionLevel, EncryptionAlgorithm, ErrorKind, OperationOutput, PageRange, PdfSource,
    PdfToolkit, ProgressCallback, ToolkitConfig, ToolkitError,
};
use progress::CliProgress;
use serde::Serialize;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use webhook::WebhookSink;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

/// Upper bound for `--max-size-mb`; keeps the byte limit well inside `u64`.
const MAX_SIZE_MB: u64 = 1024 * 1024;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compress with the strongest setting
  pdf-toolkit compress report.pdf report.small.pdf --level 10

  # Extract every table into one spreadsheet
  pdf-toolkit to-excel invoices.pdf invoices.xlsx --batch-size 10

  # Convert pages 3 to 7 (0-based, inclusive) to Word
  pdf-toolkit to-word paper.pdf paper.docx --start-page 3 --end-page 7

  # Merge in the given order
  pdf-toolkit merge cover.pdf body.pdf appendix.pdf book.pdf

  # Password-protect, then remove the protection again
  pdf-toolkit encrypt in.pdf locked.pdf -p s3cret -a AES-128
  pdf-toolkit decrypt locked.pdf open.pdf -p s3cret

  # Machine-readable result
  pdf-toolkit --json compress in.pdf out.pdf

ENCRYPTION ALGORITHMS:
  RC4-40, RC4-128, AES-128, AES-256-R5 (default), AES-256

LIMITS:
  Inputs larger than 30 MB (see --max-size-mb) or whose content is not a
  PDF are rejected before any processing. The file extension is ignored.

ENVIRONMENT VARIABLES:
  RUST_LOG                       Overrides --log-level (tracing filter syntax)
  PDF_TOOLKIT_LOG_LEVEL          Same as --log-level
  PDF_TOOLKIT_DISCORD_WEBHOOK    Same as --discord-webhook
  PDF_TOOLKIT_MAX_SIZE_MB        Same as --max-size-mb
"#;

/// Compress, merge, encrypt, decrypt and convert PDF files.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-toolkit",
    version,
    about = "Compress, merge, encrypt, decrypt and convert PDF files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level logs (overrides --log-level).
    #[arg(short, long, global = true, env = "PDF_TOOLKIT_VERBOSE")]
    verbose: bool,

    /// Log level.
    #[arg(long, global = true, value_enum, ignore_case = true,
          env = "PDF_TOOLKIT_LOG_LEVEL", default_value = "INFO")]
    log_level: LogLevel,

    /// Also send log messages to this Discord webhook URL.
    #[arg(long, global = true, env = "PDF_TOOLKIT_DISCORD_WEBHOOK")]
    discord_webhook: Option<String>,

    /// Print a JSON report on stdout instead of a summary line.
    #[arg(long, global = true, env = "PDF_TOOLKIT_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "PDF_TOOLKIT_NO_PROGRESS")]
    no_progress: bool,

    /// Reject inputs larger than this many MiB (at most 1048576, i.e. 1 TiB).
    #[arg(long, global = true, env = "PDF_TOOLKIT_MAX_SIZE_MB", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..=MAX_SIZE_MB))]
    max_size_mb: u64,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Compress a PDF file.
    Compress {
        input_pdf: PathBuf,
        output_pdf: PathBuf,
        /// Compression level, 1 (fastest) to 10 (smallest). Out-of-range values are clamped.
        #[arg(short, long, default_value_t = 5)]
        level: i64,
    },

    /// Extract the tables of a PDF into an Excel file.
    ToExcel {
        input_pdf: PathBuf,
        output_excel: PathBuf,
        /// Pages processed per batch.
        #[arg(short, long, default_value_t = 5)]
        batch_size: usize,
    },

    /// Convert a PDF to a Word document.
    ToWord {
        input_pdf: PathBuf,
        output_word: PathBuf,
        /// First page to convert (0-based).
        #[arg(short, long, default_value_t = 0)]
        start_page: usize,
        /// Last page to convert (0-based, inclusive). Default: last page.
        #[arg(short, long)]
        end_page: Option<usize>,
    },

    /// Merge PDF files in the given order.
    Merge {
        /// Input PDF files followed by the output path.
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
    },

    /// Encrypt a PDF file with a password.
    Encrypt {
        input_pdf: PathBuf,
        output_pdf: PathBuf,
        /// Password for encryption.
        #[arg(short, long, env = "PDF_TOOLKIT_PASSWORD")]
        password: String,
        /// Encryption algorithm.
        #[arg(short, long, default_value = "AES-256-R5")]
        algorithm: String,
    },

    /// Decrypt a password-protected PDF file.
    Decrypt {
        input_pdf: PathBuf,
        output_pdf: PathBuf,
        /// Password for decryption.
        #[arg(short, long, env = "PDF_TOOLKIT_PASSWORD")]
        password: String,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Compress { .. } => "compress",
            Command::ToExcel { .. } => "to-excel",
            Command::ToWord { .. } => "to-word",
            Command::Merge { .. } => "merge",
            Command::Encrypt { .. } => "encrypt",
            Command::Decrypt { .. } => "decrypt",
        }
    }

    /// Progress label and failure prefix.
    fn label(&self) -> &'static str {
        match self {
            Command::Compress { .. } => "Compression",
            Command::ToExcel { .. } => "Conversion to Excel",
            Command::ToWord { .. } => "Conversion to Word",
            Command::Merge { .. } => "Merging",
            Command::Encrypt { .. } => "Encryption",
            Command::Decrypt { .. } => "Decryption",
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum LogLevel {
    #[value(name = "DEBUG")]
    Debug,
    #[value(name = "INFO")]
    Info,
    #[value(name = "WARNING", alias = "WARN")]
    Warning,
    #[value(name = "ERROR")]
    Error,
}

impl LogLevel {
    fn filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }

    fn level(self) -> Level {
        match self {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warning => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// `--json` report.
#[derive(Serialize)]
struct Report<'a> {
    command: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a OperationOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO lines would tear the progress bar apart; while it is
    // shown only warnings and errors get through.
    let show_progress =
        !cli.no_progress && !cli.json && !cli.verbose && io::stderr().is_terminal();
    let level = if cli.verbose {
        LogLevel::Debug
    } else if show_progress {
        cli.log_level.max(LogLevel::Warning)
    } else {
        cli.log_level
    };
    let sink = init_logging(level, cli.discord_webhook.clone());

    let code = match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            ExitCode::FAILURE
        }
    };

    if let Some(sink) = sink {
        sink.flush(Duration::from_secs(5)).await;
    }
    code
}

fn init_logging(level: LogLevel, webhook: Option<String>) -> Option<WebhookSink> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.filter()));
    let (webhook_layer, sink) = match webhook {
        Some(url) => {
            let (layer, sink) = webhook::channel(url, level.level());
            (Some(layer), Some(sink))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(webhook_layer)
        .init();
    sink
}

/// Execute the subcommand. Operation failures are reported (log line,
/// JSON report) here and surface as `Err` only to set the exit code.
async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let config = ToolkitConfig::builder()
        .max_file_size(cli.max_size_mb * 1024 * 1024)
        .build()
        .context("Invalid configuration")?;

    let bar = show_progress.then(|| CliProgress::new(cli.command.label()));
    let mut toolkit = PdfToolkit::new(config);
    if let Some(ref bar) = bar {
        toolkit = toolkit.with_progress(bar.clone() as ProgressCallback);
    }

    let command = cli.command.clone();
    info!("Running {}", command.name());
    // The library is synchronous; keep it off the runtime threads so the
    // webhook task keeps delivering while an operation runs.
    let result = tokio::task::spawn_blocking(move || execute(&toolkit, command))
        .await
        .unwrap_or_else(|e| Err(ToolkitError::Internal(format!("task panicked: {e}"))));

    if let Some(bar) = bar {
        bar.clear();
    }

    let label = cli.command.label();
    match result {
        Ok(output) => {
            if cli.json {
                print_report(&Report {
                    command: cli.command.name(),
                    success: true,
                    output: Some(&output),
                    kind: None,
                    message: None,
                })?;
            } else if let Some(path) = output.path() {
                eprintln!(
                    "{} {} completed  →  {}",
                    green("✔"),
                    label,
                    bold(&path.display().to_string())
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("{} failed: {}", label, e);
            if cli.json {
                print_report(&Report {
                    command: cli.command.name(),
                    success: false,
                    output: None,
                    kind: Some(e.kind()),
                    message: Some(e.to_string()),
                })?;
            }
            Err(anyhow::anyhow!("{} failed: {}", label, dim(&e.to_string())))
        }
    }
}

fn execute(toolkit: &PdfToolkit, command: Command) -> Result<OperationOutput, ToolkitError> {
    match command {
        Command::Compress {
            input_pdf,
            output_pdf,
            level,
        } => toolkit.compress(
            input_pdf,
            Some(output_pdf.as_path()),
            CompressionLevel::new(level),
        ),
        Command::ToExcel {
            input_pdf,
            output_excel,
            batch_size,
        } => toolkit.to_excel(input_pdf, Some(output_excel.as_path()), Some(batch_size)),
        Command::ToWord {
            input_pdf,
            output_word,
            start_page,
            end_page,
        } => toolkit.to_word(
            input_pdf,
            Some(output_word.as_path()),
            PageRange::new(start_page, end_page),
        ),
        Command::Merge { mut paths } => {
            // clap guarantees at least two paths: inputs..., output.
            let output = paths
                .pop()
                .ok_or_else(|| ToolkitError::TooFewInputs { given: 0 })?;
            let sources = paths.into_iter().map(PdfSource::from).collect();
            toolkit.merge(sources, Some(output.as_path()))
        }
        Command::Encrypt {
            input_pdf,
            output_pdf,
            password,
            algorithm,
        } => {
            let algorithm: EncryptionAlgorithm = algorithm.parse()?;
            toolkit.encrypt(input_pdf, Some(output_pdf.as_path()), &password, Some(algorithm))
        }
        Command::Decrypt {
            input_pdf,
            output_pdf,
            password,
        } => toolkit.decrypt(input_pdf, Some(output_pdf.as_path()), &password),
    }
}

fn print_report(report: &Report<'_>) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("Failed to serialise report")?
    );
    Ok(())
}
