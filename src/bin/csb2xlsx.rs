//! CLI binary for csb-extract.
//!
//! A thin shim over the library crate: maps CLI flags to
//! `ExtractionConfig` / `ExportConfig`, runs the batch and writes the workbook.

use anyhow::{Context, Result};
use clap::Parser;
use csb_extract::{
    export_records, resolve_inputs, BatchProgressCallback, ExportConfig, ExportOutcome,
    ExtractionConfig, PdfiumRasterizer, ProgressCallback, Session, VisionExtractor, XlsxWriter,
    DEFAULT_EXPORT_FILE,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar counting documents; the message shows the current file and page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
    }

    fn on_document_start(&self, current: usize, total: usize, name: &str) {
        self.bar.set_message(format!("{current}/{total} {name}"));
    }

    fn on_page_extracted(&self, current: usize, page_num: usize, total_pages: usize) {
        self.bar
            .set_message(format!("file {current} · page {page_num}/{total_pages}"));
    }

    fn on_document_complete(&self, current: usize, total: usize, name: &str, line_items: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            current,
            total,
            name,
            dim(&format!("{line_items} items")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_failed(&self, current: usize, name: &str, _message: &str) {
        self.bar
            .println(format!("  {} {:>3}  {}", red("✗"), current, red(name)));
        self.bar.abandon();
    }

    fn on_batch_complete(&self, _total_documents: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process every PDF in a folder, write extracted_shipping_data.xlsx
  csb2xlsx bills/

  # Explicit files and output path
  csb2xlsx CSB-001.pdf CSB-002.pdf -o march.xlsx

  # Print the consolidated records as JSON instead of writing a workbook
  csb2xlsx --json bills/ > records.json

  # Leave unknown cells empty
  csb2xlsx --unknown-marker "" bills/

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (preferred; default model gemini-2.5-pro)
  OPENAI_API_KEY          OpenAI API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise the system library is used)
"#;

/// Extract Courier Shipping Bill data from PDFs into an Excel workbook.
#[derive(Parser, Debug)]
#[command(
    name = "csb2xlsx",
    version,
    about = "Extract Courier Shipping Bill data from scanned PDFs into Excel using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files or directories containing PDFs.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Workbook to write.
    #[arg(short, long, env = "CSB_OUTPUT", default_value = DEFAULT_EXPORT_FILE)]
    output: PathBuf,

    /// LLM model ID (e.g. gemini-2.5-pro, gpt-4.1).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Page render scale (0.5–4.0).
    #[arg(long, env = "CSB_SCALE", default_value_t = 1.5)]
    scale: f32,

    /// JPEG quality (0.0–1.0).
    #[arg(long, env = "CSB_QUALITY", default_value_t = 0.9)]
    quality: f32,

    /// Documents processed at once. Output order is always input order.
    #[arg(short, long, env = "CSB_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Per-page LLM call timeout in seconds.
    #[arg(long, env = "CSB_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "CSB_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "CSB_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Text written into cells whose value was not found.
    #[arg(long, env = "CSB_UNKNOWN_MARKER", default_value = "N/A")]
    unknown_marker: String,

    /// Print consolidated records as JSON instead of writing a workbook.
    #[arg(long, env = "CSB_JSON")]
    json: bool,

    /// On failure, still export the records completed before the failing file.
    #[arg(long, env = "CSB_KEEP_PARTIAL")]
    keep_partial: bool,

    /// Disable progress bar.
    #[arg(long, env = "CSB_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CSB_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CSB_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inputs and config ────────────────────────────────────────────────
    let documents = resolve_inputs(&cli.inputs).context("Failed to resolve inputs")?;
    if documents.is_empty() {
        anyhow::bail!("No PDF files found in the given inputs");
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let extraction = build_config(&cli, progress).await?;
    let export = ExportConfig {
        unknown_marker: cli.unknown_marker.clone(),
        ..ExportConfig::default()
    };
    export.validate().context("Invalid export configuration")?;

    let rasterizer = Arc::new(PdfiumRasterizer::from_config(&extraction));
    let extractor =
        Arc::new(VisionExtractor::from_config(&extraction).context("Failed to set up LLM provider")?);
    let writer = Arc::new(XlsxWriter);

    let mut session = Session::new(rasterizer, extractor, writer.clone(), extraction, export.clone());

    // ── Process ──────────────────────────────────────────────────────────
    if let Err(err) = session.process(&documents).await {
        error!("{err:#}");
        eprintln!("{} {}", red("✘"), err.user_message());

        if cli.keep_partial && !err.completed.is_empty() && !cli.json {
            let outcome = export_records(&err.completed, &cli.output, writer.as_ref(), &export)
                .context("Export failed")?;
            report_export(&outcome, cli.quiet);
        }
        return Ok(ExitCode::FAILURE);
    }

    if !cli.quiet {
        if let Some(stats) = session.stats() {
            eprintln!(
                "{} {} files  {} pages  {} items  {}ms",
                green("✔"),
                bold(&stats.documents.to_string()),
                stats.pages,
                stats.line_items,
                stats.duration_ms,
            );
        }
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(session.records())
            .context("Failed to serialise records")?;
        let mut out = io::stdout().lock();
        writeln!(out, "{json}").context("Failed to write to stdout")?;
    } else {
        let outcome = session.export(&cli.output).context("Export failed")?;
        report_export(&outcome, cli.quiet);
    }

    Ok(ExitCode::SUCCESS)
}

fn report_export(outcome: &ExportOutcome, quiet: bool) {
    if quiet {
        return;
    }
    match outcome {
        ExportOutcome::Written { path, rows } => eprintln!(
            "   {} rows  →  {}",
            rows,
            bold(&path.display().to_string())
        ),
        ExportOutcome::NoOp => eprintln!("   {}", dim("No data to export.")),
    }
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .render_scale(cli.scale)
        .jpeg_quality(cli.quality)
        .concurrency(cli.concurrency)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
