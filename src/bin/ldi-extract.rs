//! CLI binary for ldi-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractorConfig`, runs one extraction and prints the packages.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ldi_extract::{
    extract, extract_from_buffer, resolve_interpreter, verify_library_installed,
    ExtractionProgressCallback, ExtractionResult, ExtractorConfig, ProgressCallback,
    DEFAULT_UPLOAD_NAME,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that shows the parser's latest stderr line while it runs.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Number of stderr lines seen, reported in the final summary.
    stderr_lines: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Probing Python interpreters…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stderr_lines: AtomicUsize::new(0),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_interpreter_resolved(&self, interpreter: &Path) {
        self.bar
            .set_message(format!("Using {}", interpreter.display()));
    }

    fn on_spawn(&self, _pdf_path: &Path) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message("Docling is reading the manifest…");
    }

    fn on_stderr_line(&self, line: &str) {
        self.stderr_lines.fetch_add(1, Ordering::SeqCst);
        self.bar.set_message(truncate(line, 80));
    }

    fn on_complete(&self, success: bool, total_packages: u32, elapsed_ms: u64) {
        self.bar.finish_and_clear();
        let secs = elapsed_ms as f64 / 1000.0;
        let lines = self.stderr_lines.load(Ordering::SeqCst);
        if success {
            eprintln!(
                "{} {} packages extracted  {}",
                green("✔"),
                bold(&total_packages.to_string()),
                dim(&format!("{secs:.1}s, {lines} parser log lines")),
            );
        } else {
            eprintln!("{} extraction failed  {}", red("✘"), dim(&format!("{secs:.1}s")));
        }
    }
}

/// First `max` characters of `s`, with an ellipsis when cut.
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max.saturating_sub(1)) {
        Some((idx, _)) if s.chars().count() > max => format!("{}\u{2026}", &s[..idx]),
        _ => s.to_string(),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a manifest and print the package table
  ldi-extract LDI-2025-03-10.pdf

  # Raw JSON result (same shape the upload route returns)
  ldi-extract --json LDI-2025-03-10.pdf > result.json

  # Read the PDF from stdin, as an upload would arrive
  cat LDI.pdf | ldi-extract --name LDI.pdf -

  # Check that Python and Docling are usable
  ldi-extract --check

ENVIRONMENT VARIABLES:
  LDI_PARSER_SCRIPT       Path to ldi_parser.py
  DOCLING_PYTHON          Interpreter probed before the built-in candidates
  DOCLING_TIMEOUT_SECS    Parser timeout in seconds (default 120)
  DOCLING_TEMP_DIR        Staging directory for stdin uploads
  RUST_LOG                Log filter, e.g. ldi_extract=debug

INTERPRETER CANDIDATES (probed in order, first `--version` exit 0 wins):
  /opt/venv/bin/python3, /opt/venv/bin/python, python3, python,
  /usr/bin/python3, /usr/local/bin/python3
"#;

/// Extract package records from LDI delivery manifests with Docling.
#[derive(Parser, Debug)]
#[command(
    name = "ldi-extract",
    version,
    about = "Extract package records from LDI delivery manifests with Docling",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file path, or `-` to read the PDF from stdin.
    #[arg(required_unless_present = "check")]
    input: Option<String>,

    /// Original file name for stdin uploads.
    #[arg(long, default_value = DEFAULT_UPLOAD_NAME)]
    name: String,

    /// Path to the parser script.
    #[arg(long, env = "LDI_PARSER_SCRIPT")]
    script: Option<PathBuf>,

    /// Interpreter to probe before the built-in candidates.
    #[arg(long, env = "DOCLING_PYTHON")]
    python: Option<PathBuf>,

    /// Parser timeout in seconds.
    #[arg(long, env = "DOCLING_TIMEOUT_SECS", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Staging directory for stdin uploads.
    #[arg(long, env = "DOCLING_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Print the raw ExtractionResult as JSON.
    #[arg(long)]
    json: bool,

    /// Only check that an interpreter with Docling is available.
    #[arg(long)]
    check: bool,

    /// Disable the spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already shows the parser's stderr, so INFO logs would only
    // duplicate it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Availability check ───────────────────────────────────────────────
    if cli.check {
        return check(&config, cli.quiet).await;
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let input = cli.input.as_deref().context("No input PDF given")?;
    let result = if input == "-" {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .context("Failed to read PDF from stdin")?;
        extract_from_buffer(&bytes, &cli.name, &config).await
    } else {
        extract(input, &config).await
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else {
        print_result(&result, cli.quiet).context("Failed to write to stdout")?;
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `ExtractorConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder().timeout(Duration::from_secs(cli.timeout));

    if let Some(ref script) = cli.script {
        builder = builder.script_path(script);
    }
    if let Some(ref python) = cli.python {
        builder = builder.prepend_interpreter(python);
    }
    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `--check`: report which interpreter would be used and whether it has Docling.
async fn check(config: &ExtractorConfig, quiet: bool) -> Result<ExitCode> {
    let Some(interpreter) = resolve_interpreter(config).await else {
        eprintln!("{} Python não encontrado no sistema", red("✘"));
        return Ok(ExitCode::FAILURE);
    };

    if !verify_library_installed(&interpreter, config).await {
        eprintln!(
            "{} {} cannot import {}",
            red("✘"),
            bold(&interpreter.display().to_string()),
            config.library_module
        );
        return Ok(ExitCode::FAILURE);
    }

    if !quiet {
        eprintln!(
            "{} {} with {}  {}",
            green("✔"),
            bold(&interpreter.display().to_string()),
            config.library_module,
            dim(&format!("script: {}", config.script_path.display())),
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Human-readable rendering: package table on stdout, diagnostics on stderr.
fn print_result(result: &ExtractionResult, quiet: bool) -> io::Result<()> {
    if !result.success {
        for e in &result.errors {
            eprintln!("{} {}", red("✘"), e);
        }
        for w in &result.warnings {
            eprintln!("{} {}", cyan("⚠"), w);
        }
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(
        out,
        "{:>4}  {:<13}  {:<36}  {:<8}  {:<10}  {:<10}  {:>4}",
        "#", "TRACKING", "RECIPIENT", "POSITION", "DATE", "DEADLINE", "CONF"
    )?;
    for p in &result.packages {
        writeln!(
            out,
            "{:>4}  {:<13}  {:<36}  {:<8}  {:<10}  {:<10}  {:>3.0}%",
            p.line_number,
            p.tracking_code,
            truncate(&p.recipient, 36),
            p.position,
            p.date,
            p.pickup_deadline_str.as_deref().unwrap_or("-"),
            p.confidence_ratio() * 100.0,
        )?;
    }

    if quiet {
        return Ok(());
    }

    let meta = &result.metadata;
    eprintln!(
        "{}  {} packages  {} pages  {}ms  {}",
        bold(&meta.file_name),
        result.total_packages,
        meta.pages_processed,
        meta.processing_time,
        dim(&meta.strategy),
    );
    if let Some(ref d) = meta.arrival_date {
        eprintln!("   arrival date: {d}");
    }
    if let Some(ref d) = meta.return_date {
        eprintln!("   return date: {d}");
    }
    for w in &result.warnings {
        eprintln!("{} {}", cyan("⚠"), w);
    }
    if !result.is_consistent() {
        eprintln!(
            "{} totalPackages is {} but {} records were returned",
            cyan("⚠"),
            result.total_packages,
            result.packages.len()
        );
    }
    if let Some(diff) = result.count_mismatch() {
        eprintln!(
            "{} manifest lists {} packages, {} extracted ({:+})",
            cyan("⚠"),
            meta.expected_total,
            meta.extracted_total,
            -diff
        );
    }
    for p in result.invalid_tracking_codes() {
        eprintln!(
            "{} line {}: '{}' is not a valid tracking code",
            cyan("⚠"),
            p.line_number,
            p.tracking_code
        );
    }
    Ok(())
}
