//! Extraction entry points.
//!
//! None of these functions return `Err` or panic on a bad environment: every
//! outcome is an [`ExtractionResult`], with failures encoded as
//! `success: false` and human-readable `errors`. Callers that prefer `?`
//! can chain [`ExtractionResult::into_result`].

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::output::ExtractionResult;
use crate::pipeline::input::{self, DEFAULT_UPLOAD_NAME};
use crate::pipeline::interpreter::{resolve_interpreter, verify_library_installed};
use crate::pipeline::{contract, process};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Extract package records from a PDF on disk.
///
/// Steps, in order, each stopping at the first failure:
/// 1. the PDF must exist (no process is spawned otherwise)
/// 2. the parser script must exist
/// 3. an interpreter must answer the version probe
/// 4. the interpreter must import the library (failure adds a fallback warning)
/// 5. the parser runs under `config.timeout`
/// 6. a zero exit must print a valid result document
///
/// On success the script's result is returned as-is except for
/// `metadata.processing_time`, which is replaced by the wall-clock time
/// measured here. Failures from step 5 on also carry the measured time.
///
/// # Example
/// ```rust,no_run
/// use ldi_extract::{extract, ExtractorConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = ExtractorConfig::default();
/// let result = extract("manifest.pdf", &config).await;
/// if result.success {
///     println!("{} packages", result.total_packages);
/// } else {
///     eprintln!("{}", result.errors.join("\n"));
/// }
/// # }
/// ```
pub async fn extract(pdf_path: impl AsRef<Path>, config: &ExtractorConfig) -> ExtractionResult {
    let pdf_path = pdf_path.as_ref();
    let file_name = display_name(pdf_path);
    info!("Starting extraction: {}", pdf_path.display());

    // ── Step 1-2: Environment ────────────────────────────────────────────
    if let Err(e) = input::check_input(pdf_path).and_then(|()| input::check_script(&config.script_path)) {
        return report(failed(&file_name, config, &e), config);
    }

    // ── Step 3: Interpreter ──────────────────────────────────────────────
    let Some(interpreter) = resolve_interpreter(config).await else {
        return report(
            failed(&file_name, config, &ExtractError::InterpreterNotFound),
            config,
        );
    };

    // ── Step 4: Library ──────────────────────────────────────────────────
    if !verify_library_installed(&interpreter, config).await {
        let e = ExtractError::LibraryMissing {
            module: config.library_module.clone(),
            interpreter,
        };
        return report(failed(&file_name, config, &e), config);
    }

    // ── Step 5-6: Run and parse ──────────────────────────────────────────
    let start = Instant::now();
    let outcome = process::run_parser(&interpreter, &config.script_path, pdf_path, config)
        .await
        .and_then(|stdout| contract::parse_result(&stdout));
    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!("Parser finished in {}ms", elapsed_ms);

    let result = match outcome {
        Ok(parsed) => {
            info!("Parser extracted {} packages", parsed.total_packages);
            parsed.with_processing_time(elapsed_ms)
        }
        Err(e) => failed(&file_name, config, &e).with_processing_time(elapsed_ms),
    };

    report(result, config)
}

/// Extract package records from an in-memory upload.
///
/// The buffer is staged under `config.temp_dir`, passed to [`extract`], and
/// the staged file is removed afterward whatever the outcome; a failed
/// removal is logged, never returned. `metadata.file_name` is set to
/// `file_name` rather than the staged path. An empty `file_name` means
/// [`DEFAULT_UPLOAD_NAME`].
pub async fn extract_from_buffer(
    bytes: &[u8],
    file_name: &str,
    config: &ExtractorConfig,
) -> ExtractionResult {
    let file_name = if file_name.trim().is_empty() {
        DEFAULT_UPLOAD_NAME
    } else {
        file_name
    };

    let staged = match input::stage_buffer(bytes, file_name, &config.temp_dir) {
        Ok(path) => path,
        Err(e) => return report(failed(file_name, config, &e), config),
    };

    // `staged` deletes itself on drop, so a panic or a cancelled future
    // inside `extract` still cleans up.
    let mut result = extract(&staged, config).await;
    result.metadata.file_name = file_name.to_string();

    input::remove_staged(staged);
    result
}

/// `true` when an interpreter is found and can import the library.
///
/// Independent of any particular file; meant for readiness checks.
pub async fn is_available(config: &ExtractorConfig) -> bool {
    match resolve_interpreter(config).await {
        Some(interpreter) => verify_library_installed(&interpreter, config).await,
        None => false,
    }
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally; must not be called from
/// inside an async context.
pub fn extract_sync(pdf_path: impl AsRef<Path>, config: &ExtractorConfig) -> ExtractionResult {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(extract(pdf_path, config)),
        Err(e) => {
            let file_name = display_name(pdf_path.as_ref());
            report(
                failed(&file_name, config, &ExtractError::Runtime(e.to_string())),
                config,
            )
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn failed(file_name: &str, config: &ExtractorConfig, err: &ExtractError) -> ExtractionResult {
    warn!("Extraction failed for {}: {}", file_name, err);
    ExtractionResult::failure(file_name, config.strategy.as_str(), err)
}

/// Notify the progress callback and hand the result back.
fn report(result: ExtractionResult, config: &ExtractorConfig) -> ExtractionResult {
    if let Some(ref cb) = config.progress_callback {
        cb.on_complete(
            result.success,
            result.total_packages,
            result.metadata.processing_time,
        );
    }
    result
}

/// Base name of `path`, falling back to the full path.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
