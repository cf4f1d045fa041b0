//! # ldi-extract
//!
//! Extract package-delivery records from scanned LDI manifests (internal
//! distribution lists) by driving the Docling-based `ldi_parser.py` script
//! as a child process.
//!
//! Document parsing, OCR and table detection all happen inside Docling. This
//! crate owns the boundary: finding a Python that can import Docling,
//! running the parser under a hard timeout, and turning whatever happens into
//! a typed [`ExtractionResult`] that never has to be unwrapped.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF path / upload buffer
//!  │
//!  ├─ 1. Input        check PDF + script exist; stage buffers to a temp file
//!  ├─ 2. Interpreter  probe candidates with --version, first exit 0 wins
//!  ├─ 3. Library      python -c "import docling; print(\"ok\")"
//!  ├─ 4. Process      python ldi_parser.py <pdf>, 120 s timeout, stderr streamed
//!  └─ 5. Contract     stdout JSON → ExtractionResult, processing time stamped
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ldi_extract::{extract_from_buffer, ExtractorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractorConfig::from_env()?;
//!     let bytes = std::fs::read("ldi.pdf")?;
//!     let result = extract_from_buffer(&bytes, "ldi.pdf", &config).await;
//!     for pkg in &result.packages {
//!         println!("{} {} {}", pkg.tracking_code, pkg.recipient, pkg.position);
//!     }
//!     let result = result.into_result()?; // Err when success == false
//!     eprintln!("{} packages in {}ms", result.total_packages, result.metadata.processing_time);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ldi-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorConfig, ExtractorConfigBuilder, DEFAULT_INTERPRETER_CANDIDATES};
pub use error::{ExtractError, FailureKind};
pub use extract::{extract, extract_from_buffer, extract_sync, is_available};
pub use output::{
    is_valid_tracking_code, ExtractedPackageRecord, ExtractionMetadata, ExtractionResult,
};
pub use pipeline::input::DEFAULT_UPLOAD_NAME;
pub use pipeline::interpreter::{resolve_interpreter, verify_library_installed};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
