//! Progress-callback trait for extraction lifecycle events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractorConfigBuilder::progress_callback`] to observe a
//! run as it happens: which interpreter won the probe, every stderr line the
//! parser script prints, and the final outcome.
//!
//! The parser can take a minute or more on a scanned manifest and reports
//! its progress only on stderr. Forwarding those lines lets the host show
//! them live (a spinner message, a WebSocket push) instead of waiting for
//! the process to exit.
//!
//! # Example
//!
//! ```rust
//! use ldi_extract::{ExtractionProgressCallback, ExtractorConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct LineCounter {
//!     lines: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for LineCounter {
//!     fn on_stderr_line(&self, line: &str) {
//!         self.lines.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("parser: {line}");
//!     }
//! }
//!
//! let counter = Arc::new(LineCounter { lines: AtomicUsize::new(0) });
//!
//! let config = ExtractorConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the orchestrator as an extraction progresses.
///
/// All methods default to no-ops. `on_stderr_line` is invoked from the task
/// draining the child's stderr, so implementations must be `Send + Sync`.
pub trait ExtractionProgressCallback: Send + Sync {
    /// An interpreter answered the version probe.
    fn on_interpreter_resolved(&self, interpreter: &Path) {
        let _ = interpreter;
    }

    /// The parser process was started.
    fn on_spawn(&self, pdf_path: &Path) {
        let _ = pdf_path;
    }

    /// One line of parser stderr, without the trailing newline.
    fn on_stderr_line(&self, line: &str) {
        let _ = line;
    }

    /// The run finished, successfully or not.
    ///
    /// # Arguments
    /// * `success`        : the result's `success` flag
    /// * `total_packages` : packages reported (0 on failure)
    /// * `elapsed_ms`     : measured wall-clock time
    fn on_complete(&self, success: bool, total_packages: u32, elapsed_ms: u64) {
        let _ = (success, total_packages, elapsed_ms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractorConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
