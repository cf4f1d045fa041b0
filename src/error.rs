//! Failure taxonomy for the extraction orchestrator.
//!
//! Every failure the orchestrator can hit is an [`ExtractError`] internally,
//! but none of them escape as `Err` from the public entry points. Instead
//! they are rendered into the `errors` (and sometimes `warnings`) arrays of
//! an [`crate::output::ExtractionResult`] with `success: false`. The upload
//! route forwards those strings verbatim, so the `Display` text of each
//! variant is part of the observable contract.
//!
//! The variants group into five coarse [`FailureKind`]s so callers can map
//! them to HTTP responses without string matching:
//!
//! | Kind | Variants |
//! |------|----------|
//! | `EnvironmentMissing` | [`ExtractError::InputNotFound`], [`ExtractError::ScriptNotFound`] |
//! | `ToolUnavailable` | [`ExtractError::InterpreterNotFound`], [`ExtractError::LibraryMissing`] |
//! | `ProcessFailure` | [`ExtractError::NonZeroExit`], [`ExtractError::TimedOut`] |
//! | `ProtocolViolation` | [`ExtractError::MalformedOutput`] |
//! | `SpawnFailure` | [`ExtractError::Spawn`] |

use std::path::PathBuf;
use thiserror::Error;

/// Advisory warning attached when the Python library is missing.
pub const FALLBACK_WARNING: &str = "Fallback para métodos alternativos de extração";

/// Coarse classification of an [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Input PDF or parser script absent from disk.
    EnvironmentMissing,
    /// No usable interpreter, or the library is not importable.
    ToolUnavailable,
    /// The child ran but exited non-zero or was killed at the timeout.
    ProcessFailure,
    /// Exit 0 but stdout did not match the result contract.
    ProtocolViolation,
    /// The OS refused to start the child.
    SpawnFailure,
    /// Staging, runtime or configuration problems inside this crate.
    Internal,
}

/// Every way an extraction can fail.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Environment ───────────────────────────────────────────────────────
    /// The PDF to extract does not exist.
    #[error("Arquivo não encontrado: {}", .path.display())]
    InputNotFound { path: PathBuf },

    /// The parser script is missing (a packaging defect).
    #[error("Script Python não encontrado: {}", .path.display())]
    ScriptNotFound { path: PathBuf },

    // ── Tooling ───────────────────────────────────────────────────────────
    /// No candidate interpreter answered the version probe.
    #[error("Python não encontrado no sistema")]
    InterpreterNotFound,

    /// An interpreter was found but cannot import the extraction library.
    ///
    /// The message names `module` with its first letter capitalised, so the
    /// default reads "Docling não está instalado".
    #[error("{} não está instalado. Execute: pip install {module} pandas", capitalize(.module))]
    LibraryMissing { module: String, interpreter: PathBuf },

    // ── Process ───────────────────────────────────────────────────────────
    /// The child exited with a non-zero status (or was killed by a signal).
    ///
    /// `status` is preformatted so signal deaths render as readably as
    /// plain exit codes.
    #[error("Processo Python terminou com código {status}")]
    NonZeroExit { status: String, stderr: String },

    /// The child exceeded the wall-clock timeout and was killed.
    #[error("Processo Python excedeu o tempo limite de {secs}s e foi encerrado")]
    TimedOut { secs: u64, stderr: String },

    /// Exit 0 but stdout is not a valid result document.
    #[error("Erro ao parsear resposta do Python: {detail}")]
    MalformedOutput { detail: String, excerpt: String },

    /// The OS could not start the child process.
    #[error("Erro ao executar Python: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    // ── Internal ──────────────────────────────────────────────────────────
    /// The upload buffer could not be staged to a temporary file.
    #[error("Não foi possível gravar arquivo temporário em '{}': {source}", .dir.display())]
    TempFile {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tokio runtime could not be created for the blocking wrapper.
    #[error("Falha ao criar runtime: {0}")]
    Runtime(String),

    /// Builder validation failed.
    #[error("Configuração inválida: {0}")]
    InvalidConfig(String),

    /// A result with `success: false`, converted by
    /// [`crate::output::ExtractionResult::into_result`].
    #[error("Extração falhou: {}", .errors.join("; "))]
    Reported { errors: Vec<String> },
}

impl ExtractError {
    /// Coarse classification used for routing and metrics.
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractError::InputNotFound { .. } | ExtractError::ScriptNotFound { .. } => {
                FailureKind::EnvironmentMissing
            }
            ExtractError::InterpreterNotFound | ExtractError::LibraryMissing { .. } => {
                FailureKind::ToolUnavailable
            }
            ExtractError::NonZeroExit { .. } | ExtractError::TimedOut { .. } => {
                FailureKind::ProcessFailure
            }
            ExtractError::MalformedOutput { .. } => FailureKind::ProtocolViolation,
            ExtractError::Spawn { .. } => FailureKind::SpawnFailure,
            ExtractError::TempFile { .. }
            | ExtractError::Runtime(_)
            | ExtractError::InvalidConfig(_)
            | ExtractError::Reported { .. } => FailureKind::Internal,
        }
    }

    /// Lines to append to `ExtractionResult::errors`.
    ///
    /// The first line is always the `Display` text. Process failures add the
    /// captured stderr as its own entry and malformed output adds the stdout
    /// excerpt, so operators see the raw diagnostics next to the summary.
    pub fn error_lines(&self) -> Vec<String> {
        let mut lines = vec![self.to_string()];
        match self {
            ExtractError::NonZeroExit { stderr, .. } | ExtractError::TimedOut { stderr, .. } => {
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    lines.push(stderr.to_string());
                }
            }
            ExtractError::MalformedOutput { excerpt, .. } => {
                lines.push(format!("Stdout: {excerpt}"));
            }
            ExtractError::Reported { errors } => {
                // Already a flattened list; do not wrap it twice.
                return errors.clone();
            }
            _ => {}
        }
        lines
    }

    /// Advisory warning that accompanies this failure, if any.
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            ExtractError::LibraryMissing { .. } => Some(FALLBACK_WARNING),
            _ => None,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_not_found_mentions_path() {
        let e = ExtractError::InputNotFound {
            path: PathBuf::from("/tmp/missing.pdf"),
        };
        assert!(e.to_string().contains("/tmp/missing.pdf"));
        assert_eq!(e.kind(), FailureKind::EnvironmentMissing);
    }

    #[test]
    fn interpreter_not_found_text() {
        let e = ExtractError::InterpreterNotFound;
        assert!(e.to_string().contains("Python não encontrado"));
        assert_eq!(e.kind(), FailureKind::ToolUnavailable);
        assert!(e.warning().is_none());
    }

    #[test]
    fn library_missing_carries_warning() {
        let e = ExtractError::LibraryMissing {
            module: "docling".into(),
            interpreter: PathBuf::from("python3"),
        };
        assert_eq!(
            e.to_string(),
            "Docling não está instalado. Execute: pip install docling pandas"
        );
        assert_eq!(e.warning(), Some(FALLBACK_WARNING));
    }

    #[test]
    fn library_missing_names_configured_module() {
        let e = ExtractError::LibraryMissing {
            module: "camelot".into(),
            interpreter: PathBuf::from("python3"),
        };
        assert_eq!(
            e.to_string(),
            "Camelot não está instalado. Execute: pip install camelot pandas"
        );
    }

    #[test]
    fn non_zero_exit_lines_include_stderr() {
        let e = ExtractError::NonZeroExit {
            status: "1".into(),
            stderr: "  ImportError: no module\n".into(),
        };
        let lines = e.error_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("código 1"));
        assert_eq!(lines[1], "ImportError: no module");
    }

    #[test]
    fn non_zero_exit_without_stderr_is_single_line() {
        let e = ExtractError::NonZeroExit {
            status: "2".into(),
            stderr: "   ".into(),
        };
        assert_eq!(e.error_lines().len(), 1);
    }

    #[test]
    fn malformed_output_lines_include_excerpt() {
        let e = ExtractError::MalformedOutput {
            detail: "expected value at line 1 column 1".into(),
            excerpt: "not json".into(),
        };
        let lines = e.error_lines();
        assert!(lines[0].contains("parsear"));
        assert_eq!(lines[1], "Stdout: not json");
        assert_eq!(e.kind(), FailureKind::ProtocolViolation);
    }

    #[test]
    fn reported_is_not_rewrapped() {
        let e = ExtractError::Reported {
            errors: vec!["a".into(), "b".into()],
        };
        assert_eq!(e.error_lines(), vec!["a".to_string(), "b".to_string()]);
        assert!(e.to_string().contains("a; b"));
    }

    #[test]
    fn timed_out_display() {
        let e = ExtractError::TimedOut {
            secs: 120,
            stderr: String::new(),
        };
        assert!(e.to_string().contains("120s"));
        assert_eq!(e.kind(), FailureKind::ProcessFailure);
    }
}
