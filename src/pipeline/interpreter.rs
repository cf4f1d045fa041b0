//! Interpreter discovery and library verification.
//!
//! Candidates are probed strictly in order, one short-lived child at a
//! time, and the first to exit 0 on `--version` wins. Nothing is cached:
//! every extraction re-probes, so a virtualenv installed or removed while
//! the server runs is picked up on the next call.

use crate::config::ExtractorConfig;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Find the first interpreter candidate that answers `--version` with exit 0.
///
/// Spawn errors (binary absent, not executable), non-zero exits and probes
/// exceeding `config.probe_timeout` all move on to the next candidate.
/// Returns `None` when the list is exhausted.
pub async fn resolve_interpreter(config: &ExtractorConfig) -> Option<PathBuf> {
    for candidate in &config.interpreter_candidates {
        if probe_version(candidate, config.probe_timeout).await {
            debug!("Interpreter resolved: {}", candidate.display());
            if let Some(ref cb) = config.progress_callback {
                cb.on_interpreter_resolved(candidate);
            }
            return Some(candidate.clone());
        }
    }
    debug!(
        "No interpreter found among {} candidates",
        config.interpreter_candidates.len()
    );
    None
}

/// Check that `interpreter` can import the extraction library.
///
/// Runs `<interpreter> -c "import <module>; print(<sentinel>)"` and returns
/// `true` only when the process exits 0 **and** stdout contains the
/// sentinel. Any spawn error or timeout yields `false`.
pub async fn verify_library_installed(interpreter: &Path, config: &ExtractorConfig) -> bool {
    let code = import_check_code(&config.library_module, &config.library_sentinel);

    let mut cmd = Command::new(interpreter);
    cmd.arg("-c")
        .arg(&code)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match timeout(config.probe_timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let installed = output.status.success() && stdout.contains(&config.library_sentinel);
            debug!(
                "Library check for '{}' via {}: {}",
                config.library_module,
                interpreter.display(),
                installed
            );
            installed
        }
        Ok(Err(e)) => {
            debug!("Library check could not run {}: {}", interpreter.display(), e);
            false
        }
        Err(_) => {
            debug!(
                "Library check via {} timed out after {:?}",
                interpreter.display(),
                config.probe_timeout
            );
            false
        }
    }
}

/// Run `<candidate> --version`; `true` on exit 0 within `limit`.
async fn probe_version(candidate: &Path, limit: Duration) -> bool {
    let mut cmd = Command::new(candidate);
    cmd.arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match timeout(limit, cmd.status()).await {
        Ok(Ok(status)) => {
            debug!("Probe {} exited with {}", candidate.display(), status);
            status.success()
        }
        Ok(Err(e)) => {
            debug!("Probe {} failed to start: {}", candidate.display(), e);
            false
        }
        Err(_) => {
            debug!("Probe {} timed out after {:?}", candidate.display(), limit);
            false
        }
    }
}

/// Inline Python for the installation check.
fn import_check_code(module: &str, sentinel: &str) -> String {
    // `{:?}` yields a double-quoted, escaped literal Python accepts as-is.
    format!("import {module}; print({sentinel:?})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_check_code_is_valid_python() {
        assert_eq!(
            import_check_code("docling", "ok"),
            r#"import docling; print("ok")"#
        );
    }

    #[test]
    fn no_candidates_answer() {
        let config = ExtractorConfig::builder()
            .interpreter_candidates([
                "/definitely/not/python3",
                "/definitely/not/python",
            ])
            .build()
            .unwrap();
        let found = tokio_test::block_on(resolve_interpreter(&config));
        assert!(found.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn first_zero_exit_candidate_wins() {
        // `false` exits 1, `true` exits 0 whatever its arguments.
        let config = ExtractorConfig::builder()
            .interpreter_candidates(["/definitely/not/python3", "false", "true", "sh"])
            .build()
            .unwrap();
        assert_eq!(resolve_interpreter(&config).await, Some(PathBuf::from("true")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn library_check_requires_sentinel_on_stdout() {
        // `true` exits 0 but prints nothing, so the sentinel is missing.
        let config = ExtractorConfig::default();
        assert!(!verify_library_installed(Path::new("true"), &config).await);
        assert!(!verify_library_installed(Path::new("/definitely/not/python3"), &config).await);
    }
}
