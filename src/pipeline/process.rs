//! Parser child process: spawn, capture and timeout.
//!
//! ## Subprocess contract
//!
//! ```text
//! argv    <interpreter> <script-path> <pdf-path>
//! env     PYTHONUNBUFFERED=1   (stderr arrives line by line, not at exit)
//! stdin   /dev/null
//! stdout  one JSON ExtractionResult document      (authoritative on exit 0)
//! stderr  free-form progress and diagnostics       (logged as it arrives)
//! exit    0 = success, anything else = failure
//! ```
//!
//! Stdout and stderr are drained on separate tasks. Reading them one after
//! the other would deadlock as soon as the child filled the pipe we were not
//! reading.

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

/// How long to wait for stderr to drain after killing a timed-out child.
const DRAIN_AFTER_KILL: Duration = Duration::from_secs(2);

/// Run the parser against `pdf_path` and return its stdout.
///
/// # Errors
/// - [`ExtractError::Spawn`] when the OS cannot start (or wait on) the child
/// - [`ExtractError::TimedOut`] when `config.timeout` elapses before the
///   child exits and its pipes close; the child is killed and its partial
///   stdout discarded
/// - [`ExtractError::NonZeroExit`] for any non-zero exit or signal death,
///   carrying everything the child wrote to stderr
pub async fn run_parser(
    interpreter: &Path,
    script_path: &Path,
    pdf_path: &Path,
    config: &ExtractorConfig,
) -> Result<String, ExtractError> {
    info!(
        "Running parser: {} {} {}",
        interpreter.display(),
        script_path.display(),
        pdf_path.display()
    );

    let mut child = Command::new(interpreter)
        .arg(script_path)
        .arg(pdf_path)
        .env("PYTHONUNBUFFERED", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExtractError::Spawn { source })?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_spawn(pdf_path);
    }

    let mut stdout_task = child.stdout.take().map(|out| tokio::spawn(read_to_string(out)));
    let mut stderr_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(stream_stderr(err, config.progress_callback.clone())));

    // One deadline covers both the child and the drain of its pipes: a
    // grandchild that inherited stdout/stderr can keep them open after the
    // child itself has exited.
    let deadline = Instant::now() + config.timeout;
    let secs = config.timeout.as_secs();

    let status = match timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(source)) => {
            abort(&stdout_task);
            abort(&stderr_task);
            return Err(ExtractError::Spawn { source });
        }
        Err(_) => {
            warn!("Parser exceeded {}s; killing pid {:?}", secs, child.id());
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed-out parser: {}", e);
            }
            abort(&stdout_task);
            let drained = timeout(DRAIN_AFTER_KILL, join(&mut stderr_task)).await;
            let stderr = match drained {
                Ok(stderr) => stderr,
                Err(_) => {
                    abort(&stderr_task);
                    String::new()
                }
            };
            return Err(ExtractError::TimedOut { secs, stderr });
        }
    };

    let drained = timeout_at(deadline, async {
        let stdout = join(&mut stdout_task).await;
        let stderr = join(&mut stderr_task).await;
        (stdout, stderr)
    })
    .await;

    let (stdout, stderr) = match drained {
        Ok(pair) => pair,
        Err(_) => {
            warn!(
                "Parser exited with {} but its output pipes were still open after {}s",
                status, secs
            );
            abort(&stdout_task);
            abort(&stderr_task);
            return Err(ExtractError::TimedOut {
                secs,
                stderr: String::new(),
            });
        }
    };

    debug!(
        "Parser exited with {} ({} bytes stdout, {} bytes stderr)",
        status,
        stdout.len(),
        stderr.len()
    );

    if !status.success() {
        return Err(ExtractError::NonZeroExit {
            status: describe_status(&status),
            stderr,
        });
    }

    Ok(stdout)
}

/// Render an exit status the way operators expect to read it.
///
/// Plain exits show the code; on Unix a signal death shows `null` (no exit
/// code) followed by the signal number.
pub fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return code.to_string();
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("null (sinal {signal})");
        }
    }
    "null".to_string()
}

/// Accumulate a pipe into a string as the child writes it.
async fn read_to_string<R: AsyncRead + Unpin>(mut pipe: R) -> String {
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf).await {
        debug!("Stopped reading parser stdout: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Accumulate stderr while logging and forwarding each line as it arrives.
///
/// Lines are split on raw bytes so invalid UTF-8 from the child degrades to
/// replacement characters instead of ending the stream.
async fn stream_stderr<R: AsyncRead + Unpin>(pipe: R, cb: Option<ProgressCallback>) -> String {
    let mut reader = BufReader::new(pipe);
    let mut captured = String::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                captured.push_str(&text);
                let text = text.trim_end();
                if !text.is_empty() {
                    info!("docling: {}", text);
                    if let Some(ref cb) = cb {
                        cb.on_stderr_line(text);
                    }
                }
            }
            Err(e) => {
                debug!("Stopped reading parser stderr: {}", e);
                break;
            }
        }
    }

    captured
}

/// Wait for a drain task. Borrowed so the caller can still abort it when
/// the wait is cut short.
async fn join(task: &mut Option<JoinHandle<String>>) -> String {
    match task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

fn abort(task: &Option<JoinHandle<String>>) {
    if let Some(handle) = task {
        handle.abort();
    }
}
