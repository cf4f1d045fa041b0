//! Input validation and upload staging.
//!
//! The parser script only accepts a file-system path, so upload buffers are
//! written to a uniquely named file in the staging directory first. The file
//! is held as a [`TempPath`], which deletes it on drop. That covers early
//! returns, panics and a cancelled future; the happy path calls
//! [`remove_staged`] so a failed deletion is logged instead of silently
//! swallowed.

use crate::error::ExtractError;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempPath;
use tracing::{debug, warn};

/// File name assumed for uploads that arrive without one.
pub const DEFAULT_UPLOAD_NAME: &str = "upload.pdf";

/// Fail with [`ExtractError::InputNotFound`] unless the PDF exists.
pub fn check_input(pdf_path: &Path) -> Result<(), ExtractError> {
    if !pdf_path.exists() {
        return Err(ExtractError::InputNotFound {
            path: pdf_path.to_path_buf(),
        });
    }
    Ok(())
}

/// Fail with [`ExtractError::ScriptNotFound`] unless the parser script exists.
pub fn check_script(script_path: &Path) -> Result<(), ExtractError> {
    if !script_path.exists() {
        return Err(ExtractError::ScriptNotFound {
            path: script_path.to_path_buf(),
        });
    }
    Ok(())
}

/// Write `bytes` to a fresh file in `dir` and return its self-deleting path.
///
/// Names look like `docling-<unix-nanos>-<random>-<file_name>`. The random
/// segment comes from [`tempfile`], which creates the file with `O_EXCL`, so
/// two concurrent uploads never share a path even within the same
/// nanosecond.
pub fn stage_buffer(bytes: &[u8], file_name: &str, dir: &Path) -> Result<TempPath, ExtractError> {
    let temp_err = |source: std::io::Error| ExtractError::TempFile {
        dir: dir.to_path_buf(),
        source,
    };

    let prefix = format!("docling-{}-", unix_nanos());
    let suffix = format!("-{}", sanitize_file_name(file_name));

    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(temp_err)?;
    file.write_all(bytes).map_err(temp_err)?;
    file.flush().map_err(temp_err)?;

    let path = file.into_temp_path();
    debug!("Staged {} bytes at {}", bytes.len(), path.display());
    Ok(path)
}

/// Delete a staged upload, logging (never returning) failures.
///
/// A file that is already gone counts as removed.
pub fn remove_staged(path: TempPath) {
    let shown = path.to_path_buf();
    match path.close() {
        Ok(()) => debug!("Removed temporary file {}", shown.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Temporary file {} already removed", shown.display())
        }
        Err(e) => warn!(
            "Could not remove temporary file {}: {}",
            shown.display(),
            e
        ),
    }
}

/// Reduce an uploaded file name to a safe single path component.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]` becomes
/// `_`. Empty results fall back to [`DEFAULT_UPLOAD_NAME`].
pub fn sanitize_file_name(file_name: &str) -> String {
    // Uploads from Windows browsers may carry backslash separators.
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        DEFAULT_UPLOAD_NAME.to_string()
    } else {
        cleaned
    }
}

fn unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_input_reports_missing_path() {
        let err = check_input(Path::new("/no/such/manifest.pdf")).unwrap_err();
        assert!(err.to_string().contains("/no/such/manifest.pdf"));
    }

    #[test]
    fn check_script_reports_missing_path() {
        let err = check_script(Path::new("/no/such/ldi_parser.py")).unwrap_err();
        assert!(matches!(err, ExtractError::ScriptNotFound { .. }));
    }

    #[test]
    fn sanitize_strips_directories_and_odd_chars() {
        assert_eq!(sanitize_file_name("upload.pdf"), "upload.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(r"C:\Users\ana\LDI 03.pdf"), "LDI_03.pdf");
        assert_eq!(sanitize_file_name("relação.pdf"), "rela__o.pdf");
        assert_eq!(sanitize_file_name(""), DEFAULT_UPLOAD_NAME);
        assert_eq!(sanitize_file_name(".."), DEFAULT_UPLOAD_NAME);
    }

    #[test]
    fn staged_file_has_expected_name_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = stage_buffer(b"%PDF-1.4\n", "ldi.pdf", dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("docling-"), "got {name}");
        assert!(name.ends_with("-ldi.pdf"), "got {name}");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4\n");

        let shown = path.to_path_buf();
        remove_staged(path);
        assert!(!shown.exists());
    }

    #[test]
    fn same_name_never_collides() {
        let dir = tempfile::tempdir().unwrap();
        let a = stage_buffer(b"a", "same.pdf", dir.path()).unwrap();
        let b = stage_buffer(b"b", "same.pdf", dir.path()).unwrap();
        assert_ne!(a.to_path_buf(), b.to_path_buf());
    }

    #[test]
    fn remove_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = stage_buffer(b"x", "gone.pdf", dir.path()).unwrap();
        std::fs::remove_file(&path).unwrap();
        remove_staged(path);
    }

    #[test]
    fn remove_logs_and_returns_when_deletion_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = stage_buffer(b"x", "busy.pdf", dir.path()).unwrap();
        let shown = path.to_path_buf();

        // A non-empty directory in place of the file makes the unlink fail
        // with something other than NotFound, even when running as root.
        std::fs::remove_file(&shown).unwrap();
        std::fs::create_dir(&shown).unwrap();
        std::fs::write(shown.join("inner"), b"y").unwrap();

        remove_staged(path);
        assert!(shown.is_dir(), "failed removal must leave the entry alone");
    }

    #[test]
    fn staging_into_missing_dir_fails_cleanly() {
        let err = stage_buffer(b"x", "a.pdf", Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, ExtractError::TempFile { .. }));
    }
}
