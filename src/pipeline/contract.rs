//! Parsing the parser script's stdout into an [`ExtractionResult`].

use crate::error::ExtractError;
use crate::output::ExtractionResult;

/// Maximum number of characters of raw stdout quoted in a parse error.
pub const EXCERPT_CHARS: usize = 500;

/// Parse stdout as a single JSON [`ExtractionResult`] document.
///
/// Surrounding whitespace is ignored. On failure the error carries the serde
/// message and the first [`EXCERPT_CHARS`] characters of stdout, enough for
/// an operator to spot a stray `print()` or a traceback without flooding the
/// response.
pub fn parse_result(stdout: &str) -> Result<ExtractionResult, ExtractError> {
    serde_json::from_str(stdout.trim()).map_err(|e| ExtractError::MalformedOutput {
        detail: e.to_string(),
        excerpt: excerpt(stdout, EXCERPT_CHARS),
    })
}

/// First `max_chars` characters of `s`, never splitting a code point.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}
