//! Configuration for the extraction orchestrator.
//!
//! Every knob lives in [`ExtractorConfig`], built via its
//! [`ExtractorConfigBuilder`] or loaded from the environment with
//! [`ExtractorConfig::from_env`]. Defaults match a containerised deployment:
//! the parser script ships next to the binary and the Docling virtualenv
//! lives under `/opt/venv`.

use crate::error::ExtractError;
use crate::output::DEFAULT_STRATEGY;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Interpreter candidates in probe order.
///
/// Container virtualenv first, then whatever is on `PATH`, then the usual
/// absolute locations for hosts with a minimal `PATH`.
pub const DEFAULT_INTERPRETER_CANDIDATES: [&str; 6] = [
    "/opt/venv/bin/python3",
    "/opt/venv/bin/python",
    "python3",
    "python",
    "/usr/bin/python3",
    "/usr/local/bin/python3",
];

/// File name of the parser script.
pub const DEFAULT_SCRIPT_NAME: &str = "ldi_parser.py";

/// Hard wall-clock limit for one parser run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Limit for each `--version` / import probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for an extraction.
///
/// Built via [`ExtractorConfig::builder()`] or [`ExtractorConfig::default()`].
///
/// # Example
/// ```rust
/// use ldi_extract::ExtractorConfig;
/// use std::time::Duration;
///
/// let config = ExtractorConfig::builder()
///     .script_path("/srv/app/ldi_parser.py")
///     .timeout(Duration::from_secs(60))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// Parser script passed as the interpreter's first argument.
    pub script_path: PathBuf,

    /// Interpreters to probe, in order. The first to exit 0 on
    /// `--version` is used. Bare names are resolved through `PATH`.
    pub interpreter_candidates: Vec<PathBuf>,

    /// Python module imported by the installation check. Default: `docling`.
    pub library_module: String,

    /// Token the installation check prints on success. Default: `ok`.
    pub library_sentinel: String,

    /// Hard timeout for the parser run. Default: 120 s.
    pub timeout: Duration,

    /// Timeout for each probe. Default: 10 s.
    ///
    /// A wedged interpreter wrapper (e.g. a pyenv shim waiting on a lock)
    /// would otherwise stall the whole probe sequence.
    pub probe_timeout: Duration,

    /// Directory where upload buffers are staged. Default: the OS temp dir.
    pub temp_dir: PathBuf,

    /// Strategy identifier used for results built by the orchestrator.
    pub strategy: String,

    /// Observer for lifecycle events and streamed stderr.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            script_path: default_script_path(),
            interpreter_candidates: DEFAULT_INTERPRETER_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .collect(),
            library_module: "docling".to_string(),
            library_sentinel: "ok".to_string(),
            timeout: DEFAULT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            temp_dir: std::env::temp_dir(),
            strategy: DEFAULT_STRATEGY.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("script_path", &self.script_path)
            .field("interpreter_candidates", &self.interpreter_candidates)
            .field("library_module", &self.library_module)
            .field("library_sentinel", &self.library_sentinel)
            .field("timeout", &self.timeout)
            .field("probe_timeout", &self.probe_timeout)
            .field("temp_dir", &self.temp_dir)
            .field("strategy", &self.strategy)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overridden by environment variables.
    ///
    /// | Variable | Effect |
    /// |----------|--------|
    /// | `LDI_PARSER_SCRIPT` | parser script path |
    /// | `DOCLING_PYTHON` | interpreter probed before the defaults |
    /// | `DOCLING_TIMEOUT_SECS` | parser timeout in seconds |
    /// | `DOCLING_TEMP_DIR` | staging directory for upload buffers |
    ///
    /// Empty variables are ignored.
    pub fn from_env() -> Result<Self, ExtractError> {
        let mut builder = Self::builder();

        if let Some(script) = env_non_empty("LDI_PARSER_SCRIPT") {
            builder = builder.script_path(script);
        }
        if let Some(python) = env_non_empty("DOCLING_PYTHON") {
            builder = builder.prepend_interpreter(python);
        }
        if let Some(secs) = env_non_empty("DOCLING_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                ExtractError::InvalidConfig(format!(
                    "DOCLING_TIMEOUT_SECS must be a whole number of seconds, got '{secs}'"
                ))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = env_non_empty("DOCLING_TEMP_DIR") {
            builder = builder.temp_dir(dir);
        }

        builder.build()
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn script_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.script_path = path.into();
        self
    }

    /// Replace the whole candidate list.
    pub fn interpreter_candidates<I, P>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.interpreter_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Probe `interpreter` before every other candidate.
    pub fn prepend_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.config.interpreter_candidates.insert(0, interpreter.into());
        self
    }

    pub fn library_module(mut self, module: impl Into<String>) -> Self {
        self.config.library_module = module.into();
        self
    }

    pub fn library_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.config.library_sentinel = sentinel.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.config.strategy = strategy.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, ExtractError> {
        let c = &self.config;
        if c.timeout < Duration::from_secs(1) {
            return Err(ExtractError::InvalidConfig(format!(
                "timeout must be at least 1s, got {:?}",
                c.timeout
            )));
        }
        if c.probe_timeout < Duration::from_secs(1) {
            return Err(ExtractError::InvalidConfig(format!(
                "probe timeout must be at least 1s, got {:?}",
                c.probe_timeout
            )));
        }
        if c.interpreter_candidates.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "at least one interpreter candidate is required".into(),
            ));
        }
        if c.library_sentinel.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "library sentinel must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// `ldi_parser.py` next to the running executable, else in the working directory.
fn default_script_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_SCRIPT_NAME)))
        .filter(|p| p.exists())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPT_NAME))
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let c = ExtractorConfig::default();
        assert_eq!(c.timeout, Duration::from_secs(120));
        assert_eq!(c.interpreter_candidates.len(), 6);
        assert_eq!(c.interpreter_candidates[0], PathBuf::from("/opt/venv/bin/python3"));
        assert_eq!(c.interpreter_candidates[2], PathBuf::from("python3"));
        assert_eq!(c.library_module, "docling");
        assert_eq!(c.library_sentinel, "ok");
        assert!(c.script_path.ends_with(DEFAULT_SCRIPT_NAME));
    }

    #[test]
    fn builder_sets_fields() {
        let c = ExtractorConfig::builder()
            .script_path("/srv/ldi_parser.py")
            .interpreter_candidates(["/a/python", "/b/python"])
            .prepend_interpreter("/c/python")
            .timeout(Duration::from_secs(5))
            .temp_dir("/var/tmp")
            .build()
            .unwrap();
        assert_eq!(c.script_path, PathBuf::from("/srv/ldi_parser.py"));
        assert_eq!(
            c.interpreter_candidates,
            vec![
                PathBuf::from("/c/python"),
                PathBuf::from("/a/python"),
                PathBuf::from("/b/python")
            ]
        );
        assert_eq!(c.timeout, Duration::from_secs(5));
        assert_eq!(c.temp_dir, PathBuf::from("/var/tmp"));
    }

    #[test]
    fn builder_rejects_invalid() {
        assert!(ExtractorConfig::builder()
            .timeout(Duration::from_millis(10))
            .build()
            .is_err());
        assert!(ExtractorConfig::builder()
            .interpreter_candidates(Vec::<PathBuf>::new())
            .build()
            .is_err());
        assert!(ExtractorConfig::builder()
            .library_sentinel(" ")
            .build()
            .is_err());
    }

    // All env-var assertions live in one test so parallel tests never race
    // on the same variables.
    #[test]
    fn from_env_overrides() {
        std::env::set_var("LDI_PARSER_SCRIPT", "/env/ldi_parser.py");
        std::env::set_var("DOCLING_PYTHON", "/env/python");
        std::env::set_var("DOCLING_TIMEOUT_SECS", "30");
        std::env::set_var("DOCLING_TEMP_DIR", "/env/tmp");
        let c = ExtractorConfig::from_env().unwrap();
        assert_eq!(c.script_path, PathBuf::from("/env/ldi_parser.py"));
        assert_eq!(c.interpreter_candidates[0], PathBuf::from("/env/python"));
        assert_eq!(c.interpreter_candidates.len(), 7);
        assert_eq!(c.timeout, Duration::from_secs(30));
        assert_eq!(c.temp_dir, PathBuf::from("/env/tmp"));

        std::env::set_var("DOCLING_TIMEOUT_SECS", "soon");
        assert!(ExtractorConfig::from_env().is_err());

        for key in [
            "LDI_PARSER_SCRIPT",
            "DOCLING_PYTHON",
            "DOCLING_TIMEOUT_SECS",
            "DOCLING_TEMP_DIR",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn debug_hides_callback() {
        let c = ExtractorConfig::builder()
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let s = format!("{c:?}");
        assert!(s.contains("<dyn ExtractionProgressCallback>"));
    }
}
