use std::path::PathBuf;

/// Errors that can occur across Preflight.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary reports it through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use preflight_core::PreflightError;
///
/// let err = PreflightError::Config("missing model".into());
/// assert!(err.to_string().contains("missing model"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum PreflightError {
    /// Filesystem or terminal I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// SQLite persistence failure.
    #[error("database error: {0}")]
    Database(String),

    /// LLM API or response error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The generation source cannot run for this input.
    #[error("generation source unavailable: {0}")]
    #[diagnostic(help("shrink the change under review or raise [llm] max_input_tokens"))]
    SourceUnavailable(String),

    /// The model output could not be decoded into review records.
    ///
    /// `raw` holds the offending text so prompt/format mismatches can be diagnosed.
    #[error("failed to decode model output: {reason}")]
    #[diagnostic(help("the raw model output is printed above; check the system prompt format"))]
    Decode {
        /// What went wrong.
        reason: String,
        /// The text that failed to decode.
        raw: String,
    },

    /// Report rendering failure.
    #[error("report error: {0}")]
    Report(String),

    /// Raw-mode or terminal control failure.
    #[error("terminal error: {0}")]
    Terminal(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
