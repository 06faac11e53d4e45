use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PreflightError;

/// Environment variable that overrides `[llm] api_key`.
pub const API_KEY_ENV: &str = "PREFLIGHT_API_KEY";

/// Top-level configuration loaded from `.preflight.toml`.
///
/// Resolution order: CLI flags > env vars > config file > defaults.
///
/// # Examples
///
/// ```
/// use preflight_core::PreflightConfig;
///
/// let config = PreflightConfig::default();
/// assert_eq!(config.review.base_branch, "master");
/// assert_eq!(config.llm.max_input_tokens, 32768);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreflightConfig {
    /// Generation endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
    /// Where findings and reports are written.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Desktop notification settings.
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl PreflightConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::FileNotFound`] if the file does not exist,
    /// [`PreflightError::Io`] if it cannot be read, or
    /// [`PreflightError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use preflight_core::PreflightConfig;
    /// use std::path::Path;
    ///
    /// let config = PreflightConfig::from_file(Path::new(".preflight.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, PreflightError> {
        if !path.exists() {
            return Err(PreflightError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use preflight_core::PreflightConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// base_branch = "main"
    /// "#;
    /// let config = PreflightConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.base_branch, "main");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, PreflightError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment overrides on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.llm.api_key = Some(key);
            }
        }
        self
    }
}

/// Settings for the OpenAI-compatible streaming endpoint.
///
/// # Examples
///
/// ```
/// use preflight_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.base_url, "http://localhost:8080");
/// assert!(config.api_key.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL; `/v1/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier sent with each request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer token, if the endpoint needs one.
    pub api_key: Option<String>,
    /// Context capacity of the model; larger prompts are refused up front.
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Nucleus sampling cutoff.
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// Request timeout in seconds for the whole streamed answer.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_model() -> String {
    "qwen3-30b-a3b-instruct".into()
}

fn default_max_input_tokens() -> usize {
    32768
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.8
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            max_input_tokens: default_max_input_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Review behavior settings.
///
/// # Examples
///
/// ```
/// use preflight_core::ReviewConfig;
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.mock_fragment_width, 16);
/// assert_eq!(config.escape_timeout_ms, 50);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Base reference for `branch` reviews (default: `master`).
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// Fragment width used when replaying canned output in mock mode.
    #[serde(default = "default_mock_fragment_width")]
    pub mock_fragment_width: usize,
    /// How long the navigator waits for the rest of an escape sequence.
    #[serde(default = "default_escape_timeout_ms")]
    pub escape_timeout_ms: u64,
}

fn default_base_branch() -> String {
    "master".into()
}

fn default_mock_fragment_width() -> usize {
    16
}

fn default_escape_timeout_ms() -> u64 {
    50
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            base_branch: default_base_branch(),
            mock_fragment_width: default_mock_fragment_width(),
            escape_timeout_ms: default_escape_timeout_ms(),
        }
    }
}

/// Locations of the findings database and HTML reports.
///
/// Unset paths resolve under `~/.preflight/`.
///
/// # Examples
///
/// ```
/// use preflight_core::StorageConfig;
///
/// let config = StorageConfig::default();
/// assert!(config.database_path().ends_with("reviews.db"));
/// assert!(config.reports_path().ends_with("reports"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file.
    pub database: Option<PathBuf>,
    /// Root directory for generated reports.
    pub reports_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Database path, falling back to `~/.preflight/reviews.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| preflight_home().join("reviews.db"))
    }

    /// Reports root, falling back to `~/.preflight/reports`.
    pub fn reports_path(&self) -> PathBuf {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| preflight_home().join("reports"))
    }
}

fn preflight_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".preflight")
}

/// Desktop notification settings.
///
/// # Examples
///
/// ```
/// use preflight_core::NotifyConfig;
///
/// let config = NotifyConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.command, "terminal-notifier");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Send a notification when a report is written.
    #[serde(default = "default_notify_enabled")]
    pub enabled: bool,
    /// Notifier executable.
    #[serde(default = "default_notify_command")]
    pub command: String,
}

fn default_notify_enabled() -> bool {
    true
}

fn default_notify_command() -> String {
    "terminal-notifier".into()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: default_notify_enabled(),
            command: default_notify_command(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = PreflightConfig::default();
        assert_eq!(config.llm.max_input_tokens, 32768);
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.llm.top_p, 0.8);
        assert_eq!(config.review.base_branch, "master");
        assert_eq!(config.review.escape_timeout_ms, 50);
        assert!(config.notify.enabled);
        assert!(config.storage.database.is_none());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[llm]
base_url = "http://127.0.0.1:11434"
model = "qwen3-coder"
max_input_tokens = 8192

[review]
base_branch = "main"

[storage]
database = "/tmp/preflight/reviews.db"
reports_dir = "/tmp/preflight/reports"

[notify]
enabled = false
"#;
        let config = PreflightConfig::from_toml(toml).unwrap();
        assert_eq!(config.llm.base_url, "http://127.0.0.1:11434");
        assert_eq!(config.llm.max_input_tokens, 8192);
        assert_eq!(config.review.base_branch, "main");
        assert_eq!(
            config.storage.database_path(),
            PathBuf::from("/tmp/preflight/reviews.db")
        );
        assert!(!config.notify.enabled);
        assert_eq!(config.notify.command, "terminal-notifier");
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = PreflightConfig::from_toml("").unwrap();
        assert_eq!(config.review.base_branch, "master");
        assert_eq!(config.llm.model, "qwen3-30b-a3b-instruct");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = PreflightConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(PreflightError::Toml(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = PreflightConfig::from_file(Path::new("/nonexistent/.preflight.toml"));
        assert!(matches!(result, Err(PreflightError::FileNotFound(_))));
    }
}
