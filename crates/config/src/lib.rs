//! Configuration loading, validation, and management for MathTutor.
//!
//! Loads configuration from `~/.mathtutor/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Generate-content endpoints tried in order, most preferred first.
pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent",
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent",
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent",
];

/// The root configuration structure.
///
/// Maps directly to `~/.mathtutor/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key used to seed the credential store when it is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Static endpoint fallback list
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Path of the JSON preference file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Tutoring content overrides
    #[serde(default)]
    pub tutor: TutorConfig,
}

fn default_endpoints() -> Vec<String> {
    DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoints", &self.endpoints)
            .field("store_path", &self.store_path)
            .field("http", &self.http)
            .field("tutor", &self.tutor)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout enforced by the transport
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TutorConfig {
    /// Replaces the built-in base system instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    /// Replaces the built-in struggle phrase set (matched case-insensitively)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub struggle_phrases: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.mathtutor/config.toml).
    ///
    /// Also checks environment variables for the API key:
    /// - `MATHTUTOR_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let from_env = lookup("MATHTUTOR_API_KEY")
            .or_else(|| lookup("GEMINI_API_KEY"))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        if from_env.is_some() {
            self.api_key = from_env;
        }

        if let Some(path) = lookup("MATHTUTOR_STORE_PATH") {
            self.store_path = Some(PathBuf::from(path));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mathtutor")
    }

    /// Where durable preferences live.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("preferences.json"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::ValidationError(
                "endpoints must list at least one URL".into(),
            ));
        }

        if let Some(bad) = self.endpoints.iter().find(|e| !e.starts_with("http")) {
            return Err(ConfigError::ValidationError(format!(
                "endpoint '{bad}' is not an http(s) URL"
            )));
        }

        if self.http.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http.timeout_secs must be > 0".into(),
            ));
        }

        if let Some(phrases) = &self.tutor.struggle_phrases {
            if phrases.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::ValidationError(
                    "tutor.struggle_phrases must not contain empty phrases".into(),
                ));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoints: default_endpoints(),
            store_path: None,
            http: HttpConfig::default(),
            tutor: TutorConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoints.len(), 3);
        assert!(config.endpoints[0].contains("v1beta/models/gemini-1.5-flash"));
        assert_eq!(config.http.timeout_secs, 120);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.endpoints, config.endpoints);
        assert_eq!(parsed.http.timeout_secs, config.http.timeout_secs);
    }

    #[test]
    fn empty_endpoint_list_rejected() {
        let config = AppConfig {
            endpoints: vec![],
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_http_endpoint_rejected() {
        let config = AppConfig {
            endpoints: vec!["ftp://example.test".into()],
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ftp://example.test"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert!(result.unwrap().api_key.is_none());
    }

    #[test]
    fn load_from_file_with_overrides() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            r#"
endpoints = ["https://a.test/generate", "https://b.test/generate"]

[http]
timeout_secs = 30

[tutor]
struggle_phrases = ["not quite", "try again"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(
            config.tutor.struggle_phrases.as_deref(),
            Some(&["not quite".to_string(), "try again".to_string()][..])
        );
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "endpoints = 7").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_key_precedence() {
        let env: HashMap<&str, &str> = [
            ("MATHTUTOR_API_KEY", "  primary-key  "),
            ("GEMINI_API_KEY", "secondary-key"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("primary-key"));

        let mut config = AppConfig::default();
        config.apply_env(|name| (name == "GEMINI_API_KEY").then(|| "secondary-key".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("secondary-key"));
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = AppConfig {
            api_key: Some("AIza-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("AIza-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("generativelanguage.googleapis.com"));
        assert!(toml_str.contains("timeout_secs"));
    }
}
