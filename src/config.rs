//! Configuration management for the travel planner.
//!
//! Configuration is read from environment variables, with an optional JSON
//! secrets file supplying defaults for any key the environment leaves unset:
//! - `SECRETS_PATH` - Optional. Path of the secrets file. Defaults to `config/secrets.json`.
//! - `GOOGLE_API_KEY` - Required. API key for the Gemini API.
//! - `DEFAULT_MODEL` - Optional. Gemini model identifier. Defaults to `gemini-2.0-flash`.
//! - `SERPAPI_API_KEY` - Optional. SerpAPI key used by the search-backed tools.
//! - `GEMINI_BASE_URL` - Optional. Defaults to `https://generativelanguage.googleapis.com`.
//! - `SERPAPI_BASE_URL` - Optional. Defaults to `https://serpapi.com`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations. Defaults to `10`.
//! - `APP_NAME`, `USER_ID`, `SESSION_ID` - Optional. Identity of the shared conversation.
//! - `ENABLE_WEB_SEARCH_TOOL` - Optional. Expose the general web search tool. Defaults to `false`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_SECRETS_PATH: &str = "config/secrets.json";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SERPAPI_BASE_URL: &str = "https://serpapi.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to load secrets file {path}: {reason}")]
    Secrets { path: PathBuf, reason: String },
}

/// Identity of the process-wide conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_name: "TravelPlanner".to_string(),
            user_id: "demo_user".to_string(),
            session_id: "travel_session".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key
    pub api_key: String,

    /// Default model identifier
    pub default_model: String,

    /// SerpAPI key; the search-backed tools report an error when absent
    pub serpapi_api_key: Option<String>,

    pub gemini_base_url: String,

    pub serpapi_base_url: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,

    /// Whether the agent gets the general web search tool
    pub enable_web_search: bool,

    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from the environment, falling back to the secrets file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `GOOGLE_API_KEY` is set nowhere, and
    /// `ConfigError::Secrets` if the secrets file exists but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secrets_path = std::env::var("SECRETS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SECRETS_PATH));
        let secrets = load_secrets(&secrets_path)?;

        Self::from_sources(|key| std::env::var(key).ok(), &secrets)
    }

    /// Resolve every setting from `lookup` first, then from `secrets`.
    pub fn from_sources<F>(lookup: F, secrets: &HashMap<String, String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| secrets.get(key).cloned())
        };

        let api_key = get("GOOGLE_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("GOOGLE_API_KEY".to_string()))?;

        let default_model = get("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = get("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let max_iterations = get("MAX_ITERATIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e)))?;

        let enable_web_search = get("ENABLE_WEB_SEARCH_TOOL")
            .map(|v| {
                parse_bool(&v)
                    .map_err(|e| ConfigError::InvalidValue("ENABLE_WEB_SEARCH_TOOL".to_string(), e))
            })
            .transpose()?
            .unwrap_or(false);

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            app_name: get("APP_NAME").unwrap_or(defaults.app_name),
            user_id: get("USER_ID").unwrap_or(defaults.user_id),
            session_id: get("SESSION_ID").unwrap_or(defaults.session_id),
        };

        Ok(Self {
            api_key,
            default_model,
            serpapi_api_key: get("SERPAPI_API_KEY"),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            serpapi_base_url: get("SERPAPI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SERPAPI_BASE_URL.to_string()),
            host,
            port,
            max_iterations,
            enable_web_search,
            session,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            api_key,
            default_model,
            serpapi_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            serpapi_base_url: DEFAULT_SERPAPI_BASE_URL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_iterations: 10,
            enable_web_search: false,
            session: SessionConfig::default(),
        }
    }
}

/// Read the flat JSON secrets file. A missing file yields no secrets.
pub fn load_secrets(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.exists() {
        tracing::info!("No secrets file found at {}, using environment only", path.display());
        return Ok(HashMap::new());
    }

    let secrets_err = |reason: String| ConfigError::Secrets {
        path: path.to_path_buf(),
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| secrets_err(e.to_string()))?;
    let raw: HashMap<String, Value> =
        serde_json::from_str(&contents).map_err(|e| secrets_err(e.to_string()))?;

    let secrets = raw
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s)),
            Value::Null => None,
            other => Some((key, other.to_string())),
        })
        .collect::<HashMap<_, _>>();

    tracing::info!("Loaded {} settings from {}", secrets.len(), path.display());
    Ok(secrets)
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = Config::from_sources(env(&[]), &HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "GOOGLE_API_KEY"));
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = Config::from_sources(env(&[("GOOGLE_API_KEY", "k")]), &HashMap::new()).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_iterations, 10);
        assert!(config.serpapi_api_key.is_none());
        assert!(!config.enable_web_search);
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn environment_overrides_secrets() {
        let mut secrets = HashMap::new();
        secrets.insert("GOOGLE_API_KEY".to_string(), "from-file".to_string());
        secrets.insert("DEFAULT_MODEL".to_string(), "gemini-1.5-flash".to_string());

        let config = Config::from_sources(env(&[("GOOGLE_API_KEY", "from-env")]), &secrets).unwrap();
        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.default_model, "gemini-1.5-flash");
    }

    #[test]
    fn blank_environment_value_falls_back_to_secrets() {
        let mut secrets = HashMap::new();
        secrets.insert("GOOGLE_API_KEY".to_string(), "from-file".to_string());

        let config = Config::from_sources(env(&[("GOOGLE_API_KEY", "  ")]), &secrets).unwrap();
        assert_eq!(config.api_key, "from-file");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = Config::from_sources(
            env(&[("GOOGLE_API_KEY", "k"), ("PORT", "eighty")]),
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "PORT"));
    }

    #[test]
    fn web_search_flag_parses_boolean_words() {
        let config = Config::from_sources(
            env(&[("GOOGLE_API_KEY", "k"), ("ENABLE_WEB_SEARCH_TOOL", "yes")]),
            &HashMap::new(),
        )
        .unwrap();
        assert!(config.enable_web_search);

        let err = Config::from_sources(
            env(&[("GOOGLE_API_KEY", "k"), ("ENABLE_WEB_SEARCH_TOOL", "maybe")]),
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
    }

    #[test]
    fn secrets_file_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = load_secrets(&dir.path().join("secrets.json")).unwrap();
        assert!(secrets.is_empty());
    }

    #[test]
    fn secrets_file_values_are_flattened_to_strings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"GOOGLE_API_KEY": "abc", "PORT": 9000, "LOCATION": null}}"#
        )
        .unwrap();

        let secrets = load_secrets(file.path()).unwrap();
        assert_eq!(secrets.get("GOOGLE_API_KEY").map(String::as_str), Some("abc"));
        assert_eq!(secrets.get("PORT").map(String::as_str), Some("9000"));
        assert!(!secrets.contains_key("LOCATION"));
    }

    #[test]
    fn malformed_secrets_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = load_secrets(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Secrets { .. }));
    }
}
