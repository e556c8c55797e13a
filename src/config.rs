//! Application configuration.
//!
//! Values are resolved once at startup with priority: environment > config.toml > default.
//! A `.env` file, if present, is loaded into the environment first.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("{key} must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub ai: AiConfig,
    pub video: VideoConfig,
    pub limits: LimitsConfig,
}

// ==================== Server Configuration ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    /// Include internal error details in 500 responses
    pub debug: bool,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            app_name: "StudyBlossom API".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
        }
    }
}

impl ServerConfig {
    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ==================== Database Configuration ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/study_blossom.db"),
        }
    }
}

// ==================== Auth Configuration ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token lifetime in minutes (one day by default)
    pub token_expiry_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_expiry_minutes: 60 * 24,
        }
    }
}

// ==================== Generative AI Configuration ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model: "gemini-2.0-flash-exp".to_string(),
            tts_model: "gemini-2.0-flash-exp".to_string(),
            tts_voice: "Algenib".to_string(),
            request_timeout_secs: 60,
        }
    }
}

// ==================== Avatar Video Configuration ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub d_id_api_key: Option<String>,
    pub d_id_base_url: String,
    pub voice_id: String,
    pub source_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            d_id_api_key: None,
            d_id_base_url: "https://api.d-id.com".to_string(),
            voice_id: "es-ES-ElviraNeural".to_string(),
            source_url: "https://d-id-public-bucket.s3.amazonaws.com/alice.jpg".to_string(),
            poll_interval_ms: 3000,
            max_poll_attempts: 60,
        }
    }
}

// ==================== Content Limits ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_flashcards_per_topic: usize,
    pub max_quiz_questions: usize,
    pub max_conversation_history: usize,
    /// Messages of prior conversation passed to the tutor prompt
    pub tutor_context_messages: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_flashcards_per_topic: 10,
            max_quiz_questions: 5,
            max_conversation_history: 20,
            tutor_context_messages: 10,
        }
    }
}

// ==================== Query Limits ====================

/// Default page size for list endpoints
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Largest page size a client may request
pub const MAX_LIST_LIMIT: i64 = 100;

// ==================== Session Configuration ====================

/// Probability threshold for expired-token cleanup (0-255, lower = more frequent)
/// Value of 25 means ~10% chance (25/256) on each login
pub const SESSION_CLEANUP_THRESHOLD: u8 = 25;

/// Longest bearer token lifetime accepted from configuration (one year)
pub const MAX_TOKEN_EXPIRY_MINUTES: i64 = 60 * 24 * 365;

impl Config {
    /// Load configuration: `.env` first, then the TOML file named by CONFIG_PATH
    /// (default `config.toml`, optional), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file; a missing file yields defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Using config file: {}", path.display());
        Ok(toml::from_str(&contents)?)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_env("PORT", v)?;
        }
        if let Some(v) = get("DEBUG") {
            self.server.debug = parse_bool("DEBUG", v)?;
        }
        if let Some(v) = get("ALLOWED_ORIGINS") {
            self.server.allowed_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("DATABASE_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = get("TOKEN_EXPIRE_MINUTES") {
            self.auth.token_expiry_minutes = parse_env("TOKEN_EXPIRE_MINUTES", v)?;
            self.validate()?;
        }
        if let Some(v) = get("GEMINI_API_KEY").filter(|v| !v.is_empty()) {
            self.ai.gemini_api_key = Some(v);
        }
        if let Some(v) = get("GEMINI_MODEL") {
            self.ai.gemini_model = v;
        }
        if let Some(v) = get("GEMINI_BASE_URL") {
            self.ai.gemini_base_url = v;
        }
        if let Some(v) = get("D_ID_API_KEY").filter(|v| !v.is_empty()) {
            self.video.d_id_api_key = Some(v);
        }
        if let Some(v) = get("D_ID_BASE_URL") {
            self.video.d_id_base_url = v;
        }
        Ok(())
    }

    /// Reject values that would overflow when turned into timestamps
    pub fn validate(&self) -> Result<(), ConfigError> {
        let minutes = self.auth.token_expiry_minutes;
        if !(1..=MAX_TOKEN_EXPIRY_MINUTES).contains(&minutes) {
            return Err(ConfigError::OutOfRange {
                key: "token_expiry_minutes",
                value: minutes,
                min: 1,
                max: MAX_TOKEN_EXPIRY_MINUTES,
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.token_expiry_minutes, 1440);
        assert_eq!(config.limits.max_flashcards_per_topic, 10);
        assert_eq!(config.limits.max_quiz_questions, 5);
        assert_eq!(config.video.max_poll_attempts, 60);
        assert!(config.ai.gemini_api_key.is_none());
    }

    #[test]
    fn test_toml_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [limits]
            max_quiz_questions = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.limits.max_quiz_questions, 3);
        assert_eq!(config.limits.max_flashcards_per_topic, 10);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("PORT", "8080"),
                ("DEBUG", "true"),
                ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
                ("GEMINI_API_KEY", "key"),
                ("D_ID_API_KEY", ""),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.server.debug);
        assert_eq!(
            config.server.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.ai.gemini_api_key.as_deref(), Some("key"));
        assert!(config.video.d_id_api_key.is_none());
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "PORT", .. }));
    }

    #[test]
    fn test_token_expiry_range() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("TOKEN_EXPIRE_MINUTES", "9223372036854775807")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "token_expiry_minutes", .. }));

        let mut config = Config::default();
        assert!(config.apply_env(env(&[("TOKEN_EXPIRE_MINUTES", "0")])).is_err());

        let mut config = Config::default();
        config.apply_env(env(&[("TOKEN_EXPIRE_MINUTES", "60")])).unwrap();
        assert_eq!(config.auth.token_expiry_minutes, 60);

        let from_file: Config = toml::from_str("[auth]\ntoken_expiry_minutes = -5").unwrap();
        assert!(from_file.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.database.path, PathBuf::from("data/study_blossom.db"));
    }
}
