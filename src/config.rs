use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{NotifierError, Result};

/// Homework status endpoint of the review service
pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";
/// Telegram Bot API base URL
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
/// Seconds between two polls
pub const DEFAULT_RETRY_SECS: u64 = 600;

pub const PRACTICUM_TOKEN_VAR: &str = "PRAKTIKUM_TOKEN";
pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_TOKEN";
pub const CHAT_ID_VAR: &str = "CHAT_ID";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Homework status endpoint
    pub endpoint: String,
    /// Telegram Bot API base URL (overridable for local stubs)
    pub telegram_api_url: String,
    /// Polling interval in seconds
    pub retry_secs: u64,
    /// Outbound request timeout. Unset means requests may block indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub secrets: Secrets,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for the daily rolling log file; console only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Raw secrets as read from the environment, possibly missing.
#[derive(Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub practicum_token: Option<String>,
    #[serde(default)]
    pub telegram_token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("practicum_token", &self.practicum_token.as_ref().map(|_| "***"))
            .field("telegram_token", &self.telegram_token.as_ref().map(|_| "***"))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Validated, non-empty secrets
#[derive(Clone)]
pub struct Credentials {
    pub practicum_token: String,
    pub telegram_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("practicum_token", &"***")
            .field("telegram_token", &"***")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from a specific directory and environment snapshot
    pub fn load_from<P: AsRef<Path>>(
        config_dir: P,
        vars: &HashMap<String, String>,
    ) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let profile = vars
            .get("HOMEWORK_ENV")
            .cloned()
            .unwrap_or_else(|| "development".to_string());

        let builder = Config::builder()
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("telegram_api_url", DEFAULT_TELEGRAM_API_URL)?
            .set_default("retry_secs", DEFAULT_RETRY_SECS)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(profile)).required(false))
            // HOMEWORK_RETRY_SECS, HOMEWORK_LOGGING__LEVEL, ...
            .add_source(
                Environment::with_prefix("HOMEWORK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .set_override_option("secrets.practicum_token", vars.get(PRACTICUM_TOKEN_VAR).cloned())?
            .set_override_option("secrets.telegram_token", vars.get(TELEGRAM_TOKEN_VAR).cloned())?
            .set_override_option("secrets.chat_id", vars.get(CHAT_ID_VAR).cloned())?;

        builder.build()?.try_deserialize()
    }

    /// Confirm every secret is present and non-blank.
    pub fn credentials(&self) -> Result<Credentials> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        let practicum_token = present(&self.secrets.practicum_token);
        let telegram_token = present(&self.secrets.telegram_token);
        let chat_id = present(&self.secrets.chat_id);

        match (practicum_token, telegram_token, chat_id) {
            (Some(practicum_token), Some(telegram_token), Some(chat_id)) => Ok(Credentials {
                practicum_token,
                telegram_token,
                chat_id,
            }),
            (p, t, c) => {
                let missing = [
                    (p.is_none(), PRACTICUM_TOKEN_VAR),
                    (t.is_none(), TELEGRAM_TOKEN_VAR),
                    (c.is_none(), CHAT_ID_VAR),
                ]
                .into_iter()
                .filter(|(absent, _)| *absent)
                .map(|(_, name)| name)
                .collect();
                Err(NotifierError::MissingCredentials(missing))
            }
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.retry_secs == 0 {
            errors.push("retry_secs must be positive".to_string());
        }

        for (name, url) in [
            ("endpoint", &self.endpoint),
            ("telegram_api_url", &self.telegram_api_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!("{name} must be an http(s) URL, got '{url}'"));
            }
        }

        if self.request_timeout_secs == Some(0) {
            errors.push("request_timeout_secs must be positive when set".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
