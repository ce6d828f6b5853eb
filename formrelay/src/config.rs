//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `FORMRELAY_CONFIG`
//! environment variable. A missing file is fine: every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `FORMRELAY_` override YAML values
//! 3. **TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID / PORT** - Conventional names, override everything
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `FORMRELAY_UPLOADS__MAX_FILE_SIZE=1048576` sets the `uploads.max_file_size` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use formrelay::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Relay will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Telegram**: `telegram.bot_token`, `telegram.chat_id`, `telegram.api_url`,
//!   `telegram.request_timeout` - Destination of relayed submissions
//! - **Uploads**: `uploads.temp_dir`, `uploads.max_file_size`, `uploads.allowed_mime_types`
//! - **CORS**: `cors.allowed_origins`, `cors.max_age` - Which frontends may call the relay
//! - **Telemetry**: `enable_otel_export`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! TELEGRAM_BOT_TOKEN="123456:ABC-DEF"
//! TELEGRAM_CHAT_ID="-1001234567890"
//! PORT=8080
//!
//! FORMRELAY_CORS__ALLOWED_ORIGINS='["https://example.com"]'
//! FORMRELAY_TELEGRAM__REQUEST_TIMEOUT=10s
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Default upload limit: 20 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// MIME types accepted by `/send-file` unless overridden
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "application/zip",
    "application/x-rar-compressed",
    "video/mp4",
    "video/mpeg",
    "video/quicktime",
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
];

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "FORMRELAY_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// Built once at startup and shared read-only with every handler.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Bot API credentials and client settings
    pub telegram: TelegramConfig,
    /// Temporary upload storage and limits
    pub uploads: UploadConfig,
    /// CORS configuration for the frontend
    pub cors: CorsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Telegram Bot API configuration.
///
/// The token and chat id are optional at load time so a misconfigured deployment still
/// starts and answers requests with a configuration error instead of crash-looping.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot token, embedded in the API URL path
    pub bot_token: Option<String>,
    /// Destination chat for every relayed submission
    #[serde(deserialize_with = "parse_chat_id")]
    pub chat_id: Option<String>,
    /// Base URL of the Bot API
    pub api_url: Url,
    /// Timeout for a single outbound API call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Borrowed view of the two secrets needed to address the bot API.
#[derive(Debug, Clone, Copy)]
pub struct BotCredentials<'a> {
    pub token: &'a str,
    pub chat_id: &'a str,
}

impl TelegramConfig {
    /// Returns both secrets, or the name of the first missing one.
    pub fn credentials(&self) -> Result<BotCredentials<'_>, &'static str> {
        let token = self.bot_token.as_deref().filter(|t| !t.is_empty()).ok_or("telegram.bot_token")?;
        let chat_id = self.chat_id.as_deref().filter(|c| !c.is_empty()).ok_or("telegram.chat_id")?;
        Ok(BotCredentials { token, chat_id })
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_url", &self.api_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Upload storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Directory where uploads live for the duration of one request
    pub temp_dir: PathBuf,
    /// Maximum size of a single uploaded file in bytes
    pub max_file_size: u64,
    /// MIME types accepted for upload
    pub allowed_mime_types: Vec<String>,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// Chat ids are numeric in Telegram; environment variables holding them arrive as numbers.
fn parse_chat_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChatId {
        Text(String),
        Numeric(i64),
    }

    Ok(Option::<ChatId>::deserialize(deserializer)?.map(|id| match id {
        ChatId::Text(s) => s,
        ChatId::Numeric(n) => n.to_string(),
    }))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            telegram: TelegramConfig::default(),
            uploads: UploadConfig::default(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_url: Url::parse("https://api.telegram.org").expect("static URL is valid"),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("formrelay-uploads"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                CorsOrigin::Url(Url::parse("http://localhost:5173").expect("static URL is valid")), // Development frontend (Vite)
            ],
            max_age: Some(3600),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        if self.uploads.max_file_size == 0 {
            return Err(Error::Internal {
                operation: "validate configuration: uploads.max_file_size must be positive (default: 20971520 = 20 MiB)".to_string(),
            });
        }

        if self.uploads.allowed_mime_types.is_empty() {
            return Err(Error::Internal {
                operation: "validate configuration: uploads.allowed_mime_types cannot be empty".to_string(),
            });
        }

        if self.telegram.request_timeout.is_zero() {
            return Err(Error::Internal {
                operation: "validate configuration: telegram.request_timeout must be greater than zero".to_string(),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "validate configuration: cors.allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("FORMRELAY_").split("__"))
            // Conventional deployment variable names
            .merge(
                Env::raw()
                    .only(&["TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID", "PORT"])
                    .map(|key| match key.as_str().to_ascii_lowercase().as_str() {
                        "telegram_bot_token" => "telegram.bot_token".into(),
                        "telegram_chat_id" => "telegram.chat_id".into(),
                        _ => "port".into(),
                    }),
            )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.port, 3000);
            assert_eq!(config.uploads.max_file_size, 20 * 1024 * 1024);
            assert_eq!(config.uploads.allowed_mime_types.len(), 21);
            assert_eq!(config.telegram.api_url.as_str(), "https://api.telegram.org/");
            assert_eq!(config.telegram.request_timeout, Duration::from_secs(30));
            assert!(config.telegram.bot_token.is_none());

            Ok(())
        });
    }

    #[test]
    fn test_yaml_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 8081
telegram:
  bot_token: "123:abc"
  chat_id: "-10042"
  request_timeout: 5s
uploads:
  temp_dir: /tmp/relay-test
  max_file_size: 1024
  allowed_mime_types:
    - image/png
cors:
  allowed_origins:
    - "https://example.com"
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 8081);
            assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
            assert_eq!(config.telegram.chat_id.as_deref(), Some("-10042"));
            assert_eq!(config.telegram.request_timeout, Duration::from_secs(5));
            assert_eq!(config.uploads.temp_dir, PathBuf::from("/tmp/relay-test"));
            assert_eq!(config.uploads.max_file_size, 1024);
            assert_eq!(config.uploads.allowed_mime_types, vec!["image/png".to_string()]);
            assert!(matches!(
                config.cors.allowed_origins.as_slice(),
                [CorsOrigin::Url(url)] if url.as_str() == "https://example.com/"
            ));

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
host: 10.0.0.1
telegram:
  chat_id: "from-yaml"
"#,
            )?;

            jail.set_env("FORMRELAY_PORT", "9000");
            jail.set_env("FORMRELAY_TELEGRAM__CHAT_ID", "from-env");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 9000);
            assert_eq!(config.telegram.chat_id.as_deref(), Some("from-env"));
            // YAML values should be preserved
            assert_eq!(config.host, "10.0.0.1");

            Ok(())
        });
    }

    #[test]
    fn test_conventional_env_names() {
        Jail::expect_with(|jail| {
            jail.set_env("TELEGRAM_BOT_TOKEN", "999:secret");
            jail.set_env("TELEGRAM_CHAT_ID", "-1001234567890");
            jail.set_env("PORT", "4000");

            let config = Config::load(&args("config.yaml"))?;

            assert_eq!(config.telegram.bot_token.as_deref(), Some("999:secret"));
            assert_eq!(config.telegram.chat_id.as_deref(), Some("-1001234567890"));
            assert_eq!(config.port, 4000);

            Ok(())
        });
    }

    #[test]
    fn test_wildcard_cors_origin() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
cors:
  allowed_origins: ["*"]
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;
            assert!(matches!(config.cors.allowed_origins.as_slice(), [CorsOrigin::Wildcard]));

            Ok(())
        });
    }

    #[test]
    fn test_unknown_field_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "telegram:\n  bot_tokn: typo\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_credentials_name_missing_secret() {
        let mut telegram = TelegramConfig::default();
        assert_eq!(telegram.credentials().unwrap_err(), "telegram.bot_token");

        telegram.bot_token = Some("123:abc".to_string());
        assert_eq!(telegram.credentials().unwrap_err(), "telegram.chat_id");

        telegram.chat_id = Some(String::new());
        assert_eq!(telegram.credentials().unwrap_err(), "telegram.chat_id");

        telegram.chat_id = Some("42".to_string());
        let creds = telegram.credentials().unwrap();
        assert_eq!(creds.token, "123:abc");
        assert_eq!(creds.chat_id, "42");
    }

    #[test]
    fn test_debug_redacts_token() {
        let telegram = TelegramConfig {
            bot_token: Some("123:super-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{telegram:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_validation_zero_file_size() {
        let mut config = Config::default();
        config.uploads.max_file_size = 0;

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("max_file_size"));
        assert!(
            message.starts_with("Failed to validate configuration: uploads.max_file_size must be positive"),
            "{message}"
        );
    }

    #[test]
    fn test_validation_empty_mime_list() {
        let mut config = Config::default();
        config.uploads.allowed_mime_types.clear();

        assert!(config.validate().unwrap_err().to_string().contains("allowed_mime_types"));
    }

    #[test]
    fn test_validation_empty_cors_origins() {
        let mut config = Config::default();
        config.cors.allowed_origins.clear();

        assert!(config.validate().unwrap_err().to_string().contains("allowed_origins"));
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut config = Config::default();
        config.telegram.request_timeout = Duration::ZERO;

        assert!(config.validate().unwrap_err().to_string().contains("request_timeout"));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(Config::default().validate().is_ok());
    }
}
