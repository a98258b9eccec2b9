//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `GEMINI_GATEWAY_CONFIG`
//! environment variable. A missing file is not an error; every field has a default except the
//! Gemini API key.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `GEMINI_GATEWAY_` override YAML values
//! 3. **GEMINI_API_KEY** / **PORT** - Special cases: override `gemini.api_key` and `port` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `GEMINI_GATEWAY_GEMINI__MODEL=gemini-2.0-flash` sets the `gemini.model` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use gemini_gateway::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Gemini**: `gemini.api_key`, `gemini.base_url`, `gemini.model`, `gemini.request_timeout`
//! - **Uploads**: `uploads.dir`, `uploads.max_file_size` - scratch directory for attachments
//! - **CORS**: `cors.allowed_origins`, `cors.max_age`
//! - **Features**: `enable_metrics`, `enable_otel_export` - Optional feature toggles
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # API key (preferred method)
//! GEMINI_API_KEY=AIza...
//!
//! # Override server port
//! PORT=8080
//!
//! # Override nested values
//! GEMINI_GATEWAY_UPLOADS__DIR=/var/tmp/gemini-uploads
//! GEMINI_GATEWAY_ENABLE_METRICS=true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "GEMINI_GATEWAY_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Upstream model settings
    pub gemini: GeminiConfig,
    /// Scratch storage for uploaded attachments
    pub uploads: UploadsConfig,
    /// Cross-origin settings for the browser client
    pub cors: CorsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Gemini API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key` (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of the Generative Language API
    pub base_url: Url,
    /// Model identifier, with or without the `models/` prefix
    pub model: String,
    /// Timeout for a single generateContent call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Url::parse("https://generativelanguage.googleapis.com/").expect("static URL is valid"),
            model: "gemini-1.5-flash".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Attachment scratch storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    /// Directory holding attachments while a request is in flight (created if absent)
    pub dir: PathBuf,
    /// Maximum accepted attachment size in bytes
    pub max_file_size: u64,
}

impl UploadsConfig {
    /// Room for the prompt and multipart framing on top of the file itself
    const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

    /// Request body limit applied to the generation routes
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_file_size.saturating_add(Self::FORM_OVERHEAD_BYTES)).unwrap_or(usize::MAX)
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_file_size: 20 * 1024 * 1024, // 20 MiB, the inline data ceiling of the API
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard", serialize_with = "serialize_wildcard")]
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

fn serialize_wildcard<S>(serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("*")
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            gemini: GeminiConfig::default(),
            uploads: UploadsConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(figment::Error::from)?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), String> {
        match self.gemini.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => {
                return Err("Config validation: gemini.api_key is not configured. \
                     Please set the GEMINI_API_KEY environment variable or add gemini.api_key to the config file."
                    .to_string());
            }
        }

        if self.gemini.model.trim().is_empty() {
            return Err("Config validation: gemini.model cannot be empty".to_string());
        }

        if self.uploads.max_file_size == 0 {
            return Err("Config validation: uploads.max_file_size must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("GEMINI_GATEWAY_").split("__"))
            // Conventional names used by most deployments
            .merge(Env::raw().only(&["GEMINI_API_KEY"]).map(|_| "gemini.api_key".into()))
            .merge(Env::raw().only(&["PORT"]))
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
    fn test_yaml_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
host: 127.0.0.1
port: 9000
gemini:
  api_key: yaml-key
  model: models/gemini-2.0-flash
  request_timeout: 15s
uploads:
  dir: /tmp/scratch
  max_file_size: 1024
cors:
  allowed_origins:
    - "*"
    - https://chat.example.com
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.bind_address(), "127.0.0.1:9000");
            assert_eq!(config.gemini.api_key.as_deref(), Some("yaml-key"));
            assert_eq!(config.gemini.model, "models/gemini-2.0-flash");
            assert_eq!(config.gemini.request_timeout, Duration::from_secs(15));
            assert_eq!(config.uploads.dir, PathBuf::from("/tmp/scratch"));
            assert_eq!(config.uploads.max_file_size, 1024);
            assert!(matches!(config.cors.allowed_origins[0], CorsOrigin::Wildcard));
            assert!(matches!(&config.cors.allowed_origins[1], CorsOrigin::Url(url) if url.host_str() == Some("chat.example.com")));

            Ok(())
        });
    }

    #[test]
    fn test_defaults_with_missing_file() {
        Jail::expect_with(|jail| {
            jail.set_env("GEMINI_API_KEY", "env-key");

            let config = Config::load(&args("does-not-exist.yaml"))?;

            assert_eq!(config.host, "0.0.0.0");
            assert_eq!(config.port, 5000);
            assert_eq!(config.gemini.model, "gemini-1.5-flash");
            assert_eq!(config.gemini.base_url.as_str(), "https://generativelanguage.googleapis.com/");
            assert_eq!(config.uploads.dir, PathBuf::from("uploads"));
            assert!(!config.enable_metrics);

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 9000
gemini:
  api_key: yaml-key
  model: gemini-1.5-flash
"#,
            )?;

            jail.set_env("GEMINI_API_KEY", "env-key");
            jail.set_env("PORT", "8080");
            jail.set_env("GEMINI_GATEWAY_GEMINI__MODEL", "gemini-2.0-flash");
            jail.set_env("GEMINI_GATEWAY_ENABLE_METRICS", "true");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 8080);
            assert_eq!(config.gemini.api_key.as_deref(), Some("env-key"));
            assert_eq!(config.gemini.model, "gemini-2.0-flash");
            assert!(config.enable_metrics);

            Ok(())
        });
    }

    #[test]
    fn test_missing_api_key_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "port: 9000\n")?;

            let err = Config::load(&args("test.yaml")).unwrap_err();
            assert!(err.to_string().contains("gemini.api_key"));

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
gemini:
  api_key: key
  temperature: 0.2
"#,
            )?;

            assert!(Config::load(&args("test.yaml")).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_validation_rules() {
        let mut config = Config::default();
        config.gemini.api_key = Some("key".to_string());
        assert!(config.validate().is_ok());

        config.uploads.max_file_size = 0;
        assert!(config.validate().unwrap_err().contains("max_file_size"));

        config.uploads.max_file_size = 10;
        config.gemini.model = " ".to_string();
        assert!(config.validate().unwrap_err().contains("gemini.model"));

        config.gemini.model = "gemini-1.5-flash".to_string();
        config.gemini.api_key = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_body_limit_includes_form_overhead() {
        let uploads = UploadsConfig {
            dir: PathBuf::from("uploads"),
            max_file_size: 10,
        };
        assert_eq!(uploads.body_limit(), 10 + 1024 * 1024);
    }
}
