//! Configuration types for pixgate.
//!
//! Settings are loaded from a TOML file (default `pixgate.toml`). Every
//! section is optional and falls back to defaults suitable for local
//! development with the in-memory store:
//!
//! - [`ServerConfig`] - HTTP bind address and port
//! - [`LoggingConfig`] - log level and output format
//! - [`InferenceConfig`] - text-to-image endpoint
//! - [`StorageConfig`] - object store backend
//! - [`AssetsConfig`] - public URL of stored assets
//! - [`RetentionSettings`] - sweep age threshold and schedule
//!
//! The entry points never see this struct directly; they receive the
//! narrower [`HandlerConfig`] and [`RetentionConfig`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::http::HandlerConfig;
use crate::sweeper::RetentionConfig;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Which entry points a validation covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationScope {
    /// HTTP server and scheduled sweeps: every section.
    #[default]
    Serve,
    /// One-off sweep: `[storage]` and `[retention]` only.
    Sweep,
}

/// Root of `pixgate.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
    pub assets: AssetsConfig,
    pub retention: RetentionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: constants::DEFAULT_BIND.to_string(),
            port: constants::DEFAULT_PORT,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset (e.g. "info", "pixgate=debug")
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub api_base: String,
    pub account_id: Option<String>,
    pub model: String,
    /// Falls back to the `PIXGATE_API_TOKEN` environment variable.
    pub api_token: Option<String>,
    /// Unset means no client-side timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_base: constants::DEFAULT_INFERENCE_API_BASE.to_string(),
            account_id: None,
            model: constants::DEFAULT_INFERENCE_MODEL.to_string(),
            api_token: None,
            timeout_secs: None,
        }
    }
}

impl InferenceConfig {
    /// API token from the file, else from the environment.
    pub fn resolve_api_token(&self) -> Option<String> {
        self.api_token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| std::env::var(constants::API_TOKEN_ENV).ok())
            .filter(|token| !token.is_empty())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Which object store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    Memory,
    Filesystem,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Root directory for `backend = "filesystem"`
    pub path: PathBuf,
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub region: String,
    pub force_path_style: bool,
    pub page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Memory,
            path: PathBuf::from("data/assets"),
            bucket: None,
            endpoint: None,
            region: "auto".to_string(),
            force_path_style: false,
            page_size: constants::DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Origin the store is publicly readable at, e.g. `https://pub-xyz.r2.dev`
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    pub max_age_days: u64,
    /// Cron expression with a leading seconds field
    pub schedule: String,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            max_age_days: constants::DEFAULT_RETENTION_DAYS,
            schedule: constants::DEFAULT_SWEEP_SCHEDULE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types or unknown sections are present
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Like [`Config::load_from`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate configuration.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found:
    /// - Port 0
    /// - Missing or non-http(s) `assets.public_base_url`
    /// - `backend = "s3"` without a bucket
    /// - `retention.max_age_days = 0`
    /// - Empty sweep schedule or zero page size
    pub fn validate(&self) -> Result<ValidationResult> {
        self.validate_for(ValidationScope::Serve)
    }

    /// Validate only the sections `scope` uses.
    ///
    /// # Errors
    ///
    /// Same as [`Config::validate`], restricted to the sections in scope.
    pub fn validate_for(&self, scope: ValidationScope) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if scope == ValidationScope::Serve {
            self.validate_server(&mut errors, &mut warnings);
        }
        self.validate_storage(&mut errors, &mut warnings);
        self.validate_retention(&mut errors);

        if errors.is_empty() {
            Ok(ValidationResult { warnings })
        } else {
            anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "))
        }
    }

    fn validate_server(&self, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        if self.server.port == 0 {
            errors.push("server.port cannot be 0. Use a valid port number (1-65535)".to_string());
        } else if self.server.port < 1024 {
            warnings.push(format!(
                "server.port {} is a system/privileged port (< 1024)",
                self.server.port
            ));
        }

        match url::Url::parse(&self.assets.public_base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {},
            Ok(url) => errors.push(format!(
                "assets.public_base_url must use http or https (got scheme '{}')",
                url.scheme()
            )),
            Err(e) => errors.push(format!(
                "assets.public_base_url is not a valid URL ('{}'): {e}",
                self.assets.public_base_url
            )),
        }
    }

    fn validate_storage(&self, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        match self.storage.backend {
            StorageBackendKind::S3 => {
                if self.storage.bucket.as_deref().is_none_or(str::is_empty) {
                    errors.push("storage.bucket is required when storage.backend = \"s3\"".to_string());
                }
                if self.storage.page_size > 1000 {
                    warnings.push(format!(
                        "storage.page_size {} exceeds the S3 maximum; 1000 will be used",
                        self.storage.page_size
                    ));
                }
            },
            StorageBackendKind::Filesystem => {
                if self.storage.path.as_os_str().is_empty() {
                    errors.push(
                        "storage.path is required when storage.backend = \"filesystem\"".to_string(),
                    );
                }
            },
            StorageBackendKind::Memory => {
                warnings.push(
                    "storage.backend = \"memory\": assets are lost when the process exits"
                        .to_string(),
                );
            },
        }

        if self.storage.page_size == 0 {
            errors.push("storage.page_size cannot be 0".to_string());
        }
    }

    fn validate_retention(&self, errors: &mut Vec<String>) {
        if self.retention.max_age_days == 0 {
            errors.push(
                "retention.max_age_days cannot be 0 (every asset would be deleted)".to_string(),
            );
        }

        if self.retention.schedule.trim().is_empty() {
            errors.push("retention.schedule cannot be empty".to_string());
        }
    }

    /// Settings handed to the request handler.
    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            public_base_url: self.assets.public_base_url.clone(),
        }
    }

    /// Settings handed to the retention sweeper.
    pub fn retention_config(&self) -> RetentionConfig {
        RetentionConfig::days(self.retention.max_age_days)
    }
}
