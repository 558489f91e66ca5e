//! Layered server settings.
//!
//! Settings resolve in three layers, later layers winning:
//! built-in defaults, then an optional YAML file, then `ROLEGRAPH_*`
//! environment variables (`__` separates nested keys).
//!
//! ```ignore
//! use rolegraph_server::config::ServerConfig;
//!
//! let from_file = ServerConfig::load("rolegraph.yaml")?;
//! let env_only = ServerConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat, FileSourceFile};
use rolegraph_domain::DispatcherConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "ROLEGRAPH";

/// Top-level settings tree, one section per concern.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    /// Intent resolver settings
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Startup seeding settings
    #[serde(default)]
    pub seed: SeedSettings,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Browser origins allowed by CORS. Empty allows any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_body_limit() -> usize {
    64 * 1024
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type. Only "memory" is available.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit one JSON object per line instead of pretty text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSettings {
    /// Install the Prometheus recorder and expose the scrape route
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Route the scrape endpoint is mounted on
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Intent resolver settings.
///
/// These settings can be overridden via environment variables with the
/// `ROLEGRAPH_` prefix and `__` as the nested key separator:
///
/// - `ROLEGRAPH_RESOLVER__BACKEND=llm` - Use the language-model resolver
/// - `ROLEGRAPH_RESOLVER__API_KEY=...` - API key for the model endpoint
/// - `ROLEGRAPH_RESOLVER__MIN_CONFIDENCE=0.6` - Reject doubtful intents
///
/// # Example YAML Configuration
///
/// ```yaml
/// resolver:
///   backend: llm
///   endpoint: https://generativelanguage.googleapis.com/v1beta
///   model: gemini-1.5-flash
///   timeout_secs: 10
///   min_confidence: 0.6
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResolverSettings {
    /// Resolver backend: "keyword" (offline) or "llm"
    #[serde(default = "default_resolver_backend")]
    pub backend: String,

    /// Base URL of the model API (used by "llm")
    #[serde(default = "default_resolver_endpoint")]
    pub endpoint: String,

    /// Model name (used by "llm")
    #[serde(default = "default_resolver_model")]
    pub model: String,

    /// API key for the model endpoint (required by "llm")
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upper bound on a single resolution, in seconds
    #[serde(default = "default_resolver_timeout")]
    pub timeout_secs: u64,

    /// Minimum confidence for an intent to be executed. Unset disables the floor.
    #[serde(default)]
    pub min_confidence: Option<f64>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            backend: default_resolver_backend(),
            endpoint: default_resolver_endpoint(),
            model: default_resolver_model(),
            api_key: None,
            timeout_secs: default_resolver_timeout(),
            min_confidence: None,
        }
    }
}

impl ResolverSettings {
    /// Builds the dispatcher configuration from these settings.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        let config = DispatcherConfig::default()
            .with_resolver_timeout(Duration::from_secs(self.timeout_secs));
        match self.min_confidence {
            Some(floor) => config.with_min_confidence(floor),
            None => config,
        }
    }
}

fn default_resolver_backend() -> String {
    "keyword".to_string()
}

fn default_resolver_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_resolver_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_resolver_timeout() -> u64 {
    10
}

/// Startup seeding settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SeedSettings {
    /// Seed the default Admin role and its permissions at startup
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Failure to assemble a usable [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// A source could not be read or did not deserialize.
    #[error("could not read settings: {0}")]
    Load(#[from] ConfigError),

    #[error("settings file not found: {path}")]
    FileNotFound { path: String },

    /// Settings parsed but failed validation.
    #[error("invalid settings: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Reads `path` as YAML on top of the defaults, then applies
    /// `ROLEGRAPH_*` overrides (`ROLEGRAPH_SERVER__PORT=9090` sets
    /// `server.port`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Self::assemble(Some(File::from(path).format(FileFormat::Yaml)))
    }

    /// Defaults plus `ROLEGRAPH_*` overrides, no file.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::assemble(None)
    }

    fn assemble(file: Option<File<FileSourceFile, FileFormat>>) -> Result<Self, ConfigLoadError> {
        let mut builder = Config::builder().add_source(Config::try_from(&ServerConfig::default())?);
        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        let settings: ServerConfig = builder.add_source(environment()).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects settings the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs must be greater than 0"));
        }

        if self.server.body_limit_bytes == 0 {
            return Err(invalid("server.body_limit_bytes must be greater than 0"));
        }

        if let Some(origin) = self
            .server
            .cors_allowed_origins
            .iter()
            .find(|o| !(o.starts_with("http://") || o.starts_with("https://")))
        {
            return Err(invalid(format!(
                "server.cors_allowed_origins entries must be http(s) origins, got '{origin}'"
            )));
        }

        one_of("storage.backend", &self.storage.backend, &["memory"])?;
        one_of(
            "logging.level",
            &self.logging.level.to_lowercase(),
            &["trace", "debug", "info", "warn", "error"],
        )?;

        let resolver = &self.resolver;
        one_of("resolver.backend", &resolver.backend, &["keyword", "llm"])?;

        if resolver.backend == "llm" {
            if resolver.endpoint.trim().is_empty() {
                return Err(invalid("resolver.endpoint is required when backend is 'llm'"));
            }
            if resolver
                .api_key
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
            {
                return Err(invalid("resolver.api_key is required when backend is 'llm'"));
            }
        }

        if resolver.timeout_secs == 0 {
            return Err(invalid("resolver.timeout_secs must be greater than 0"));
        }

        // The dispatcher must give up on the resolver before the HTTP layer
        // cuts the request off, or the caller gets a bare 408.
        if resolver.timeout_secs >= self.server.request_timeout_secs {
            return Err(invalid(format!(
                "resolver.timeout_secs ({}) must be less than server.request_timeout_secs ({})",
                resolver.timeout_secs, self.server.request_timeout_secs
            )));
        }

        if let Some(floor) = resolver.min_confidence {
            if !(0.0..=1.0).contains(&floor) {
                return Err(invalid(format!(
                    "resolver.min_confidence must be between 0 and 1, got: {floor}"
                )));
            }
        }

        Ok(())
    }
}

/// Environment source: `ROLEGRAPH_SERVER__PORT` maps to `server.port`.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn one_of(key: &str, value: &str, allowed: &[&str]) -> Result<(), ConfigLoadError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{key} must be one of {allowed:?}, got '{value}'")))
    }
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}
