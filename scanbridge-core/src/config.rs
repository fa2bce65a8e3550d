//! YAML configuration: loading and validation.
//!
//! # Location
//!
//! ```text
//! ~/.scanbridge/
//!   config.yaml
//! ```
//!
//! # API pattern
//!
//! - `config_path_at(home)`: explicit home; used in tests with `TempDir`
//! - `default_config_path()`: derives home from `dirs::home_dir()`
//!
//! [`load_at`] only parses. [`Config::validate`] collects every problem in one
//! pass so a broken file is reported completely, not one field at a time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Polling intervals below this many seconds are accepted with a warning.
pub const RECOMMENDED_MIN_POLLING_SECS: u64 = 1200;

pub const DEFAULT_POLLING_SECS: u64 = 43_200;
pub const DEFAULT_EXPORT_POLL_SECS: u64 = 2;
pub const DEFAULT_EXPORT_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_NAMESPACE: &str = "nessus";
pub const DEFAULT_FEED_URL: &str =
    "https://www.cisa.gov/sites/default/files/feeds/known_exploited_vulnerabilities.json";
pub const DEFAULT_IDENTIFIER_FIELD: &str = "CVE";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub sink: SinkConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the scanning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub url: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Export columns to enable. `None` uses the fixed default column set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

/// Downstream document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkConfig {
    Elasticsearch {
        url: String,
        auth: String,
        #[serde(default)]
        accept_invalid_certs: bool,
    },
    Mongodb {
        uri: String,
        #[serde(default = "default_database")]
        database: String,
    },
}

impl SinkConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SinkConfig::Elasticsearch { .. } => "elasticsearch",
            SinkConfig::Mongodb { .. } => "mongodb",
        }
    }
}

/// Scheduling and export behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub polling_interval_secs: u64,
    pub max_concurrency: usize,
    pub export_poll_interval_secs: u64,
    /// Ceiling for one export job. `0` disables the ceiling.
    pub export_timeout_secs: u64,
    pub namespace: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            polling_interval_secs: DEFAULT_POLLING_SECS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            export_poll_interval_secs: DEFAULT_EXPORT_POLL_SECS,
            export_timeout_secs: DEFAULT_EXPORT_TIMEOUT_SECS,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl ExporterConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn export_poll_interval(&self) -> Duration {
        Duration::from_secs(self.export_poll_interval_secs)
    }

    pub fn export_timeout(&self) -> Option<Duration> {
        (self.export_timeout_secs > 0).then(|| Duration::from_secs(self.export_timeout_secs))
    }
}

/// Known-exploited feed used to enrich new records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub feed_url: String,
    pub identifier_field: String,
    /// Refresh the feed between passes at most this often. `None` fetches
    /// once at startup only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<u64>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            identifier_field: DEFAULT_IDENTIFIER_FIELD.to_string(),
            refresh_interval_secs: None,
        }
    }
}

impl EnrichmentConfig {
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs.map(Duration::from_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
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

fn default_database() -> String {
    "Nessus".to_string()
}

/// A configuration that passed validation, plus any non-fatal findings.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: Config,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.scanbridge/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".scanbridge").join("config.yaml")
}

/// `config_path_at` convenience wrapper.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| config_path_at(&home))
        .ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Parse the config file at `path` without validating values.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse and validate in one step.
pub fn load_validated_at(path: &Path) -> Result<ValidatedConfig, ConfigError> {
    load_at(path)?.validate()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Check every section, returning all problems at once.
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let mut problems = Vec::new();
        let mut warnings = Vec::new();

        require_https(&self.scanner.url, "scanner.url", &mut problems);
        require_non_empty(&self.scanner.access_key, "scanner.access_key", &mut problems);
        require_non_empty(&self.scanner.secret_key, "scanner.secret_key", &mut problems);
        if let Some(columns) = &self.scanner.columns {
            if columns.is_empty() {
                problems.push("scanner.columns must name at least one column".to_string());
            }
        }
        if self.scanner.accept_invalid_certs {
            warnings.push("scanner TLS certificate verification is disabled".to_string());
        }

        match &self.sink {
            SinkConfig::Elasticsearch {
                url,
                auth,
                accept_invalid_certs,
            } => {
                require_https(url, "sink.url", &mut problems);
                require_non_empty(auth, "sink.auth", &mut problems);
                if *accept_invalid_certs {
                    warnings.push("sink TLS certificate verification is disabled".to_string());
                }
            }
            SinkConfig::Mongodb { uri, database } => {
                if !(uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://")) {
                    problems.push(format!(
                        "sink.uri must start with mongodb:// or mongodb+srv:// (got '{uri}')"
                    ));
                }
                require_non_empty(database, "sink.database", &mut problems);
            }
        }

        let exporter = &self.exporter;
        if exporter.polling_interval_secs == 0 {
            problems.push(format!(
                "exporter.polling_interval_secs must be set; at least {RECOMMENDED_MIN_POLLING_SECS} seconds is recommended"
            ));
        } else if exporter.polling_interval_secs < RECOMMENDED_MIN_POLLING_SECS {
            warnings.push(format!(
                "polling interval of {}s is below the recommended minimum of {RECOMMENDED_MIN_POLLING_SECS}s",
                exporter.polling_interval_secs
            ));
        }
        if exporter.max_concurrency == 0 {
            problems.push("exporter.max_concurrency must be at least 1".to_string());
        }
        if exporter.export_poll_interval_secs == 0 {
            problems.push("exporter.export_poll_interval_secs must be at least 1".to_string());
        }
        if exporter.namespace.trim().is_empty() {
            problems.push("exporter.namespace must not be empty".to_string());
        }

        match Url::parse(&self.enrichment.feed_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => problems.push(format!(
                "enrichment.feed_url is not an http(s) URL: '{}'",
                self.enrichment.feed_url
            )),
        }
        require_non_empty(
            &self.enrichment.identifier_field,
            "enrichment.identifier_field",
            &mut problems,
        );
        if self.enrichment.refresh_interval_secs == Some(0) {
            problems.push("enrichment.refresh_interval_secs must be positive when set".to_string());
        }

        if problems.is_empty() {
            Ok(ValidatedConfig {
                config: self,
                warnings,
            })
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }
}

fn require_https(raw: &str, field: &str, problems: &mut Vec<String>) {
    match Url::parse(raw) {
        Ok(url) if url.scheme() == "https" && url.host_str().is_some() => {}
        Ok(url) if url.scheme() != "https" => {
            problems.push(format!("{field} must use https (got '{}')", url.scheme()));
        }
        Ok(_) => problems.push(format!("{field} has no host: '{raw}'")),
        Err(err) => problems.push(format!("{field} is not a valid URL '{raw}': {err}")),
    }
}

fn require_non_empty(value: &str, field: &str, problems: &mut Vec<String>) {
    if value.trim().is_empty() {
        problems.push(format!("{field} must not be empty"));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
