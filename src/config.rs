//! Service endpoints, query defaults, and logging settings.
//!
//! Loaded from a TOML file (`gsn.toml` by default). Every field has a
//! default so a partial or missing file is valid. Selected values can be
//! overridden from the environment (after `dotenv` has loaded `.env`).

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::logging::LogLevel;
use crate::model::ChannelId;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./gsn.toml";

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stations: StationServiceConfig,
    pub metrics: MetricServiceConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub report: ReportConfig,
}

/// FDSN station web service (Stage 1).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StationServiceConfig {
    pub url: String,
    /// Network code, `II` for the IRIS/IDA half of the GSN.
    pub network: String,
    pub format: String,
    /// Status code the service should answer with when nothing matches.
    pub nodata: String,
}

/// DQA metrics CGI (Stages 2 and 3).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricServiceConfig {
    pub url: String,
    pub catalog_cmd: String,
    pub grid_cmd: String,
    /// Metric selected before the user picks one.
    pub initial_channel: ChannelId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Where the binary writes the JSON run report, if anywhere.
    pub json_path: Option<String>,
}

impl Default for StationServiceConfig {
    fn default() -> Self {
        StationServiceConfig {
            url: "http://service.iris.edu/fdsnws/station/1/query".to_string(),
            network: "II".to_string(),
            format: "text".to_string(),
            nodata: "404".to_string(),
        }
    }
}

impl Default for MetricServiceConfig {
    fn default() -> Self {
        MetricServiceConfig {
            url: "http://dqa.ucsd.edu/dqa/cgi-bin/metrics.py".to_string(),
            catalog_cmd: "groups_dates_stations_metrics".to_string(),
            grid_cmd: "stationgrid".to_string(),
            initial_channel: 3,
            start_date: NaiveDate::from_ymd_opt(2015, 6, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2015, 6, 10).unwrap_or_default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig { timeout_secs: 30 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            file: None,
            console_timestamps: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The file exists but could not be read.
    Io(String),
    /// The file is not valid TOML for this schema.
    Parse(String),
    /// Values parsed but are inconsistent.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Parses a TOML document. Missing sections and fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the defaults if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Config::from_toml_str(&text)
    }

    /// Loads the file named by `GSN_CONFIG` (or `./gsn.toml`) and applies
    /// environment overrides. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Config, ConfigError> {
        let path = std::env::var("GSN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Config::load(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `GSN_*` overrides obtained through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GSN_STATIONS_URL") {
            self.stations.url = url;
        }
        if let Some(url) = lookup("GSN_METRICS_URL") {
            self.metrics.url = url;
        }
        if let Some(network) = lookup("GSN_NETWORK") {
            self.stations.network = network;
        }
        if let Some(raw) = lookup("GSN_INITIAL_CHANNEL") {
            self.metrics.initial_channel = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("GSN_INITIAL_CHANNEL is not a metric id: '{}'", raw))
            })?;
        }
        if let Some(raw) = lookup("GSN_LOG_LEVEL") {
            self.logging.level = raw.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(file) = lookup("GSN_LOG_FILE") {
            self.logging.file = Some(file);
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.start_date > self.metrics.end_date {
            return Err(ConfigError::Invalid(format!(
                "metrics.start_date {} is after metrics.end_date {}",
                self.metrics.start_date, self.metrics.end_date
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_toml_str("").expect("empty TOML is valid");
        assert_eq!(config, Config::default());
        assert_eq!(config.stations.network, "II");
        assert_eq!(config.stations.nodata, "404");
        assert_eq!(config.metrics.initial_channel, 3);
        assert_eq!(config.metrics.catalog_cmd, "groups_dates_stations_metrics");
    }

    #[test]
    fn test_partial_document_overrides_only_named_fields() {
        let config = Config::from_toml_str(
            r#"
            [stations]
            network = "IU"

            [metrics]
            initial_channel = 7
            start_date = "2016-01-01"
            end_date = "2016-01-31"

            [logging]
            level = "debug"
            "#,
        )
        .expect("valid TOML");

        assert_eq!(config.stations.network, "IU");
        assert_eq!(config.stations.format, "text");
        assert_eq!(config.metrics.initial_channel, 7);
        assert_eq!(config.metrics.start_date, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_inverted_date_range_is_rejected() {
        let result = Config::from_toml_str(
            r#"
            [metrics]
            start_date = "2016-02-01"
            end_date = "2016-01-01"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let result = Config::from_toml_str("[stations\nurl = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("GSN_STATIONS_URL", "http://localhost:8080/query"),
            ("GSN_NETWORK", "IU"),
            ("GSN_INITIAL_CHANNEL", "12"),
            ("GSN_LOG_LEVEL", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .expect("overrides are valid");

        assert_eq!(config.stations.url, "http://localhost:8080/query");
        assert_eq!(config.stations.network, "IU");
        assert_eq!(config.metrics.initial_channel, 12);
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert_eq!(config.metrics.url, MetricServiceConfig::default().url);
    }

    #[test]
    fn test_non_numeric_channel_override_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "GSN_INITIAL_CHANNEL").then(|| "three".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load("./definitely-not-here.toml").expect("missing file is fine");
        assert_eq!(config, Config::default());
    }
}
