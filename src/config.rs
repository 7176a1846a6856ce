//! Configuration for the CSV stream host, using Figment.
//!
//! Configuration is loaded from:
//! 1. A TOML file (base configuration, `config/csv_stream.toml` by default)
//! 2. Environment variables prefixed with `CSV_STREAM_`, nested keys separated by `__`
//!
//! Every field has a default, so a missing file yields a working configuration that reads
//! from `stdin`.
//!
//! # Example
//! ```no_run
//! use csv_stream_daq::config::CsvStreamConfig;
//!
//! // CSV_STREAM_TRANSPORT__BAUD_RATE=9600 overrides transport.baud_rate
//! let config = CsvStreamConfig::load()?;
//! config.validate()?;
//! println!("Application: {}", config.application.name);
//! # Ok::<(), csv_stream_daq::error::DaqError>(())
//! ```

use crate::error::{AppResult, DaqError};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/csv_stream.toml";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvStreamConfig {
    /// `[application]` section
    #[serde(default)]
    pub application: ApplicationConfig,
    /// `[transport]` section
    #[serde(default)]
    pub transport: TransportConfig,
    /// `[acquisition]` section
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Name shown in the startup log line
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Where lines come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Serial port
    Serial,
    /// Capture file replay
    File,
    /// Standard input
    #[default]
    Stdin,
}

/// Line transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Which transport to open
    #[serde(default)]
    pub kind: TransportKind,
    /// Serial port name, required for `serial`
    #[serde(default)]
    pub port: Option<String>,
    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Per-read timeout of the serial port
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Capture file, required for `file`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            port: None,
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            path: None,
        }
    }
}

impl TransportConfig {
    /// `read_timeout_ms` as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Acquisition loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// How often the consumer delivers one pending sample set
    #[serde(default = "default_delivery_interval_ms")]
    pub delivery_interval_ms: u64,
    /// Arm the trigger as soon as the transport is open
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            delivery_interval_ms: default_delivery_interval_ms(),
            auto_start: default_auto_start(),
        }
    }
}

impl AcquisitionConfig {
    /// `delivery_interval_ms` as a [`Duration`].
    pub fn delivery_interval(&self) -> Duration {
        Duration::from_millis(self.delivery_interval_ms)
    }
}

fn default_name() -> String {
    "CSV Stream DAQ".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout_ms() -> u64 {
    100
}

// One render frame at 60 Hz
fn default_delivery_interval_ms() -> u64 {
    16
}

fn default_auto_start() -> bool {
    true
}

impl CsvStreamConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; environment overrides still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("CSV_STREAM_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let level = self.application.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        let format = self.application.log_format.to_lowercase();
        if !VALID_LOG_FORMATS.contains(&format.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                VALID_LOG_FORMATS.join(", ")
            )));
        }

        match self.transport.kind {
            TransportKind::Serial => {
                if self.transport.port.as_deref().map_or(true, str::is_empty) {
                    return Err(DaqError::Configuration(
                        "Serial transport requires transport.port".to_string(),
                    ));
                }
                if self.transport.baud_rate == 0 {
                    return Err(DaqError::Configuration(
                        "Invalid baud_rate 0. Must be positive".to_string(),
                    ));
                }
            }
            TransportKind::File => {
                if self.transport.path.is_none() {
                    return Err(DaqError::Configuration(
                        "File transport requires transport.path".to_string(),
                    ));
                }
            }
            TransportKind::Stdin => {}
        }

        if self.acquisition.delivery_interval_ms == 0 {
            return Err(DaqError::Configuration(
                "Invalid delivery_interval_ms 0. Must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
