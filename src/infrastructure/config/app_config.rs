//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;

const APP_NAME: &str = "slotfetch";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Network settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Decode settings.
    #[serde(default)]
    pub decode: DecodeConfig,
}

/// Network fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent transfers.
    #[serde(default = "default_max_concurrent_transfers")]
    pub max_concurrent_transfers: usize,

    /// Upgrade `http` URLs to `https` before fetching.
    #[serde(default = "default_true")]
    pub force_https: bool,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent_transfers: default_max_concurrent_transfers(),
            force_https: true,
            user_agent: default_user_agent(),
        }
    }
}

/// Decode configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Images wider than this are downscaled. Zero disables downscaling.
    #[serde(default = "default_thumbnail_max_width")]
    pub thumbnail_max_width: u32,

    /// Height bound used when downscaling. Zero leaves the height unbounded.
    #[serde(default = "default_thumbnail_max_height")]
    pub thumbnail_max_height: u32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            thumbnail_max_width: default_thumbnail_max_width(),
            thumbnail_max_height: default_thumbnail_max_height(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_concurrent_transfers() -> usize {
    4
}

const fn default_thumbnail_max_width() -> u32 {
    400
}

const fn default_thumbnail_max_height() -> u32 {
    300
}

fn default_user_agent() -> String {
    format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.fetch.timeout_secs = timeout_secs;
        }
        if let Some(max) = args.max_concurrent_transfers {
            self.fetch.max_concurrent_transfers = max;
        }
        if let Some(force_https) = args.force_https {
            self.fetch.force_https = force_https;
        }
        if let Some(width) = args.thumbnail_max_width {
            self.decode.thumbnail_max_width = width;
        }
    }

    /// Platform config directory for slotfetch.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::Info,
            fetch: FetchConfig::default(),
            decode: DecodeConfig::default(),
        }
    }
}
