use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Global type definitions
///
/// Stores identifiers, constants, and configuration used across the buffer pool
/// and its page stores.
/// Page ID type
pub type PageId = u64;

/// Invalid page ID
pub const INVALID_PAGE_ID: PageId = u64::MAX;

/// Index of a frame inside a buffer pool
pub type FrameId = usize;

/// Identity of an open page store, unique among the stores sharing a pool
pub type StoreId = u32;

/// Page size (8KB)
pub const PAGE_SIZE: usize = 8192;

/// Default number of frames in a pool
pub const DEFAULT_POOL_FRAMES: usize = 1024;

/// Configuration loading error
#[derive(Debug)]
pub enum ConfigError {
    /// Reading the configuration file failed
    IoError(std::io::Error),
    /// The configuration text is not valid JSON for `BufferPoolConfig`
    ParseError(serde_json::Error),
    /// A field holds a value the pool cannot run with
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(err) => write!(f, "I/O error: {}", err),
            ConfigError::ParseError(err) => write!(f, "Parse error: {}", err),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(err) => Some(err),
            ConfigError::ParseError(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err)
    }
}

/// Buffer pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool
    pub num_frames: usize,
    /// Page size in bytes. Only `PAGE_SIZE` is supported.
    pub page_size: usize,
    /// Whether to enable logging
    pub enable_log: bool,
    /// Log level
    pub log_level: LogLevel,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            num_frames: DEFAULT_POOL_FRAMES, // 1024 frames, 8MB of page content
            page_size: PAGE_SIZE,
            enable_log: true,
            log_level: LogLevel::Info,
        }
    }
}

impl BufferPoolConfig {
    /// Creates the default configuration with a different frame count
    pub fn with_frames(num_frames: usize) -> Self {
        Self {
            num_frames,
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON. Missing fields take their default values.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: BufferPoolConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks that the pool can be built from this configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_frames == 0 {
            return Err(ConfigError::Invalid(
                "num_frames must be at least 1".to_string(),
            ));
        }
        if self.page_size != PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "page_size must be {}, got {}",
                PAGE_SIZE, self.page_size
            )));
        }
        Ok(())
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl LogLevel {
    /// Converts to the `log` crate filter
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}
