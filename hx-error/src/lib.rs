//! Unified error handling for hal-xadc
//!
//! A single error type shared by the sampler daemon and the machine action layer.
//! Startup failures and per-tick read failures are both expressed here; the
//! caller decides which ones are fatal.

use std::io;
use std::path::PathBuf;

/// Result type alias using HalXadcError
pub type Result<T> = std::result::Result<T, HalXadcError>;

/// Unified error type for all hal-xadc operations
#[derive(thiserror::Error, Debug)]
pub enum HalXadcError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // ADC Channel Errors
    // ============================================================================
    #[error("Pin not available: empty channel identifier")]
    EmptyChannelId,

    #[error("Invalid channel entry '{entry}': {reason}")]
    InvalidChannelSpec {
        entry: String,
        reason: String,
    },

    #[error("No ADC input matching '{pattern}' in {dir}")]
    ChannelNotFound {
        dir: PathBuf,
        pattern: String,
    },

    #[error("Ambiguous ADC input '{pattern}': {} candidates ({})", .matches.len(), display_paths(.matches))]
    AmbiguousChannel {
        pattern: String,
        matches: Vec<PathBuf>,
    },

    #[error("Cannot read ADC input: {path}: {source}")]
    ChannelUnreadable {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Invalid ADC sample in {path}: {value:?}")]
    InvalidSample {
        path: PathBuf,
        value: String,
    },

    // ============================================================================
    // Conversion Errors
    // ============================================================================
    #[error("Invalid baseboard name: {name} (valid names are: {valid})")]
    UnknownBaseboard {
        name: String,
        valid: String,
    },

    #[error("Unknown thermistor '{name}' (no built-in model and no table at {path})")]
    UnknownThermistor {
        name: String,
        path: PathBuf,
    },

    #[error("Invalid thermistor table {path}: {reason}")]
    InvalidThermistorTable {
        path: PathBuf,
        reason: String,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // ============================================================================
    // Signal Bus Errors
    // ============================================================================
    #[error("Pin already exists: {0}")]
    DuplicatePin(String),

    #[error("Unknown pin: {0}")]
    UnknownPin(String),

    #[error("Pin {pin} expects {expected} value")]
    PinTypeMismatch {
        pin: String,
        expected: &'static str,
    },

    #[error("Component {component} is {state}")]
    ComponentState {
        component: String,
        state: &'static str,
    },

    // ============================================================================
    // Machine Action Errors
    // ============================================================================
    #[error("Machine command failed: {0}")]
    Command(String),

    #[error("MDI template error: {0}")]
    Template(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action already registered: {0}")]
    DuplicateAction(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl HalXadcError {
    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid channel entry error
    pub fn invalid_channel(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidChannelSpec {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Create a machine command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// True for errors a sampling tick recovers from on its own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::FileRead { .. } | Self::InvalidSample { .. }
        )
    }
}
