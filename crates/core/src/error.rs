//! Core error types for tickq operations.
//!
//! Registration mistakes are reported once, at startup. Everything that can
//! come from outside the process (save files, config) is a recoverable value.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for tickq operations.
#[derive(Debug, Error)]
pub enum Error {
    // Registry construction
    #[error("callback type '{tag}' is already registered")]
    DuplicateCallbackType { tag: String },

    #[error("callback variant for '{tag}' is already registered as '{existing}'")]
    DuplicateCallbackVariant { tag: String, existing: String },

    #[error("callback {callback} has no registered type")]
    UnregisteredCallback { callback: String },

    // Decoding
    #[error("unknown callback type '{tag}'")]
    UnknownCallbackType { tag: String },

    #[error("missing field '{field}'")]
    MissingField { field: String },

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("malformed '{tag}' callback: {reason}")]
    MalformedCallback { tag: String, reason: String },

    // Firing
    #[error("callback for event '{name}' failed at tick {tick}: {source}")]
    CallbackFailed {
        name: String,
        tick: i64,
        #[source]
        source: Box<Error>,
    },

    // Configuration and files
    #[error("invalid configuration: {reason}")]
    ConfigInvalid { reason: String },

    #[error("JSON parse error: {reason}")]
    JsonParseFailed { reason: String },

    #[error("TOML parse error: {reason}")]
    TomlParseFailed { reason: String },

    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("failed to write file '{path}': {reason}")]
    FileWriteFailed { path: PathBuf, reason: String },
}

impl Error {
    /// Create a duplicate callback type error.
    pub fn duplicate_callback_type(tag: impl Into<String>) -> Self {
        Self::DuplicateCallbackType { tag: tag.into() }
    }

    /// Create a duplicate callback variant error.
    pub fn duplicate_callback_variant(tag: impl Into<String>, existing: impl Into<String>) -> Self {
        Self::DuplicateCallbackVariant {
            tag: tag.into(),
            existing: existing.into(),
        }
    }

    /// Create an unregistered callback error.
    pub fn unregistered_callback(callback: impl Into<String>) -> Self {
        Self::UnregisteredCallback {
            callback: callback.into(),
        }
    }

    /// Create an unknown callback type error.
    pub fn unknown_callback_type(tag: impl Into<String>) -> Self {
        Self::UnknownCallbackType { tag: tag.into() }
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed callback error.
    pub fn malformed_callback(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedCallback {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Wrap the error a callback returned.
    pub fn callback_failed(name: impl Into<String>, tick: i64, source: Self) -> Self {
        Self::CallbackFailed {
            name: name.into(),
            tick,
            source: Box::new(source),
        }
    }

    /// The error a failed callback returned, if this is a callback failure.
    #[must_use]
    pub fn callback_source(&self) -> Option<&Self> {
        match self {
            Self::CallbackFailed { source, .. } => Some(&**source),
            _ => None,
        }
    }

    /// Create an invalid configuration error.
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            reason: reason.into(),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse_failed(reason: impl Into<String>) -> Self {
        Self::JsonParseFailed {
            reason: reason.into(),
        }
    }

    /// Create a TOML parse error.
    pub fn toml_parse_failed(reason: impl Into<String>) -> Self {
        Self::TomlParseFailed {
            reason: reason.into(),
        }
    }

    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a file write error.
    pub fn file_write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by data read from outside the process.
    ///
    /// Restores skip entries carrying these errors instead of aborting.
    #[must_use]
    pub const fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownCallbackType { .. }
                | Self::MissingField { .. }
                | Self::InvalidField { .. }
                | Self::MalformedCallback { .. }
        )
    }
}
