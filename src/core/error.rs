//! # Error Types
//!
//! Typed errors for the reminder engine and for startup configuration.
//! Handlers and `main` wrap these in `anyhow` at the application edge.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: `WaitOutOfRange` for due times that cannot be represented
//! - 1.1.0: Lookup misses return `UnknownMachine` instead of exiting the process
//! - 1.0.0: Initial release

use std::path::PathBuf;
use thiserror::Error;

use crate::core::ids::ChatId;
use crate::features::locale::Locale;

/// Result type alias for reminder engine operations.
pub type ReminderResult<T> = std::result::Result<T, ReminderError>;

#[derive(Error, Debug)]
pub enum ReminderError {
    /// A durable read or write failed. The mutating call was rolled back.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted file could not be parsed. Fatal on load.
    #[error("Persisted file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unknown machine: {0}")]
    UnknownMachine(String),

    /// The machine's wait pushes the due time past what a timestamp can hold
    #[error("Wait time of machine '{0}' is out of range")]
    WaitOutOfRange(String),

    #[error("A reminder for machine '{machine_type}' is already active in chat {chat_id}")]
    AlreadyActive {
        chat_id: ChatId,
        machine_type: String,
    },

    #[error("Gateway error: {0}")]
    Gateway(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "The configuration file ({path}) was not found. Copy the example file ({example}) to this name and update the necessary values in it"
    )]
    NotFound { path: PathBuf, example: PathBuf },

    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Machine '{machine}' has no {field} for locale '{locale}'")]
    MissingLocaleText {
        machine: String,
        field: &'static str,
        locale: Locale,
    },

    #[error("Missing required setting: {0}")]
    MissingEnv(&'static str),
}
