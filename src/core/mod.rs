//! # Core Module
//!
//! Core domain types, configuration, error handling and persistence helpers.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Add snapshot module with atomic JSON file writes
//! - 1.0.0: Initial creation with config, error and id modules

pub mod config;
pub mod error;
pub mod ids;
pub mod snapshot;

// Re-export commonly used items
pub use config::{Config, ReminderCommandDef, RuntimeConfig};
pub use error::{ConfigError, ReminderError, ReminderResult};
pub use ids::{ChatId, MessageId, ReminderKey, UserId};
