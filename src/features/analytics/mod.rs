//! # Analytics Feature
//!
//! Per chat and per user usage statistics.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod stats;

pub use stats::{
    AcceptedEvent, ChatStats, MachineEvent, StatsEvent, StatsKind, StatsRecorder, UserStats,
};
