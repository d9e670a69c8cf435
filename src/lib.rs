// Core layer - shared types and configuration
pub mod core;

// Features layer - reminders, stats, locale texts
pub mod features;

// Transport layer - notification gateway and its Discord implementation
pub mod gateway;

// Application layer
pub mod commands;

#[cfg(test)]
pub(crate) mod testing;

// Re-export core config for convenience
pub use core::Config;

pub use features::{
    EscalationPolicy, Locale, ReminderScheduler, ReminderStore, StatsEvent, StatsKind,
    StatsRecorder, SystemClock, Texts,
};
pub use gateway::{DiscordGateway, NotificationGateway};
