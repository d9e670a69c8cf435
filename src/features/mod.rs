//! # Features
//!
//! - `reminders`: store, scheduler and escalation of machine reminders
//! - `analytics`: usage statistics per chat and user
//! - `locale`: end-user texts

pub mod analytics;
pub mod locale;
pub mod reminders;

pub use analytics::{StatsEvent, StatsKind, StatsRecorder};
pub use locale::{Locale, Texts};
pub use reminders::{EscalationPolicy, ReminderScheduler, ReminderStore, SystemClock};
