//! # Reminders Feature
//!
//! Durable per-machine reminders with optional escalation until someone
//! acknowledges the due notice.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

pub mod clock;
pub mod escalation;
pub mod scheduler;
pub mod store;

pub use clock::{spawn_after, Clock, SystemClock, TimerHandle};
pub use escalation::{EscalationController, EscalationOutcome, EscalationPolicy, EscalationState};
pub use scheduler::{ReminderScheduler, ReminderStatus, RestoreSummary, StartOutcome, StopOutcome};
pub use store::{Reminder, ReminderStore, ReminderToken};
