//! Shared context for command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::core::config::Config;
use crate::features::analytics::StatsRecorder;
use crate::features::locale::Texts;
use crate::features::reminders::{Clock, ReminderScheduler};

/// Everything a command handler needs: the scheduler, the stats ledger,
/// the configured texts and the bot's uptime info for `/help`.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Arc<Config>,
    pub scheduler: ReminderScheduler,
    pub stats: Arc<StatsRecorder>,
    pub texts: Texts,
    pub clock: Arc<dyn Clock>,
    pub start_time: DateTime<Utc>,
    pub host_name: String,
}

impl CommandContext {
    pub fn new(
        config: Arc<Config>,
        scheduler: ReminderScheduler,
        stats: Arc<StatsRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let host_name = sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string());
        Self {
            texts: Texts::new(config.locale),
            start_time: clock.now(),
            config,
            scheduler,
            stats,
            clock,
            host_name,
        }
    }
}
