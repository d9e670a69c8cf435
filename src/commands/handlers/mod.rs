//! Per-command handler implementations
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

pub mod help;
pub mod machine;

use std::sync::Arc;

use super::handler::SlashCommandHandler;
use crate::core::config::Config;
use crate::features::locale::Texts;

pub use help::HelpHandler;
pub use machine::{MachineAction, MachineHandler};

/// Create all command handlers: one per configured machine plus help
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
pub fn create_all_handlers(config: &Config) -> Vec<Arc<dyn SlashCommandHandler>> {
    let texts = Texts::new(config.locale);
    let mut handlers: Vec<Arc<dyn SlashCommandHandler>> = config
        .reminder_commands
        .iter()
        .map(|machine| {
            Arc::new(MachineHandler::new(machine.clone(), texts)) as Arc<dyn SlashCommandHandler>
        })
        .collect();
    handlers.push(Arc::new(HelpHandler::new(texts)));
    handlers
}
