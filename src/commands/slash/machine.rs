//! Machine reminder slash commands

use serenity::builder::CreateApplicationCommand;

use crate::core::config::ReminderCommandDef;
use crate::features::locale::Texts;

/// Creates the start, status and stop commands for one machine
pub fn create_commands(machine: &ReminderCommandDef, texts: Texts) -> Vec<CreateApplicationCommand> {
    let names = texts.command_names(machine);
    let display_name = machine.display_name(texts.locale());
    vec![
        command(&names.start, &texts.start_description(machine), display_name),
        command(&names.status, texts.status_description(), display_name),
        command(&names.stop, texts.stop_description(), display_name),
    ]
}

fn command(name: &str, description: &str, display_name: &str) -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(name)
        .description(format!("{description} ({display_name})"))
        .to_owned()
}

/// Creates the help command
pub fn create_help_command(texts: Texts) -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(texts.help_command())
        .description(texts.help_description())
        .to_owned()
}
