//! # Feature: Locale Texts
//!
//! End-user text for every message the bot sends, in German and English.
//! Command names are built from a per-locale verb and the machine's suffix.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: English texts
//! - 1.0.0: German texts

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::ReminderCommandDef;

/// End-user language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "de")]
    De,
    #[serde(rename = "en")]
    En,
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locale::De => write!(f, "de"),
            Locale::En => write!(f, "en"),
        }
    }
}

/// The three slash command names generated for one machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineCommands {
    pub start: String,
    pub status: String,
    pub stop: String,
}

/// Message templates for one locale
#[derive(Debug, Clone, Copy)]
pub struct Texts {
    locale: Locale,
}

impl Texts {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn help_command(&self) -> String {
        match self.locale {
            Locale::De => "hilfe".to_string(),
            Locale::En => "help".to_string(),
        }
    }

    pub fn command_names(&self, machine: &ReminderCommandDef) -> MachineCommands {
        let suffix = machine.suffix(self.locale);
        let (start, status, stop) = match self.locale {
            Locale::De => ("starte", "status", "stoppe"),
            Locale::En => ("start", "status", "stop"),
        };
        MachineCommands {
            start: format!("{start}{suffix}"),
            status: format!("{status}{suffix}"),
            stop: format!("{stop}{suffix}"),
        }
    }

    fn time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&Local).format("%H:%M:%S").to_string()
    }

    fn date_time(&self, at: DateTime<Utc>) -> String {
        let local = at.with_timezone(&Local);
        match self.locale {
            Locale::De => local.format("%d.%m.%Y, %H:%M:%S").to_string(),
            Locale::En => local.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    // Slash command descriptions

    pub fn start_description(&self, machine: &ReminderCommandDef) -> String {
        match self.locale {
            Locale::De => format!("Erinnere in {} Minuten", machine.wait_time_in_min),
            Locale::En => format!("Remind me in {} minutes", machine.wait_time_in_min),
        }
    }

    pub fn stop_description(&self) -> &'static str {
        match self.locale {
            Locale::De => "Stoppe die Erinnerung",
            Locale::En => "Stop the reminder",
        }
    }

    pub fn status_description(&self) -> &'static str {
        match self.locale {
            Locale::De => "Status der Erinnerung",
            Locale::En => "Reminder status",
        }
    }

    pub fn help_description(&self) -> &'static str {
        match self.locale {
            Locale::De => "Befehl und Bot Hilfe",
            Locale::En => "Command and bot help",
        }
    }

    // Command responses

    pub fn start_confirmation(
        &self,
        machine: &ReminderCommandDef,
        user_name: &str,
        ready_at: DateTime<Utc>,
        started_count: usize,
    ) -> String {
        let name = machine.display_name(self.locale);
        let wait = machine.wait_time_in_min;
        let ready = self.time(ready_at);
        match self.locale {
            Locale::De => format!(
                "{name} wurde gestartet\n(Ist in {wait} Minuten fertig - {ready})\n_{user_name} hat {name} schon {started_count} mal gestartet_"
            ),
            Locale::En => format!(
                "{name} was started\n(Ready in {wait} minutes - {ready})\n_{user_name} has started {name} {started_count} times_"
            ),
        }
    }

    pub fn status_found(
        &self,
        machine: &ReminderCommandDef,
        started_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> String {
        let name = machine.display_name(self.locale);
        let start = self.time(started_at);
        let end = self.time(ends_at);
        match self.locale {
            Locale::De => format!(
                "Es wurde eine Erinnerung bezüglich {name} gefunden:\nSie wurde um {start} Uhr gestartet und endet um {end} Uhr"
            ),
            Locale::En => format!(
                "Found a reminder for {name}:\nIt was started at {start} and ends at {end}"
            ),
        }
    }

    pub fn not_found(&self, machine: &ReminderCommandDef) -> String {
        let name = machine.display_name(self.locale);
        match self.locale {
            Locale::De => format!("Es wurde aktuell keine Erinnerung bezüglich {name} gefunden"),
            Locale::En => format!("There is currently no reminder for {name}"),
        }
    }

    pub fn stopped(&self, machine: &ReminderCommandDef, started_at: DateTime<Utc>) -> String {
        let name = machine.display_name(self.locale);
        let start = self.time(started_at);
        match self.locale {
            Locale::De => format!(
                "Die Erinnerung bezüglich {name} (gestartet um {start} Uhr) wurde gestoppt"
            ),
            Locale::En => format!("The reminder for {name} (started at {start}) was stopped"),
        }
    }

    // Reminder lifecycle notices

    pub fn due_notice(&self, machine: &ReminderCommandDef, reply_required: bool) -> String {
        let name = machine.display_name(self.locale);
        let mut text = match self.locale {
            Locale::De => format!("{name} ist fertig"),
            Locale::En => format!("{name} is done"),
        };
        if reply_required {
            text.push_str(match self.locale {
                Locale::De => "\nWenn Zeit bitte dieser Nachricht antworten",
                Locale::En => "\nPlease reply to this message when you take care of it",
            });
        }
        text
    }

    pub fn nudge(&self, machine: &ReminderCommandDef, attempt: u32) -> String {
        let name = machine.display_name(self.locale);
        match self.locale {
            Locale::De => format!("Wie sieht es jetzt aus bezüglich: {name}???\n(Versuch #{attempt})"),
            Locale::En => format!("What about {name} now???\n(Attempt #{attempt})"),
        }
    }

    pub fn give_up(&self) -> &'static str {
        match self.locale {
            Locale::De => "Ich gebe es auf darauf aufmerksam zu machen, weil niemand reagiert :(",
            Locale::En => "I give up reminding you, since nobody responds :(",
        }
    }

    pub fn acknowledged(
        &self,
        machine: &ReminderCommandDef,
        user_name: &str,
        accepted_count: usize,
    ) -> String {
        let name = machine.display_name(self.locale);
        match self.locale {
            Locale::De => format!(
                "{user_name} übernimmt {name}\n_{user_name} hat bezüglich {name} schon {accepted_count} mal geantwortet_"
            ),
            Locale::En => format!(
                "{user_name} takes care of {name}\n_{user_name} has answered {accepted_count} times_"
            ),
        }
    }

    pub fn help(
        &self,
        machines: &[ReminderCommandDef],
        host_name: &str,
        running_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> String {
        let mut text = match self.locale {
            Locale::De => String::from("Es gibt die folgenden Befehle:\n"),
            Locale::En => String::from("The following commands are available:\n"),
        };

        for machine in machines {
            let names = self.command_names(machine);
            text.push_str(&format!(
                "\n**{}**:\n- /{}: _{}_\n- /{}: _{}_\n- /{}: _{}_\n",
                machine.display_name(self.locale),
                names.start,
                self.start_description(machine),
                names.stop,
                self.stop_description(),
                names.status,
                self.status_description(),
            ));
        }

        let days = (now - running_since).num_days().max(0);
        let since = self.date_time(running_since);
        text.push_str(&match self.locale {
            Locale::De => format!(
                "\n_Der Bot läuft aktuell auf '{host_name}' seit {since} ({days} Tage)_"
            ),
            Locale::En => format!("\n_The bot is running on '{host_name}' since {since} ({days} days)_"),
        });
        text
    }

    pub fn error_notice(&self) -> &'static str {
        match self.locale {
            Locale::De => "❌ Bei der Verarbeitung des Befehls ist ein Fehler aufgetreten.",
            Locale::En => "❌ Sorry, I encountered an error processing your command.",
        }
    }
}
