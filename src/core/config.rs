//! # Configuration
//!
//! Bot configuration loaded once at startup from a JSON (or YAML) file plus
//! environment overrides. Read-only for the lifetime of the process.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: YAML config files, aliases for the legacy key names
//! - 1.1.0: Validation of generated command names
//! - 1.0.0: Initial release

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::ConfigError;
use crate::features::locale::{Locale, Texts};

/// Discord's rule for slash command names
const COMMAND_NAME_PATTERN: &str = r"^[-_a-z0-9]{1,32}$";

/// Upper bound for wait times and nudge intervals (one year)
pub const MAX_MINUTES: u64 = 60 * 24 * 365;

/// One configured machine and its reminder command
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderCommandDef {
    /// Unique machine key, stored as `machineType` in persisted reminders
    pub id: String,

    /// Display name per locale
    pub name: HashMap<Locale, String>,

    /// Suffix appended to the start/status/stop verbs
    #[serde(alias = "commandPost")]
    pub command_suffix: HashMap<Locale, String>,

    /// Minutes until the machine is done
    pub wait_time_in_min: u64,
}

impl ReminderCommandDef {
    /// `None` if the wait does not fit a `chrono::Duration`
    pub fn wait_duration(&self) -> Option<chrono::Duration> {
        i64::try_from(self.wait_time_in_min)
            .ok()
            .and_then(chrono::Duration::try_minutes)
    }

    /// Display name for `locale`, falling back to the id
    pub fn display_name(&self, locale: Locale) -> &str {
        self.name.get(&locale).map(String::as_str).unwrap_or(&self.id)
    }

    /// Command suffix for `locale`, falling back to the id
    pub fn suffix(&self, locale: Locale) -> &str {
        self.command_suffix
            .get(&locale)
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

/// Settings taken from the environment rather than the config file
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub config_path: PathBuf,
    pub reminders_path: PathBuf,
    pub stats_path: PathBuf,
    /// Register commands for a single guild (instant update) instead of globally
    pub discord_guild_id: Option<u64>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config.json"),
            reminders_path: PathBuf::from("reminders.json"),
            stats_path: PathBuf::from("stats.json"),
            discord_guild_id: None,
            log_level: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let path_var = |name: &str, default: PathBuf| {
            std::env::var(name).map(PathBuf::from).unwrap_or(default)
        };

        let discord_guild_id = match std::env::var("DISCORD_GUILD_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("DISCORD_GUILD_ID is not a valid id: {raw}"))
            })?),
            _ => None,
        };

        Ok(Self {
            config_path: path_var("CONFIG_PATH", defaults.config_path),
            reminders_path: path_var("REMINDERS_PATH", defaults.reminders_path),
            stats_path: path_var("STATS_PATH", defaults.stats_path),
            discord_guild_id,
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Bot token. `DISCORD_TOKEN` overrides the file value.
    #[serde(default, alias = "discordToken", alias = "telegramToken")]
    pub token: String,

    /// Nudges sent after the due notice before giving up; 0 disables escalation
    #[serde(default)]
    pub require_reply_number_of_reminder_messages: u32,

    #[serde(default = "default_interval_minutes")]
    pub require_reply_time_between_reminder_messages_in_min: u64,

    #[serde(alias = "endUserLanguage")]
    pub locale: Locale,

    pub reminder_commands: Vec<ReminderCommandDef>,

    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

fn default_interval_minutes() -> u64 {
    10
}

impl Config {
    /// Load from the environment: `.env` must already be applied by the caller
    pub fn from_env() -> Result<Self, ConfigError> {
        let runtime = RuntimeConfig::from_env()?;
        let mut config = Self::load(&runtime.config_path)?;

        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.trim().is_empty() {
                config.token = token.trim().to_string();
            }
        }
        if config.token.is_empty() {
            return Err(ConfigError::MissingEnv("DISCORD_TOKEN"));
        }

        config.runtime = runtime;
        Ok(config)
    }

    /// Load and validate a config file; `.yaml`/`.yml` files are parsed as YAML
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
                example: path.with_file_name("example.config.json"),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            Self::parse_yaml(&contents)?
        } else {
            Self::parse_json(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn parse_json(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn parse_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reminder_commands.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one reminder command must be configured".to_string(),
            ));
        }

        let interval = self.require_reply_time_between_reminder_messages_in_min;
        if self.require_reply_number_of_reminder_messages > 0 && interval == 0 {
            return Err(ConfigError::Invalid(
                "requireReplyTimeBetweenReminderMessagesInMin must be greater than 0".to_string(),
            ));
        }
        if interval > MAX_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "requireReplyTimeBetweenReminderMessagesInMin must be at most {MAX_MINUTES}"
            )));
        }

        let name_pattern = Regex::new(COMMAND_NAME_PATTERN)
            .map_err(|e| ConfigError::Invalid(format!("Invalid command name pattern: {e}")))?;
        let texts = Texts::new(self.locale);
        let mut ids = HashSet::new();
        let mut command_names = HashSet::from([texts.help_command()]);

        for machine in &self.reminder_commands {
            if !ids.insert(machine.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate machine id: {}",
                    machine.id
                )));
            }

            if machine.wait_time_in_min == 0 || machine.wait_time_in_min > MAX_MINUTES {
                return Err(ConfigError::Invalid(format!(
                    "Machine {} must wait between 1 and {MAX_MINUTES} minutes",
                    machine.id
                )));
            }

            if !machine.name.contains_key(&self.locale) {
                return Err(ConfigError::MissingLocaleText {
                    machine: machine.id.clone(),
                    field: "name",
                    locale: self.locale,
                });
            }
            if !machine.command_suffix.contains_key(&self.locale) {
                return Err(ConfigError::MissingLocaleText {
                    machine: machine.id.clone(),
                    field: "commandSuffix",
                    locale: self.locale,
                });
            }

            let names = texts.command_names(machine);
            for name in [names.start, names.status, names.stop] {
                if !name_pattern.is_match(&name) {
                    return Err(ConfigError::Invalid(format!(
                        "Command name must be lowercase and at most 32 chars: {name}"
                    )));
                }
                if !command_names.insert(name.clone()) {
                    return Err(ConfigError::Invalid(format!(
                        "Command name used twice: {name}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Interval between nudges, capped at [`MAX_MINUTES`]
    pub fn reply_interval(&self) -> Duration {
        let minutes = self
            .require_reply_time_between_reminder_messages_in_min
            .min(MAX_MINUTES);
        Duration::from_secs(minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_JSON: &str = r#"{
        "token": "abc",
        "requireReplyNumberOfReminderMessages": 2,
        "requireReplyTimeBetweenReminderMessagesInMin": 10,
        "locale": "de",
        "reminderCommands": [
            {
                "id": "washer",
                "name": { "de": "Waschmaschine", "en": "Washing machine" },
                "commandSuffix": { "de": "waesche", "en": "laundry" },
                "waitTimeInMin": 30
            }
        ]
    }"#;

    #[test]
    fn test_parse_json_config() {
        let config = Config::parse_json(CONFIG_JSON).unwrap();
        config.validate().unwrap();

        assert_eq!(config.token, "abc");
        assert_eq!(config.locale, Locale::De);
        assert_eq!(config.require_reply_number_of_reminder_messages, 2);
        assert_eq!(config.reply_interval(), Duration::from_secs(600));
        let washer = &config.reminder_commands[0];
        assert_eq!(washer.wait_duration(), Some(chrono::Duration::minutes(30)));
        assert_eq!(washer.display_name(Locale::De), "Waschmaschine");
        assert_eq!(config.reminder_commands.len(), 1);
    }

    #[test]
    fn test_parse_legacy_key_names() {
        let json = r#"{
            "telegramToken": "legacy",
            "requireReplyNumberOfReminderMessages": 0,
            "requireReplyTimeBetweenReminderMessagesInMin": 5,
            "endUserLanguage": "de",
            "reminderCommands": [
                {
                    "id": "dryer",
                    "name": { "de": "Trockner" },
                    "commandPost": { "de": "trockner" },
                    "waitTimeInMin": 45
                }
            ]
        }"#;
        let config = Config::parse_json(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.token, "legacy");
        assert_eq!(config.reminder_commands[0].suffix(Locale::De), "trockner");
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
locale: en
requireReplyNumberOfReminderMessages: 1
reminderCommands:
  - id: dishwasher
    name:
      en: Dishwasher
    commandSuffix:
      en: dishes
    waitTimeInMin: 90
"#;
        let config = Config::parse_yaml(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.require_reply_time_between_reminder_messages_in_min, 10);
        assert!(config.token.is_empty());
    }

    #[test]
    fn test_unsupported_locale_is_rejected() {
        let json = CONFIG_JSON.replace("\"locale\": \"de\"", "\"locale\": \"fr\"");
        assert!(matches!(
            Config::parse_json(&json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_locale_text_is_rejected() {
        let mut config = Config::parse_json(CONFIG_JSON).unwrap();
        config.locale = Locale::En;
        config.reminder_commands[0].name.remove(&Locale::En);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingLocaleText { field: "name", .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut config = Config::parse_json(CONFIG_JSON).unwrap();
        let copy = config.reminder_commands[0].clone();
        config.reminder_commands.push(copy);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_command_suffix_is_rejected() {
        let mut config = Config::parse_json(CONFIG_JSON).unwrap();
        config.reminder_commands[0]
            .command_suffix
            .insert(Locale::De, "Wäsche Maschine".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_with_escalation_is_rejected() {
        let mut config = Config::parse_json(CONFIG_JSON).unwrap();
        config.require_reply_time_between_reminder_messages_in_min = 0;
        assert!(config.validate().is_err());

        config.require_reply_number_of_reminder_messages = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_reports_example() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("config.json")).unwrap_err();
        assert!(err.to_string().contains("example.config.json"));
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = Config::parse_json(include_str!("../../example.config.json")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.locale, Locale::De);
        assert_eq!(config.reminder_commands[1].id, "dryer");
        assert_eq!(config.reminder_commands[1].wait_time_in_min, 90);
    }

    #[test]
    fn test_rejects_wait_beyond_one_year() {
        let mut config = Config::parse_json(CONFIG_JSON).unwrap();
        config.reminder_commands[0].wait_time_in_min = MAX_MINUTES;
        assert!(config.validate().is_ok());

        config.reminder_commands[0].wait_time_in_min = 1_000_000_000_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.reminder_commands[0].wait_time_in_min = u64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_huge_wait_has_no_duration() {
        let mut config = Config::parse_json(CONFIG_JSON).unwrap();
        let washer = &mut config.reminder_commands[0];
        washer.wait_time_in_min = u64::MAX;
        assert_eq!(washer.wait_duration(), None);
        washer.wait_time_in_min = 1_000_000_000_000_000;
        assert_eq!(washer.wait_duration(), None);
    }

    #[test]
    fn test_rejects_interval_beyond_one_year() {
        let mut config = Config::parse_json(CONFIG_JSON).unwrap();
        config.require_reply_time_between_reminder_messages_in_min = u64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        // Never overflows, even unvalidated
        assert_eq!(
            config.reply_interval(),
            Duration::from_secs(MAX_MINUTES * 60)
        );
    }
}
