//! Identifier types shared by the store, the stats ledger and the gateway.

/// Chat a reminder belongs to (a Discord channel id for the bundled gateway)
pub type ChatId = u64;

/// User that issued a command or replied to a notice
pub type UserId = u64;

/// Message id returned by the gateway when a notice is sent
pub type MessageId = u64;

/// Uniqueness key of an active reminder: one per chat and machine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReminderKey {
    pub chat_id: ChatId,
    pub machine_type: String,
}

impl ReminderKey {
    pub fn new(chat_id: ChatId, machine_type: &str) -> Self {
        Self {
            chat_id,
            machine_type: machine_type.to_string(),
        }
    }
}

impl std::fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chat={} machine={}", self.chat_id, self.machine_type)
    }
}
