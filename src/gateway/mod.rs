//! # Notification Gateway
//!
//! The minimal transport contract the reminder engine depends on: send a
//! message, observe replies to a given message, stop observing. The bundled
//! implementation talks to Discord through serenity.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod discord;
pub mod listeners;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::error::ReminderResult;
use crate::core::ids::{ChatId, MessageId, UserId};

pub use discord::DiscordGateway;
pub use listeners::ReplyListeners;

/// Identifier returned by [`NotificationGateway::on_reply`]
pub type ListenerId = Uuid;

/// Channel a registered listener forwards matching replies into
pub type ReplySink = mpsc::UnboundedSender<Reply>;

/// A user's reply to a message previously sent by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: ChatId,
    /// The message that was replied to
    pub replied_to: MessageId,
    pub user_id: UserId,
    pub user_name: String,
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Send `text` to the chat and return the new message's id
    async fn send_message(&self, chat_id: ChatId, text: &str) -> ReminderResult<MessageId>;

    /// Forward every reply to `message_id` in `chat_id` into `sink`
    fn on_reply(&self, chat_id: ChatId, message_id: MessageId, sink: ReplySink) -> ListenerId;

    /// Deregister a listener. Returns false if it was not registered.
    fn remove_reply_listener(&self, listener_id: ListenerId) -> bool;
}
