//! Discord implementation of the notification gateway.
//!
//! A chat is a Discord channel. Replies are Discord message replies: the
//! bot's `message` event hands every message with a reference to
//! [`DiscordGateway::handle_message`].

use async_trait::async_trait;
use log::debug;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::id::ChannelId;
use std::sync::Arc;

use super::{ListenerId, NotificationGateway, Reply, ReplyListeners, ReplySink};
use crate::core::error::{ReminderError, ReminderResult};
use crate::core::ids::{ChatId, MessageId};

#[derive(Clone)]
pub struct DiscordGateway {
    http: Arc<Http>,
    listeners: ReplyListeners,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            listeners: ReplyListeners::new(),
        }
    }

    /// Convert a Discord message into a reply, if it replies to another message
    pub fn reply_from_message(msg: &Message) -> Option<Reply> {
        let replied_to = msg
            .message_reference
            .as_ref()
            .and_then(|r| r.message_id)
            .or_else(|| msg.referenced_message.as_ref().map(|m| m.id))?;

        Some(Reply {
            chat_id: msg.channel_id.0,
            replied_to: replied_to.0,
            user_id: msg.author.id.0,
            user_name: msg.author.name.clone(),
        })
    }

    /// Dispatch an incoming message to reply listeners. Returns the number notified.
    pub fn handle_message(&self, msg: &Message) -> usize {
        let Some(reply) = Self::reply_from_message(msg) else {
            return 0;
        };
        let delivered = self.listeners.dispatch(&reply);
        if delivered > 0 {
            debug!(
                "Reply from {} to message {} delivered to {delivered} listener(s)",
                reply.user_id, reply.replied_to
            );
        }
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[async_trait]
impl NotificationGateway for DiscordGateway {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> ReminderResult<MessageId> {
        let message = ChannelId(chat_id)
            .say(&self.http, text)
            .await
            .map_err(|e| ReminderError::Gateway(e.to_string()))?;
        Ok(message.id.0)
    }

    fn on_reply(&self, chat_id: ChatId, message_id: MessageId, sink: ReplySink) -> ListenerId {
        self.listeners.register(chat_id, message_id, sink)
    }

    fn remove_reply_listener(&self, listener_id: ListenerId) -> bool {
        self.listeners.remove(listener_id)
    }
}
