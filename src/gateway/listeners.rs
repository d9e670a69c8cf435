//! Reply listener registry shared by gateway implementations.
//!
//! Listeners are keyed by id and matched on `(chat, replied-to message)`.
//! Registration and removal are synchronous so an acknowledged session can
//! drop all of its listeners before any other reply is dispatched.

use dashmap::DashMap;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use super::{ListenerId, Reply, ReplySink};
use crate::core::ids::{ChatId, MessageId};

struct Listener {
    chat_id: ChatId,
    message_id: MessageId,
    sink: ReplySink,
}

#[derive(Clone, Default)]
pub struct ReplyListeners {
    listeners: Arc<DashMap<ListenerId, Listener>>,
}

impl ReplyListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, chat_id: ChatId, message_id: MessageId, sink: ReplySink) -> ListenerId {
        let id = Uuid::new_v4();
        self.listeners.insert(
            id,
            Listener {
                chat_id,
                message_id,
                sink,
            },
        );
        debug!("Registered reply listener {id} for message {message_id} in chat {chat_id}");
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Deliver a reply to every listener watching the replied-to message.
    ///
    /// Returns the number of listeners that received it. Listeners whose
    /// receiver is gone are dropped.
    pub fn dispatch(&self, reply: &Reply) -> usize {
        let matching: Vec<(ListenerId, ReplySink)> = self
            .listeners
            .iter()
            .filter(|l| l.chat_id == reply.chat_id && l.message_id == reply.replied_to)
            .map(|l| (*l.key(), l.sink.clone()))
            .collect();

        let mut delivered = 0;
        for (id, sink) in matching {
            if sink.send(reply.clone()).is_ok() {
                delivered += 1;
            } else {
                self.listeners.remove(&id);
                debug!("Dropped reply listener {id} with closed receiver");
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn reply(chat_id: ChatId, replied_to: MessageId) -> Reply {
        Reply {
            chat_id,
            replied_to,
            user_id: 7,
            user_name: "Alex".to_string(),
        }
    }

    #[test]
    fn test_dispatch_matches_chat_and_message() {
        let listeners = ReplyListeners::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        listeners.register(1, 100, tx);

        assert_eq!(listeners.dispatch(&reply(1, 101)), 0);
        assert_eq!(listeners.dispatch(&reply(2, 100)), 0);
        assert_eq!(listeners.dispatch(&reply(1, 100)), 1);
        assert_eq!(rx.try_recv().unwrap().replied_to, 100);
    }

    #[test]
    fn test_remove_stops_delivery() {
        let listeners = ReplyListeners::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = listeners.register(1, 100, tx);

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        assert!(listeners.is_empty());
        assert_eq!(listeners.dispatch(&reply(1, 100)), 0);
    }

    #[test]
    fn test_closed_receiver_is_dropped() {
        let listeners = ReplyListeners::new();
        let (tx, rx) = mpsc::unbounded_channel();
        listeners.register(1, 100, tx);
        drop(rx);

        assert_eq!(listeners.dispatch(&reply(1, 100)), 0);
        assert_eq!(listeners.len(), 0);
    }
}
