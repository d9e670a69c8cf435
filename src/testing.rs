//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use crate::commands::CommandContext;
use crate::core::config::{Config, ReminderCommandDef, RuntimeConfig};
use crate::core::error::{ReminderError, ReminderResult};
use crate::core::ids::{ChatId, MessageId, UserId};
use crate::features::locale::Locale;
use crate::features::analytics::StatsRecorder;
use crate::features::reminders::{Clock, ReminderScheduler, ReminderStore};
use crate::gateway::{ListenerId, NotificationGateway, Reply, ReplyListeners, ReplySink};

/// Wall clock driven by tokio's (pausable) clock
pub struct TestClock {
    base: DateTime<Utc>,
    origin: Instant,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            base: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            origin: Instant::now(),
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + chrono::Duration::from_std(self.origin.elapsed()).unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub text: String,
    pub at: Instant,
}

/// Gateway that records sent messages and lets tests inject replies
pub struct FakeGateway {
    sent: Mutex<Vec<SentMessage>>,
    next_id: AtomicU64,
    listeners: ReplyListeners,
    fail_sends: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
            listeners: ReplyListeners::new(),
            fail_sends: AtomicBool::new(false),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Simulate `user_id` replying to `message_id`. Returns listeners notified.
    pub fn reply(&self, chat_id: ChatId, message_id: MessageId, user_id: UserId, name: &str) -> usize {
        self.listeners.dispatch(&Reply {
            chat_id,
            replied_to: message_id,
            user_id,
            user_name: name.to_string(),
        })
    }
}

#[async_trait]
impl NotificationGateway for FakeGateway {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> ReminderResult<MessageId> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ReminderError::Gateway("send failed".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(SentMessage {
            id,
            chat_id,
            text: text.to_string(),
            at: Instant::now(),
        });
        Ok(id)
    }

    fn on_reply(&self, chat_id: ChatId, message_id: MessageId, sink: ReplySink) -> ListenerId {
        self.listeners.register(chat_id, message_id, sink)
    }

    fn remove_reply_listener(&self, listener_id: ListenerId) -> bool {
        self.listeners.remove(listener_id)
    }
}

/// A machine definition with German and English texts
pub fn machine(id: &str, wait_time_in_min: u64) -> ReminderCommandDef {
    let (de_name, de_suffix, en_name, en_suffix) = match id {
        "washer" => ("Waschmaschine", "waesche", "Washing machine", "laundry"),
        "dryer" => ("Trockner", "trockner", "Dryer", "dryer"),
        other => (other, other, other, other),
    };
    ReminderCommandDef {
        id: id.to_string(),
        name: HashMap::from([
            (Locale::De, de_name.to_string()),
            (Locale::En, en_name.to_string()),
        ]),
        command_suffix: HashMap::from([
            (Locale::De, de_suffix.to_string()),
            (Locale::En, en_suffix.to_string()),
        ]),
        wait_time_in_min,
    }
}

/// English config with a 30 min washer and a 45 min dryer, 10 min between nudges
pub fn test_config(max_attempts: u32) -> Config {
    Config {
        token: "test-token".to_string(),
        require_reply_number_of_reminder_messages: max_attempts,
        require_reply_time_between_reminder_messages_in_min: 10,
        locale: Locale::En,
        reminder_commands: vec![machine("washer", 30), machine("dryer", 45)],
        runtime: RuntimeConfig::default(),
    }
}

/// Command context over temp files and a fake gateway
pub async fn command_context(
    max_attempts: u32,
) -> (Arc<CommandContext>, Arc<FakeGateway>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(max_attempts));
    let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
    let store = Arc::new(
        ReminderStore::open(dir.path().join("reminders.json"))
            .await
            .unwrap(),
    );
    let stats = Arc::new(
        StatsRecorder::open(dir.path().join("stats.json"), clock.clone())
            .await
            .unwrap(),
    );
    let gateway = Arc::new(FakeGateway::new());
    let scheduler =
        ReminderScheduler::from_config(&config, store, stats.clone(), gateway.clone(), clock.clone());
    let ctx = CommandContext::new(config, scheduler, stats, clock);
    (Arc::new(ctx), gateway, dir)
}
