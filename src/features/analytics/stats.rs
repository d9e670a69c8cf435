//! # Feature: Usage Statistics
//!
//! Append-only ledger of who started, stopped and accepted which machine,
//! grouped per chat and per user. The whole ledger is rewritten after
//! every append.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: A failed append also drops the chat or user entry it created
//! - 1.1.0: `accepted` entries always carry the attempt number
//! - 1.0.0: Initial release

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::error::ReminderResult;
use crate::core::ids::{ChatId, UserId};
use crate::core::snapshot::{ensure_json_list, load_json, write_json_atomic};
use crate::features::reminders::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineEvent {
    pub date: DateTime<Utc>,
    pub machine_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedEvent {
    pub date: DateTime<Utc>,
    pub machine_type: String,
    /// Nudges sent before the reply
    #[serde(alias = "try")]
    pub attempt_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: UserId,
    #[serde(default)]
    pub started: Vec<MachineEvent>,
    #[serde(default)]
    pub accepted: Vec<AcceptedEvent>,
    #[serde(default)]
    pub stopped: Vec<MachineEvent>,
}

impl UserStats {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            started: Vec::new(),
            accepted: Vec::new(),
            stopped: Vec::new(),
        }
    }

    pub fn count(&self, kind: StatsKind) -> usize {
        match kind {
            StatsKind::Started => self.started.len(),
            StatsKind::Stopped => self.stopped.len(),
            StatsKind::Accepted => self.accepted.len(),
        }
    }

    fn append(&mut self, date: DateTime<Utc>, machine_type: &str, event: StatsEvent) {
        let machine_type = machine_type.to_string();
        match event {
            StatsEvent::Started => self.started.push(MachineEvent { date, machine_type }),
            StatsEvent::Stopped => self.stopped.push(MachineEvent { date, machine_type }),
            StatsEvent::Accepted { attempt } => self.accepted.push(AcceptedEvent {
                date,
                machine_type,
                attempt_number: attempt,
            }),
        }
    }

    fn undo(&mut self, kind: StatsKind) {
        match kind {
            StatsKind::Started => {
                self.started.pop();
            }
            StatsKind::Stopped => {
                self.stopped.pop();
            }
            StatsKind::Accepted => {
                self.accepted.pop();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStats {
    pub chat_id: ChatId,
    #[serde(default)]
    pub user_stats: Vec<UserStats>,
}

/// Something worth counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsEvent {
    Started,
    Stopped,
    Accepted { attempt: u32 },
}

impl StatsEvent {
    pub fn kind(&self) -> StatsKind {
        match self {
            StatsEvent::Started => StatsKind::Started,
            StatsEvent::Stopped => StatsKind::Stopped,
            StatsEvent::Accepted { .. } => StatsKind::Accepted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsKind {
    Started,
    Stopped,
    Accepted,
}

pub struct StatsRecorder {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    chats: Mutex<Vec<ChatStats>>,
}

impl StatsRecorder {
    /// Open the stats file, creating an empty one if missing
    pub async fn open(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> ReminderResult<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_json_list(&path).await?;
        let chats: Vec<ChatStats> = load_json(&path).await?;
        info!(
            "Loaded stats for {} chat(s) from {}",
            chats.len(),
            path.display()
        );
        Ok(Self {
            path,
            clock,
            chats: Mutex::new(chats),
        })
    }

    /// Append an event and persist. Returns the user's new count for that kind.
    ///
    /// If the write fails the append is undone, together with any chat or
    /// user entry created for it.
    pub async fn record(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        machine_type: &str,
        event: StatsEvent,
    ) -> ReminderResult<usize> {
        let mut chats = self.chats.lock().await;
        let mut created_chat = false;
        let mut created_user = false;
        let chat_index = match chats.iter().position(|c| c.chat_id == chat_id) {
            Some(index) => index,
            None => {
                info!("No stats for chat {chat_id} yet, creating entry");
                chats.push(ChatStats {
                    chat_id,
                    user_stats: Vec::new(),
                });
                created_chat = true;
                chats.len() - 1
            }
        };

        let users = &mut chats[chat_index].user_stats;
        let user_index = match users.iter().position(|u| u.user_id == user_id) {
            Some(index) => index,
            None => {
                info!("No stats for user {user_id} in chat {chat_id} yet, creating entry");
                users.push(UserStats::new(user_id));
                created_user = true;
                users.len() - 1
            }
        };

        let kind = event.kind();
        users[user_index].append(self.clock.now(), machine_type, event);
        let count = users[user_index].count(kind);

        if let Err(e) = write_json_atomic(&self.path, chats.as_slice()).await {
            if created_chat {
                chats.remove(chat_index);
            } else if created_user {
                chats[chat_index].user_stats.remove(user_index);
            } else {
                chats[chat_index].user_stats[user_index].undo(kind);
            }
            return Err(e);
        }
        Ok(count)
    }

    pub async fn count_of(&self, chat_id: ChatId, user_id: UserId, kind: StatsKind) -> usize {
        self.user_stats(chat_id, user_id)
            .await
            .map(|u| u.count(kind))
            .unwrap_or(0)
    }

    pub async fn user_stats(&self, chat_id: ChatId, user_id: UserId) -> Option<UserStats> {
        self.chats
            .lock()
            .await
            .iter()
            .find(|c| c.chat_id == chat_id)
            .and_then(|c| c.user_stats.iter().find(|u| u.user_id == user_id))
            .cloned()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestClock;

    async fn open(dir: &tempfile::TempDir) -> StatsRecorder {
        StatsRecorder::open(dir.path().join("stats.json"), Arc::new(TestClock::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_record_counts_grow_by_one() {
        let dir = tempfile::tempdir().unwrap();
        let stats = open(&dir).await;

        assert_eq!(stats.count_of(1, 7, StatsKind::Started).await, 0);
        assert_eq!(stats.record(1, 7, "washer", StatsEvent::Started).await.unwrap(), 1);
        assert_eq!(stats.record(1, 7, "dryer", StatsEvent::Started).await.unwrap(), 2);
        assert_eq!(stats.record(1, 7, "washer", StatsEvent::Stopped).await.unwrap(), 1);

        assert_eq!(stats.count_of(1, 7, StatsKind::Started).await, 2);
        assert_eq!(stats.count_of(1, 7, StatsKind::Stopped).await, 1);
        assert_eq!(stats.count_of(1, 7, StatsKind::Accepted).await, 0);
        // Other users and chats are independent
        assert_eq!(stats.count_of(1, 8, StatsKind::Started).await, 0);
        assert_eq!(stats.count_of(2, 7, StatsKind::Started).await, 0);
    }

    #[tokio::test]
    async fn test_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let stats = open(&dir).await;
            stats.record(1, 7, "washer", StatsEvent::Started).await.unwrap();
            stats
                .record(1, 7, "washer", StatsEvent::Accepted { attempt: 2 })
                .await
                .unwrap();
            stats.record(3, 9, "dryer", StatsEvent::Stopped).await.unwrap();
        }

        let stats = open(&dir).await;
        let user = stats.user_stats(1, 7).await.unwrap();
        assert_eq!(user.started.len(), 1);
        assert_eq!(user.accepted[0].attempt_number, 2);
        assert_eq!(user.accepted[0].machine_type, "washer");
        assert_eq!(stats.count_of(3, 9, StatsKind::Stopped).await, 1);
    }

    #[tokio::test]
    async fn test_file_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let stats = open(&dir).await;
        stats
            .record(5, 6, "washer", StatsEvent::Accepted { attempt: 0 })
            .await
            .unwrap();

        let raw = std::fs::read_to_string(stats.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["chatId"], 5);
        assert_eq!(json[0]["userStats"][0]["userId"], 6);
        assert_eq!(json[0]["userStats"][0]["accepted"][0]["attemptNumber"], 0);
        assert_eq!(json[0]["userStats"][0]["accepted"][0]["machineType"], "washer");
    }

    #[tokio::test]
    async fn test_reads_legacy_try_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(
            &path,
            r#"[{"chatId":1,"userStats":[{"userId":7,"started":[],"stopped":[],
                "accepted":[{"date":"2024-05-01T10:00:00Z","machineType":"washer","try":3}]}]}]"#,
        )
        .unwrap();

        let stats = StatsRecorder::open(&path, Arc::new(TestClock::new()))
            .await
            .unwrap();
        let user = stats.user_stats(1, 7).await.unwrap();
        assert_eq!(user.accepted[0].attempt_number, 3);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_count() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let stats = StatsRecorder::open(data_dir.join("stats.json"), Arc::new(TestClock::new()))
            .await
            .unwrap();
        stats.record(1, 7, "washer", StatsEvent::Started).await.unwrap();

        std::fs::remove_dir_all(&data_dir).unwrap();
        assert!(stats.record(1, 7, "washer", StatsEvent::Started).await.is_err());
        assert_eq!(stats.count_of(1, 7, StatsKind::Started).await, 1);
    }

    #[tokio::test]
    async fn test_failed_first_record_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let path = data_dir.join("stats.json");
        let stats = StatsRecorder::open(&path, Arc::new(TestClock::new()))
            .await
            .unwrap();
        stats.record(1, 7, "washer", StatsEvent::Started).await.unwrap();

        std::fs::remove_dir_all(&data_dir).unwrap();
        // New chat, then new user in a known chat
        assert!(stats.record(2, 8, "washer", StatsEvent::Started).await.is_err());
        assert!(stats.record(1, 9, "washer", StatsEvent::Started).await.is_err());
        assert!(stats.user_stats(2, 8).await.is_none());
        assert!(stats.user_stats(1, 9).await.is_none());

        std::fs::create_dir(&data_dir).unwrap();
        assert_eq!(stats.record(1, 7, "washer", StatsEvent::Started).await.unwrap(), 2);

        let reopened = StatsRecorder::open(&path, Arc::new(TestClock::new()))
            .await
            .unwrap();
        assert!(reopened.user_stats(2, 8).await.is_none());
        assert!(reopened.user_stats(1, 9).await.is_none());
        assert_eq!(reopened.count_of(1, 7, StatsKind::Started).await, 2);
    }
}
