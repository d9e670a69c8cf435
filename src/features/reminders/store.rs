//! # Reminder Store
//!
//! Durable set of active reminders, at most one per `(chat, machine)`.
//! Every mutation rewrites the whole reminder file before returning; a failed
//! write rolls the in-memory change back so memory and disk never diverge.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Tokens guard fired-removal against a replacement under the same key
//! - 1.0.0: Initial release

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::clock::TimerHandle;
use crate::core::error::{ReminderError, ReminderResult};
use crate::core::ids::{ChatId, ReminderKey};
use crate::core::snapshot::{ensure_json_list, load_json, write_json_atomic};

/// An active reminder, as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub chat_id: ChatId,
    pub machine_type: String,
    /// Timestamp of the triggering message, not of its processing
    #[serde(alias = "startDate")]
    pub start_time: DateTime<Utc>,
}

impl Reminder {
    pub fn new(chat_id: ChatId, machine_type: &str, start_time: DateTime<Utc>) -> Self {
        Self {
            chat_id,
            machine_type: machine_type.to_string(),
            start_time,
        }
    }

    pub fn key(&self) -> ReminderKey {
        ReminderKey::new(self.chat_id, &self.machine_type)
    }

    /// `None` if the due time is past the representable range
    pub fn due_at(&self, wait: chrono::Duration) -> Option<DateTime<Utc>> {
        self.start_time.checked_add_signed(wait)
    }

    fn matches(&self, key: &ReminderKey) -> bool {
        self.chat_id == key.chat_id && self.machine_type == key.machine_type
    }
}

/// Identifies one stored reminder instance; a replacement under the same key
/// gets a new token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReminderToken(Uuid);

impl ReminderToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug)]
struct Entry {
    token: ReminderToken,
    reminder: Reminder,
    timer: Option<TimerHandle>,
}

pub struct ReminderStore {
    path: PathBuf,
    entries: Mutex<Vec<Entry>>,
}

impl ReminderStore {
    /// Open the reminder file, creating an empty one if missing.
    ///
    /// Loaded reminders have no timer; the scheduler re-arms them.
    pub async fn open(path: impl AsRef<Path>) -> ReminderResult<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_json_list(&path).await?;
        let persisted: Vec<Reminder> = load_json(&path).await?;

        let mut entries: Vec<Entry> = Vec::with_capacity(persisted.len());
        for reminder in persisted {
            let key = reminder.key();
            if let Some(existing) = entries.iter_mut().find(|e| e.reminder.matches(&key)) {
                warn!("Duplicate persisted reminder ({key}), keeping the latest");
                existing.reminder = reminder;
                continue;
            }
            entries.push(Entry {
                token: ReminderToken::new(),
                reminder,
                timer: None,
            });
        }

        info!(
            "Loaded {} persisted reminder(s) from {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &[Entry]) -> ReminderResult<()> {
        let snapshot: Vec<&Reminder> = entries.iter().map(|e| &e.reminder).collect();
        write_json_atomic(&self.path, &snapshot).await
    }

    /// Store a new reminder. Fails with `AlreadyActive` if the key is taken.
    pub async fn add(&self, reminder: Reminder) -> ReminderResult<ReminderToken> {
        let mut entries = self.entries.lock().await;
        let key = reminder.key();
        if entries.iter().any(|e| e.reminder.matches(&key)) {
            return Err(ReminderError::AlreadyActive {
                chat_id: key.chat_id,
                machine_type: key.machine_type,
            });
        }

        let token = ReminderToken::new();
        entries.push(Entry {
            token,
            reminder,
            timer: None,
        });
        if let Err(e) = self.persist(&entries).await {
            entries.pop();
            return Err(e);
        }

        info!("Added reminder ({key})");
        Ok(token)
    }

    /// Attach the armed timer to a stored reminder. Not persisted.
    ///
    /// Returns false if the reminder is gone or was replaced.
    pub async fn attach_timer(
        &self,
        key: &ReminderKey,
        token: ReminderToken,
        timer: TimerHandle,
    ) -> bool {
        let mut entries = self.entries.lock().await;
        match entries
            .iter_mut()
            .find(|e| e.token == token && e.reminder.matches(key))
        {
            Some(entry) => {
                entry.timer = Some(timer);
                true
            }
            None => false,
        }
    }

    /// Cancel and remove the reminder for `(chat, machine)`.
    ///
    /// Returns false (with a warning) if none is active.
    pub async fn remove(&self, chat_id: ChatId, machine_type: &str) -> ReminderResult<bool> {
        let key = ReminderKey::new(chat_id, machine_type);
        let mut entries = self.entries.lock().await;
        let Some(index) = entries.iter().position(|e| e.reminder.matches(&key)) else {
            warn!("Running reminder was not found ({key})");
            return Ok(false);
        };

        let entry = entries.remove(index);
        if let Err(e) = self.persist(&entries).await {
            entries.insert(index, entry);
            return Err(e);
        }
        if let Some(timer) = &entry.timer {
            timer.cancel();
        }

        info!("Removed reminder ({key})");
        Ok(true)
    }

    /// Remove a reminder whose timer is firing right now.
    ///
    /// The timer is not cancelled since the caller runs inside it. Returns
    /// `None` if the reminder was already removed or replaced.
    pub async fn take_fired(
        &self,
        key: &ReminderKey,
        token: ReminderToken,
    ) -> ReminderResult<Option<Reminder>> {
        let mut entries = self.entries.lock().await;
        let Some(index) = entries
            .iter()
            .position(|e| e.token == token && e.reminder.matches(key))
        else {
            return Ok(None);
        };

        let entry = entries.remove(index);
        if let Err(e) = self.persist(&entries).await {
            entries.insert(index, entry);
            return Err(e);
        }
        Ok(Some(entry.reminder))
    }

    pub async fn find(&self, chat_id: ChatId, machine_type: &str) -> Option<Reminder> {
        let key = ReminderKey::new(chat_id, machine_type);
        self.entries
            .lock()
            .await
            .iter()
            .find(|e| e.reminder.matches(&key))
            .map(|e| e.reminder.clone())
    }

    /// Every active reminder in insertion order
    pub async fn all(&self) -> Vec<(ReminderToken, Reminder)> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|e| (e.token, e.reminder.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::clock::spawn_after;
    use chrono::TimeZone;
    use std::time::Duration;

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    async fn persisted(store: &ReminderStore) -> Vec<Reminder> {
        load_json(store.path()).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::open(dir.path().join("reminders.json"))
            .await
            .unwrap();
        assert_eq!(store.len().await, 0);
        assert!(persisted(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_add_persists_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::open(dir.path().join("reminders.json"))
            .await
            .unwrap();

        store
            .add(Reminder::new(1, "washer", start_time()))
            .await
            .unwrap();

        assert_eq!(
            persisted(&store).await,
            vec![Reminder::new(1, "washer", start_time())]
        );
        assert!(store.find(1, "washer").await.is_some());
        assert!(store.find(2, "washer").await.is_none());
    }

    #[tokio::test]
    async fn test_add_rejects_second_reminder_for_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::open(dir.path().join("reminders.json"))
            .await
            .unwrap();

        store
            .add(Reminder::new(1, "washer", start_time()))
            .await
            .unwrap();
        let second = store.add(Reminder::new(1, "washer", start_time())).await;

        assert!(matches!(second, Err(ReminderError::AlreadyActive { .. })));
        assert_eq!(store.len().await, 1);
        // Other machines in the same chat are independent
        store
            .add(Reminder::new(1, "dryer", start_time()))
            .await
            .unwrap();
        assert_eq!(persisted(&store).await.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_absent_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::open(dir.path().join("reminders.json"))
            .await
            .unwrap();
        assert!(!store.remove(1, "washer").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_cancels_timer_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::open(dir.path().join("reminders.json"))
            .await
            .unwrap();
        let reminder = Reminder::new(1, "washer", start_time());
        let key = reminder.key();
        let token = store.add(reminder).await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        let timer = spawn_after(Duration::from_secs(60), async move {
            let _ = tx.send(());
        });
        assert!(store.attach_timer(&key, token, timer).await);

        assert!(store.remove(1, "washer").await.unwrap());
        tokio::time::sleep(Duration::from_secs(120)).await;

        // The timer task was aborted, so its sender is dropped without sending
        assert!(rx.recv().await.is_none());
        assert!(persisted(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_take_fired_ignores_replaced_reminder() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::open(dir.path().join("reminders.json"))
            .await
            .unwrap();
        let key = ReminderKey::new(1, "washer");

        let old = store
            .add(Reminder::new(1, "washer", start_time()))
            .await
            .unwrap();
        store.remove(1, "washer").await.unwrap();
        let new = store
            .add(Reminder::new(1, "washer", start_time()))
            .await
            .unwrap();

        assert!(store.take_fired(&key, old).await.unwrap().is_none());
        assert_eq!(store.len().await, 1);

        let taken = store.take_fired(&key, new).await.unwrap();
        assert_eq!(taken, Some(Reminder::new(1, "washer", start_time())));
        assert_eq!(store.len().await, 0);
        assert!(persisted(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_open_reads_legacy_start_date_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        std::fs::write(
            &path,
            r#"[
                {"chatId": 1, "machineType": "washer", "startDate": "2024-03-01T09:00:00.000Z"},
                {"chatId": 1, "machineType": "washer", "startTime": "2024-03-01T09:30:00Z"}
            ]"#,
        )
        .unwrap();

        let store = ReminderStore::open(&path).await.unwrap();
        let all = store.all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].1.start_time, start_time());
    }

    #[tokio::test]
    async fn test_open_fails_on_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        std::fs::write(&path, "[{\"chatId\": 1").unwrap();

        let result = ReminderStore::open(&path).await;
        assert!(matches!(result, Err(ReminderError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let store = ReminderStore::open(data_dir.join("reminders.json"))
            .await
            .unwrap();

        std::fs::remove_dir_all(&data_dir).unwrap();
        let result = store.add(Reminder::new(1, "washer", start_time())).await;

        assert!(matches!(result, Err(ReminderError::Io { .. })));
        assert_eq!(store.len().await, 0);
    }
}
