//! # Reminder Scheduler
//!
//! Arms, fires, stops and restores reminders. Operations on the same
//! `(chat, machine)` key are serialized by a per-key lock, covering the
//! durable write and the timer swap, so a second `start` for a key queues
//! behind the first.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.3.0: Out-of-range waits are a typed error, stop records stats before removing
//! - 1.2.0: Restore drops entries for machines no longer configured
//! - 1.1.0: Start cancels an existing reminder for the key first
//! - 1.0.0: Initial release

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::clock::{spawn_after, Clock, TimerHandle};
use super::escalation::{EscalationController, EscalationOutcome, EscalationPolicy};
use super::store::{Reminder, ReminderStore, ReminderToken};
use crate::core::config::{Config, ReminderCommandDef};
use crate::core::error::{ReminderError, ReminderResult};
use crate::core::ids::{ChatId, ReminderKey, UserId};
use crate::features::analytics::{StatsEvent, StatsRecorder};
use crate::features::locale::Texts;
use crate::gateway::NotificationGateway;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub due_at: DateTime<Utc>,
    /// An active reminder for the same key was cancelled first
    pub replaced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped(Reminder),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderStatus {
    pub reminder: Reminder,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub rearmed: usize,
    pub expired: usize,
    pub unknown: usize,
}

struct SchedulerInner {
    store: Arc<ReminderStore>,
    stats: Arc<StatsRecorder>,
    gateway: Arc<dyn NotificationGateway>,
    clock: Arc<dyn Clock>,
    machines: HashMap<String, ReminderCommandDef>,
    texts: Texts,
    escalation: EscalationController,
    key_locks: DashMap<ReminderKey, Arc<Mutex<()>>>,
}

#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<SchedulerInner>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<ReminderStore>,
        stats: Arc<StatsRecorder>,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        machines: Vec<ReminderCommandDef>,
        texts: Texts,
        policy: EscalationPolicy,
    ) -> Self {
        let escalation = EscalationController::new(gateway.clone(), stats.clone(), texts, policy);
        let machines = machines.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                stats,
                gateway,
                clock,
                machines,
                texts,
                escalation,
                key_locks: DashMap::new(),
            }),
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<ReminderStore>,
        stats: Arc<StatsRecorder>,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = EscalationPolicy::new(
            config.require_reply_number_of_reminder_messages,
            config.reply_interval(),
        );
        Self::new(
            store,
            stats,
            gateway,
            clock,
            config.reminder_commands.clone(),
            Texts::new(config.locale),
            policy,
        )
    }

    pub fn machine(&self, machine_type: &str) -> ReminderResult<&ReminderCommandDef> {
        self.inner
            .machines
            .get(machine_type)
            .ok_or_else(|| ReminderError::UnknownMachine(machine_type.to_string()))
    }

    pub fn policy(&self) -> EscalationPolicy {
        self.inner.escalation.policy()
    }

    async fn lock_key(&self, key: &ReminderKey) -> OwnedMutexGuard<()> {
        let lock = self.inner.key_locks.entry(key.clone()).or_default().clone();
        lock.lock_owned().await
    }

    /// Arm a reminder due `wait` after `reference_time`.
    ///
    /// `reference_time` is when the user asked, so processing latency does
    /// not push the due time back. An already-due reminder fires at once.
    pub async fn start(
        &self,
        chat_id: ChatId,
        machine_type: &str,
        reference_time: DateTime<Utc>,
    ) -> ReminderResult<StartOutcome> {
        let machine = self.machine(machine_type)?;
        let key = ReminderKey::new(chat_id, machine_type);
        let _guard = self.lock_key(&key).await;

        let reminder = Reminder::new(chat_id, machine_type, reference_time);
        let due_at = due_time(machine, &reminder)?;
        let replaced = self.inner.store.remove(chat_id, machine_type).await?;
        let token = self.inner.store.add(reminder).await?;

        let delay = self.delay_until(due_at);
        let timer = self.arm(key.clone(), token, delay);
        self.inner.store.attach_timer(&key, token, timer).await;
        info!(
            "Armed reminder ({key}), due in {} min",
            delay.as_secs().div_ceil(60)
        );

        Ok(StartOutcome { due_at, replaced })
    }

    /// Cancel the active reminder, if any, and record a "stopped" event for `user_id`.
    ///
    /// If the event cannot be recorded the reminder stays active.
    pub async fn stop(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        machine_type: &str,
    ) -> ReminderResult<StopOutcome> {
        self.machine(machine_type)?;
        let key = ReminderKey::new(chat_id, machine_type);
        let _guard = self.lock_key(&key).await;

        let Some(reminder) = self.inner.store.find(chat_id, machine_type).await else {
            return Ok(StopOutcome::NotFound);
        };
        // Record first so a failed stats write leaves the reminder armed
        self.inner
            .stats
            .record(chat_id, user_id, machine_type, StatsEvent::Stopped)
            .await?;
        if !self.inner.store.remove(chat_id, machine_type).await? {
            return Ok(StopOutcome::NotFound);
        }

        Ok(StopOutcome::Stopped(reminder))
    }

    pub async fn status(
        &self,
        chat_id: ChatId,
        machine_type: &str,
    ) -> ReminderResult<Option<ReminderStatus>> {
        let machine = self.machine(machine_type)?;
        let Some(reminder) = self.inner.store.find(chat_id, machine_type).await else {
            return Ok(None);
        };
        let due_at = due_time(machine, &reminder)?;
        Ok(Some(ReminderStatus { reminder, due_at }))
    }

    /// Re-arm persisted reminders after a restart.
    ///
    /// Reminders that came due while the process was down are dropped
    /// without a notice. So are reminders for machines no longer configured
    /// and reminders whose due time cannot be represented.
    pub async fn restore(&self) -> ReminderResult<RestoreSummary> {
        let mut summary = RestoreSummary::default();

        for (token, reminder) in self.inner.store.all().await {
            let key = reminder.key();
            let due_at = match self
                .machine(&reminder.machine_type)
                .and_then(|machine| due_time(machine, &reminder))
            {
                Ok(due_at) => due_at,
                Err(e) => {
                    warn!("Dropping persisted reminder ({key}): {e}");
                    self.inner
                        .store
                        .remove(reminder.chat_id, &reminder.machine_type)
                        .await?;
                    summary.unknown += 1;
                    continue;
                }
            };

            let _guard = self.lock_key(&key).await;
            if due_at <= self.inner.clock.now() {
                info!("Reminder ({key}) came due at {due_at} while offline, removing it");
                self.inner
                    .store
                    .remove(reminder.chat_id, &reminder.machine_type)
                    .await?;
                summary.expired += 1;
                continue;
            }

            let delay = self.delay_until(due_at);
            let timer = self.arm(key.clone(), token, delay);
            if self.inner.store.attach_timer(&key, token, timer).await {
                info!(
                    "Restored reminder ({key}), due in {} min",
                    delay.as_secs().div_ceil(60)
                );
                summary.rearmed += 1;
            }
        }

        info!(
            "Restore finished: {} re-armed, {} expired, {} unknown",
            summary.rearmed, summary.expired, summary.unknown
        );
        Ok(summary)
    }

    fn delay_until(&self, due_at: DateTime<Utc>) -> Duration {
        (due_at - self.inner.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    fn arm(&self, key: ReminderKey, token: ReminderToken, delay: Duration) -> TimerHandle {
        let scheduler = self.clone();
        spawn_after(delay, async move {
            if let Err(e) = scheduler.fire(&key, token).await {
                error!("Reminder ({key}) failed while firing: {e}");
            }
        })
    }

    async fn fire(&self, key: &ReminderKey, token: ReminderToken) -> ReminderResult<()> {
        let guard = self.lock_key(key).await;
        let Some(reminder) = self.inner.store.take_fired(key, token).await? else {
            debug!("Reminder ({key}) was already removed, skipping fire");
            return Ok(());
        };
        drop(guard);

        let machine = self.machine(&reminder.machine_type)?;
        let policy = self.policy();
        let text = self.inner.texts.due_notice(machine, policy.is_enabled());
        let notice_id = self.inner.gateway.send_message(reminder.chat_id, &text).await?;
        info!("Reminder ({key}) fired");

        if !policy.is_enabled() {
            return Ok(());
        }
        match self
            .inner
            .escalation
            .escalate(reminder.chat_id, machine, notice_id)
            .await?
        {
            EscalationOutcome::Acknowledged { attempt, user_id } => {
                debug!("Reminder ({key}) acknowledged by {user_id} after {attempt} nudge(s)")
            }
            EscalationOutcome::GivenUp => debug!("Reminder ({key}) was never acknowledged"),
        }
        Ok(())
    }
}

fn due_time(machine: &ReminderCommandDef, reminder: &Reminder) -> ReminderResult<DateTime<Utc>> {
    machine
        .wait_duration()
        .and_then(|wait| reminder.due_at(wait))
        .ok_or_else(|| ReminderError::WaitOutOfRange(machine.id.clone()))
}
