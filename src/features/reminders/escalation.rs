//! # Escalation Controller
//!
//! After a due notice is sent, keeps nudging the chat until someone replies
//! to any of the bot's messages or the attempt budget runs out.
//!
//! ```text
//! ARMED --interval, attempts < max--> RETRY --interval, attempts < max--> RETRY ...
//!   |                                   |
//!   |                                   +--interval, attempts >= max--> GIVEN_UP
//!   +--reply to any notice--> ACKNOWLEDGED (records "accepted" with attempts so far)
//! ```
//!
//! Every notice registers its own reply listener and older listeners stay
//! live, so a reply to the first notice still counts after three nudges.
//! All listeners are deregistered synchronously when a session terminates,
//! including when it is dropped on an error.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::core::config::ReminderCommandDef;
use crate::core::error::ReminderResult;
use crate::core::ids::{ChatId, MessageId, UserId};
use crate::features::analytics::{StatsEvent, StatsRecorder};
use crate::features::locale::Texts;
use crate::gateway::{ListenerId, NotificationGateway, Reply};

/// Attempt budget and spacing of nudges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl EscalationPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// With zero attempts no session is created at all
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    Armed,
    Retry { attempt: u32 },
    Acknowledged { attempt: u32, user_id: UserId },
    GivenUp,
}

impl EscalationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EscalationState::Acknowledged { .. } | EscalationState::GivenUp
        )
    }
}

/// State reached when the inter-attempt timer expires without a reply
pub fn on_interval_elapsed(attempts_used: u32, max_attempts: u32) -> EscalationState {
    if attempts_used < max_attempts {
        EscalationState::Retry {
            attempt: attempts_used + 1,
        }
    } else {
        EscalationState::GivenUp
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    Acknowledged { attempt: u32, user_id: UserId },
    GivenUp,
}

enum SessionEvent {
    Reply(Option<Reply>),
    IntervalElapsed,
}

/// Starts escalation sessions for fired reminders
#[derive(Clone)]
pub struct EscalationController {
    gateway: Arc<dyn NotificationGateway>,
    stats: Arc<StatsRecorder>,
    texts: Texts,
    policy: EscalationPolicy,
}

impl EscalationController {
    pub fn new(
        gateway: Arc<dyn NotificationGateway>,
        stats: Arc<StatsRecorder>,
        texts: Texts,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            gateway,
            stats,
            texts,
            policy,
        }
    }

    pub fn policy(&self) -> EscalationPolicy {
        self.policy
    }

    /// Drive one session to a terminal state. `notice_id` is the due notice.
    pub async fn escalate(
        &self,
        chat_id: ChatId,
        machine: &ReminderCommandDef,
        notice_id: MessageId,
    ) -> ReminderResult<EscalationOutcome> {
        let mut session = EscalationSession::arm(self, chat_id, machine, notice_id);
        session.run().await
    }
}

/// One fired reminder awaiting acknowledgment. Never persisted.
struct EscalationSession<'a> {
    controller: &'a EscalationController,
    chat_id: ChatId,
    machine: &'a ReminderCommandDef,
    state: EscalationState,
    attempts_used: u32,
    pending_listener_ids: Vec<ListenerId>,
    sink: mpsc::UnboundedSender<Reply>,
    replies: mpsc::UnboundedReceiver<Reply>,
}

impl<'a> EscalationSession<'a> {
    fn arm(
        controller: &'a EscalationController,
        chat_id: ChatId,
        machine: &'a ReminderCommandDef,
        notice_id: MessageId,
    ) -> Self {
        let (sink, replies) = mpsc::unbounded_channel();
        let mut session = Self {
            controller,
            chat_id,
            machine,
            state: EscalationState::Armed,
            attempts_used: 0,
            pending_listener_ids: Vec::new(),
            sink,
            replies,
        };
        session.listen_to(notice_id);
        session
    }

    fn listen_to(&mut self, message_id: MessageId) {
        let id = self
            .controller
            .gateway
            .on_reply(self.chat_id, message_id, self.sink.clone());
        self.pending_listener_ids.push(id);
    }

    fn release_listeners(&mut self) {
        for id in self.pending_listener_ids.drain(..) {
            self.controller.gateway.remove_reply_listener(id);
        }
    }

    async fn run(&mut self) -> ReminderResult<EscalationOutcome> {
        let interval = self.controller.policy.interval;
        let mut deadline = Instant::now() + interval;

        loop {
            let event = tokio::select! {
                biased;
                reply = self.replies.recv() => SessionEvent::Reply(reply),
                _ = tokio::time::sleep_until(deadline) => SessionEvent::IntervalElapsed,
            };

            match event {
                SessionEvent::Reply(Some(reply)) => return self.acknowledge(reply).await,
                SessionEvent::Reply(None) => {
                    warn!("Reply channel closed for chat {}, giving up", self.chat_id);
                    return self.give_up().await;
                }
                SessionEvent::IntervalElapsed => {
                    match on_interval_elapsed(
                        self.attempts_used,
                        self.controller.policy.max_attempts,
                    ) {
                        EscalationState::Retry { attempt } => {
                            self.nudge(attempt).await?;
                            deadline += interval;
                        }
                        _ => return self.give_up().await,
                    }
                }
            }
        }
    }

    async fn nudge(&mut self, attempt: u32) -> ReminderResult<()> {
        self.attempts_used = attempt;
        self.state = EscalationState::Retry { attempt };
        let text = self.controller.texts.nudge(self.machine, attempt);
        let message_id = self
            .controller
            .gateway
            .send_message(self.chat_id, &text)
            .await?;
        self.listen_to(message_id);
        info!(
            "Sent nudge #{attempt} for {} in chat {}",
            self.machine.id, self.chat_id
        );
        Ok(())
    }

    async fn acknowledge(&mut self, reply: Reply) -> ReminderResult<EscalationOutcome> {
        // Later replies must find no listener
        self.release_listeners();
        let attempt = self.attempts_used;
        self.state = EscalationState::Acknowledged {
            attempt,
            user_id: reply.user_id,
        };
        info!(
            "{} ({}) accepted {} in chat {} after {attempt} nudge(s)",
            reply.user_name, reply.user_id, self.machine.id, self.chat_id
        );

        let accepted = self
            .controller
            .stats
            .record(
                self.chat_id,
                reply.user_id,
                &self.machine.id,
                StatsEvent::Accepted { attempt },
            )
            .await?;
        let text = self
            .controller
            .texts
            .acknowledged(self.machine, &reply.user_name, accepted);
        self.controller
            .gateway
            .send_message(self.chat_id, &text)
            .await?;

        Ok(EscalationOutcome::Acknowledged {
            attempt,
            user_id: reply.user_id,
        })
    }

    async fn give_up(&mut self) -> ReminderResult<EscalationOutcome> {
        self.release_listeners();
        self.state = EscalationState::GivenUp;
        info!(
            "Nobody accepted {} in chat {} after {} nudge(s), giving up",
            self.machine.id, self.chat_id, self.attempts_used
        );
        self.controller
            .gateway
            .send_message(self.chat_id, self.controller.texts.give_up())
            .await?;
        Ok(EscalationOutcome::GivenUp)
    }
}

impl Drop for EscalationSession<'_> {
    fn drop(&mut self) {
        if !self.state.is_terminal() && !self.pending_listener_ids.is_empty() {
            warn!(
                "Escalation for {} in chat {} ended without resolution",
                self.machine.id, self.chat_id
            );
        }
        self.release_listeners();
    }
}
