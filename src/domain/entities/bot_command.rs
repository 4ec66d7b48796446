//! Bot command aggregate - dedupe and retry bookkeeping for bot automation

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;
use crate::domain::shared::{BotCommandId, IdempotencyKey};
use crate::domain::traits::Aggregate;

/// Processing state of a bot command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Pending,
    Completed,
    Failed,
}

impl CommandState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(DomainError::Required("command state (pending|completed|failed)")),
        }
    }
}

/// An inbound bot command keyed by its idempotency key
#[derive(Debug, Clone, PartialEq)]
pub struct BotCommand {
    pub id: BotCommandId,
    pub channel: String,
    pub payload: Vec<u8>,
    pub idempotency_key: IdempotencyKey,
    pub state: CommandState,
    pub retry_count: u32,
    pub last_error: Option<String>,
    /// When the queue last acknowledged this command; `None` while pending
    /// means the hand-off was never confirmed.
    pub queued_at: Option<DateTime<Utc>>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BotCommand {
    pub fn new(
        id: BotCommandId,
        channel: impl Into<String>,
        payload: Vec<u8>,
        idempotency_key: IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        id.validate()?;
        idempotency_key.validate()?;
        Ok(Self {
            id,
            channel: channel.into(),
            payload,
            idempotency_key,
            state: CommandState::Pending,
            retry_count: 0,
            last_error: None,
            queued_at: None,
            attempted_at: None,
            completed_at: None,
            created_at: now,
        })
    }

    /// Records one processing attempt.
    ///
    /// Success moves pending or failed commands to completed. Failure moves
    /// them to failed and bumps the retry count. Completed is terminal.
    pub fn mark_attempt(
        &mut self,
        now: DateTime<Utc>,
        outcome: Result<(), String>,
    ) -> Result<(), DomainError> {
        if self.state == CommandState::Completed {
            let target = if outcome.is_ok() {
                CommandState::Completed
            } else {
                CommandState::Failed
            };
            return Err(DomainError::transition("bot command", self.state, target));
        }
        self.attempted_at = Some(now);
        match outcome {
            Ok(()) => {
                self.state = CommandState::Completed;
                self.completed_at = Some(now);
                self.last_error = None;
            }
            Err(error) => {
                self.state = CommandState::Failed;
                self.retry_count += 1;
                self.last_error = Some(error);
            }
        }
        Ok(())
    }

    /// Records the queue's acknowledgement of a pending command.
    pub fn mark_queued(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.state != CommandState::Pending {
            return Err(DomainError::transition("bot command", self.state, CommandState::Pending));
        }
        self.queued_at = Some(now);
        Ok(())
    }

    /// Pending, never acknowledged by the queue, and older than `grace`.
    ///
    /// This is what a command looks like when its intake was cut off between
    /// reservation and enqueue.
    pub fn is_stranded(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.state == CommandState::Pending
            && self.queued_at.is_none()
            && self.attempted_at.is_none()
            && now - self.created_at >= grace
    }

    /// Failed or stranded -> pending, acknowledged by the queue at `now`.
    ///
    /// A command that is already queued, or completed, is rejected.
    pub fn requeue(&mut self, now: DateTime<Utc>, grace: Duration) -> Result<(), DomainError> {
        if !self.is_failed() && !self.is_stranded(now, grace) {
            return Err(DomainError::transition("bot command", self.state, CommandState::Pending));
        }
        self.state = CommandState::Pending;
        self.queued_at = Some(now);
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.state == CommandState::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.state == CommandState::Failed
    }
}

impl Aggregate for BotCommand {
    type Key = BotCommandId;
    const KIND: &'static str = "bot command";

    fn key(&self) -> BotCommandId {
        self.id.clone()
    }
}
