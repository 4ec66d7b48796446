//! Idempotent bot command intake
//!
//! Each idempotency key is processed at most once. The key is claimed and
//! the pending command stored in a single repository call, so of two
//! deliveries racing on the same key exactly one gets to enqueue.

use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::ServiceError;
use crate::application::services::deadline::{with_deadline, DEFAULT_PROVIDER_TIMEOUT};
use crate::application::services::key_lock::KeyedLock;
use crate::domain::entities::BotCommand;
use crate::domain::shared::{BotCommandId, IdempotencyKey, PlayerId};
use crate::domain::traits::{
    BotCommandRepository, Clock, CommandQueue, Notification, Notifier, Reservation, SystemClock,
};

/// An incoming command as delivered by a channel
#[derive(Debug, Clone, Default)]
pub struct SubmitCommand {
    pub idempotency_key: IdempotencyKey,
    pub channel: String,
    pub payload: Vec<u8>,
    /// Player to acknowledge once the command is queued
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandAccepted {
    pub command_id: BotCommandId,
    pub accepted: bool,
    /// True when the key had already completed and nothing was re-processed
    pub replayed: bool,
}

pub struct BotCommandService {
    commands: Arc<dyn BotCommandRepository>,
    queue: Arc<dyn CommandQueue>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Arc<dyn Clock>,
    provider_timeout: Duration,
    locks: KeyedLock,
}

impl BotCommandService {
    pub fn new(commands: Arc<dyn BotCommandRepository>, queue: Arc<dyn CommandQueue>) -> Self {
        Self {
            commands,
            queue,
            notifier: None,
            clock: Arc::new(SystemClock),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            locks: KeyedLock::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Accepts a command at most once per idempotency key.
    ///
    /// A key that already completed is acknowledged again without any
    /// processing. A key still pending or failed is reported as
    /// [`ServiceError::Duplicate`]; a failed or stranded command is put back
    /// on the queue through [`BotCommandService::retry`].
    pub async fn handle(&self, cmd: SubmitCommand) -> Result<CommandAccepted, ServiceError> {
        let now = self.clock.now();
        let mut command = BotCommand::new(
            BotCommandId::new(uuid::Uuid::new_v4().to_string()),
            cmd.channel,
            cmd.payload,
            cmd.idempotency_key,
            now,
        )?;
        // held until the hand-off is recorded, so `retry` cannot race it
        let _guard = self.locks.lock(command.id.as_str()).await;

        match self.commands.reserve_command(&command).await? {
            Reservation::Existing(existing) if existing.is_completed() => {
                tracing::debug!(
                    "Command {} already completed for key {}",
                    existing.id,
                    existing.idempotency_key
                );
                return Ok(CommandAccepted {
                    command_id: existing.id,
                    accepted: true,
                    replayed: true,
                });
            }
            Reservation::Existing(existing) => {
                tracing::debug!(
                    "Key {} is in flight ({})",
                    existing.idempotency_key,
                    existing.state
                );
                return Err(ServiceError::Duplicate(existing.idempotency_key));
            }
            Reservation::Reserved => {}
        }

        if let Err(e) = with_deadline(self.provider_timeout, self.queue.enqueue(&command)).await {
            tracing::warn!("Enqueue failed for command {}: {}", command.id, e);
            command.mark_attempt(self.clock.now(), Err(e.to_string()))?;
            self.commands.save(&command).await?;
            return Err(ServiceError::SyncFailed(e));
        }
        command.mark_queued(self.clock.now())?;
        if let Err(e) = self.commands.save(&command).await {
            tracing::warn!(
                "Command {} is queued but the acknowledgement was not saved: {}",
                command.id,
                e
            );
        }

        if let (Some(notifier), Some(player_id)) = (&self.notifier, &cmd.player_id) {
            let note = Notification::CommandAccepted {
                command_id: command.id.clone(),
                channel: command.channel.clone(),
            };
            let notified = with_deadline(self.provider_timeout, notifier.notify(player_id, &note));
            if let Err(e) = notified.await {
                tracing::warn!(
                    "Could not notify {} about command {}: {}",
                    player_id,
                    command.id,
                    e
                );
            }
        }

        tracing::info!("Accepted command {} on {}", command.id, command.channel);
        Ok(CommandAccepted {
            command_id: command.id,
            accepted: true,
            replayed: false,
        })
    }

    /// Records the worker's verdict on one processing attempt.
    pub async fn record_attempt(
        &self,
        id: &BotCommandId,
        outcome: Result<(), String>,
    ) -> Result<BotCommand, ServiceError> {
        id.validate()?;
        let _guard = self.locks.lock(id.as_str()).await;

        let mut command = self.load(id).await?;
        command.mark_attempt(self.clock.now(), outcome)?;
        self.commands.save(&command).await?;
        tracing::info!("Command {} is now {}", command.id, command.state);
        Ok(command)
    }

    /// Puts a failed or stranded command back on the queue.
    ///
    /// A command is stranded when it was reserved but its enqueue was never
    /// acknowledged and the provider deadline has long passed, e.g. because
    /// the intake call was cancelled. Once re-queued the command is pending
    /// again, so a second `retry` is rejected until the worker reports.
    pub async fn retry(&self, id: &BotCommandId) -> Result<BotCommand, ServiceError> {
        id.validate()?;
        let _guard = self.locks.lock(id.as_str()).await;

        let mut command = self.load(id).await?;
        let grace = chrono::Duration::from_std(self.provider_timeout)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let mut requeued = command.clone();
        requeued.requeue(self.clock.now(), grace)?;

        if let Err(e) = with_deadline(self.provider_timeout, self.queue.enqueue(&command)).await {
            tracing::warn!("Re-enqueue failed for command {}: {}", command.id, e);
            command.mark_attempt(self.clock.now(), Err(e.to_string()))?;
            self.commands.save(&command).await?;
            return Err(ServiceError::SyncFailed(e));
        }
        self.commands.save(&requeued).await?;
        tracing::info!("Re-queued command {} (retry {})", requeued.id, requeued.retry_count);
        Ok(requeued)
    }

    pub async fn get_command(&self, id: &BotCommandId) -> Result<BotCommand, ServiceError> {
        self.load(id).await
    }

    pub async fn list_commands(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<BotCommand>, ServiceError> {
        Ok(self.commands.list(limit, offset).await?)
    }

    async fn load(&self, id: &BotCommandId) -> Result<BotCommand, ServiceError> {
        self.commands
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<BotCommand>(id))
    }
}
