//! Battle orchestration
//!
//! The match backend mints the battle id, so a battle is created there first
//! and saved locally afterwards. A failed local save leaves an orphaned
//! backend match; `start_battle` is not idempotent unless the backend
//! dedupes on the idempotency key.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::ServiceError;
use crate::application::services::deadline::{with_deadline, DEFAULT_PROVIDER_TIMEOUT};
use crate::application::services::key_lock::KeyedLock;
use crate::domain::entities::{Battle, PlayerAccount};
use crate::domain::errors::DomainError;
use crate::domain::shared::{BattleId, IdempotencyKey, Metadata, PlayerId};
use crate::domain::traits::{Clock, MatchProvider, Repository, StartMatchPayload, SystemClock};

#[derive(Debug, Clone, Default)]
pub struct StartBattle {
    pub leader_id: PlayerId,
    pub idempotency_key: IdempotencyKey,
    pub metadata: Metadata,
    pub preset: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartedBattle {
    pub battle_id: BattleId,
    pub match_id: String,
}

pub struct BattleService {
    battles: Arc<dyn Repository<Battle>>,
    provider: Arc<dyn MatchProvider>,
    accounts: Option<Arc<dyn Repository<PlayerAccount>>>,
    clock: Arc<dyn Clock>,
    provider_timeout: Duration,
    locks: KeyedLock,
}

impl BattleService {
    pub fn new(battles: Arc<dyn Repository<Battle>>, provider: Arc<dyn MatchProvider>) -> Self {
        Self {
            battles,
            provider,
            accounts: None,
            clock: Arc::new(SystemClock),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            locks: KeyedLock::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Rejects leaders whose account is suspended.
    pub fn with_accounts(mut self, accounts: Arc<dyn Repository<PlayerAccount>>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub async fn start_battle(&self, cmd: StartBattle) -> Result<StartedBattle, ServiceError> {
        cmd.leader_id.validate()?;
        cmd.idempotency_key.validate()?;
        if let Some(accounts) = &self.accounts {
            if let Some(account) = accounts.get(&cmd.leader_id).await? {
                account.can_start_battle(&cmd.idempotency_key)?;
            }
        }

        let payload = StartMatchPayload {
            leader_id: cmd.leader_id.clone(),
            metadata: cmd.metadata.clone(),
            preset: cmd.preset,
        };
        let created = with_deadline(self.provider_timeout, self.provider.create_match(&payload))
            .await
            .map_err(ServiceError::Provider)?;

        let battle = Battle::new(
            created.battle_id.clone(),
            cmd.leader_id,
            cmd.idempotency_key,
            self.clock.now(),
        )?
        .with_match(created.match_id.clone())
        .with_metadata(cmd.metadata);

        if let Err(e) = self.battles.save(&battle).await {
            tracing::warn!(
                "Match {} created but battle {} was not saved: {}",
                created.match_id,
                battle.id,
                e
            );
            return Err(e.into());
        }
        tracing::info!("Started battle {} (match {})", battle.id, created.match_id);
        Ok(StartedBattle {
            battle_id: created.battle_id,
            match_id: created.match_id,
        })
    }

    pub async fn join_battle(
        &self,
        id: &BattleId,
        player_id: PlayerId,
    ) -> Result<Battle, ServiceError> {
        id.validate()?;
        player_id.validate()?;
        self.update(id, |battle, now| battle.add_player(player_id, now)).await
    }

    pub async fn mark_ready(
        &self,
        id: &BattleId,
        player_id: &PlayerId,
        ready: bool,
    ) -> Result<Battle, ServiceError> {
        id.validate()?;
        self.update(id, |battle, now| battle.mark_ready(player_id, ready, now)).await
    }

    pub async fn record_snapshot(
        &self,
        id: &BattleId,
        tick: i64,
        payload: Vec<u8>,
    ) -> Result<Battle, ServiceError> {
        id.validate()?;
        self.update(id, |battle, now| {
            battle.update_snapshot(tick, payload, now);
            Ok(())
        })
        .await
    }

    pub async fn get_battle(&self, id: &BattleId) -> Result<Battle, ServiceError> {
        self.battles
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Battle>(id))
    }

    async fn update<F>(&self, id: &BattleId, mutate: F) -> Result<Battle, ServiceError>
    where
        F: FnOnce(&mut Battle, DateTime<Utc>) -> Result<(), DomainError>,
    {
        let _guard = self.locks.lock(id.as_str()).await;
        let mut battle = self.get_battle(id).await?;
        mutate(&mut battle, self.clock.now())?;
        self.battles.save(&battle).await?;
        Ok(battle)
    }
}
