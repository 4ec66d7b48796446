//! Tournament lifecycle orchestration
//!
//! Creates and mutations are saved locally first and then pushed to the
//! backend. A tournament stays `sync_pending` until the backend has
//! acknowledged its create, so a repair job can find it with
//! [`TournamentService::pending_sync`]. Deletes run the other way round:
//! backend first, local record last.

use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::ServiceError;
use crate::application::services::deadline::{with_deadline, DEFAULT_PROVIDER_TIMEOUT};
use crate::application::services::key_lock::KeyedLock;
use crate::domain::entities::{Participant, ParticipantKey, Tournament, TournamentDraft};
use crate::domain::errors::DomainError;
use crate::domain::shared::{PlayerId, TournamentId};
use crate::domain::traits::{
    Aggregate, Clock, CreateTournamentParams, ParticipantRepository, SystemClock,
    TournamentProvider, TournamentRepository,
};

pub const DEFAULT_LIST_LIMIT: usize = 100;

pub struct TournamentService {
    tournaments: Arc<dyn TournamentRepository>,
    participants: Arc<dyn ParticipantRepository>,
    provider: Arc<dyn TournamentProvider>,
    clock: Arc<dyn Clock>,
    provider_timeout: Duration,
    default_list_limit: usize,
    locks: KeyedLock,
}

impl TournamentService {
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        participants: Arc<dyn ParticipantRepository>,
        provider: Arc<dyn TournamentProvider>,
    ) -> Self {
        Self {
            tournaments,
            participants,
            provider,
            clock: Arc::new(SystemClock),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            default_list_limit: DEFAULT_LIST_LIMIT,
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

    pub fn with_default_list_limit(mut self, limit: usize) -> Self {
        self.default_list_limit = limit.max(1);
        self
    }

    /// Creates the tournament locally, then in the backend.
    ///
    /// Sending the same draft again is safe: an already synced tournament is
    /// returned as is, and one still pending sync is pushed again. A
    /// different draft under an existing id is a conflict.
    pub async fn create_tournament(
        &self,
        draft: TournamentDraft,
    ) -> Result<Tournament, ServiceError> {
        let now = self.clock.now();
        let candidate = Tournament::new(draft, now)?;
        let _guard = self.locks.lock(&format!("tournament:{}", candidate.id)).await;

        let mut tournament = match self.tournaments.get(&candidate.id).await? {
            Some(existing) if !existing.same_definition(&candidate) => {
                tracing::warn!(
                    "Tournament {} already exists with a different definition",
                    existing.id
                );
                return Err(DomainError::AlreadyExists {
                    kind: Tournament::KIND,
                    id: existing.id.to_string(),
                }
                .into());
            }
            Some(existing) if !existing.sync_pending => {
                tracing::debug!("Tournament {} already created", existing.id);
                return Ok(existing);
            }
            Some(existing) => {
                tracing::info!("Retrying backend create for pending tournament {}", existing.id);
                existing
            }
            None => {
                self.tournaments.save(&candidate).await?;
                candidate
            }
        };

        let params = CreateTournamentParams::from(&tournament);
        with_deadline(self.provider_timeout, self.provider.create_tournament(&params))
            .await
            .map_err(|e| {
                tracing::warn!(
                    "Tournament {} saved locally but backend create failed: {}",
                    tournament.id,
                    e
                );
                ServiceError::SyncFailed(e)
            })?;

        tournament.mark_synced(self.clock.now());
        if let Err(e) = self.tournaments.save(&tournament).await {
            tracing::warn!("Could not clear sync marker on tournament {}: {}", tournament.id, e);
        }
        tracing::info!("Created tournament {}", tournament.id);
        Ok(tournament)
    }

    /// Adds `count` attempts for a player, creating the participant on first use.
    ///
    /// Attempts are additive: delivering the same call twice counts twice.
    pub async fn add_attempt(
        &self,
        tournament_id: &TournamentId,
        player_id: &PlayerId,
        count: i64,
    ) -> Result<Participant, ServiceError> {
        tournament_id.validate()?;
        player_id.validate()?;
        if count <= 0 {
            return Err(DomainError::InvalidAttemptCount(count).into());
        }

        let key = ParticipantKey::new(tournament_id.clone(), player_id.clone());
        let _guard = self.locks.lock(&format!("participant:{}", key)).await;

        let now = self.clock.now();
        let mut participant = match self.participants.get(&key).await? {
            Some(p) => p,
            None => Participant::new(tournament_id.clone(), player_id.clone(), now)?,
        };
        participant.add_attempts(count, now)?;
        self.participants.save(&participant).await?;

        with_deadline(
            self.provider_timeout,
            self.provider.add_attempt(tournament_id, player_id, count),
        )
        .await
        .map_err(|e| {
            tracing::warn!("Attempts for {} saved locally but backend sync failed: {}", key, e);
            ServiceError::SyncFailed(e)
        })?;

        Ok(participant)
    }

    /// Deletes from the backend first; the local record goes only once that succeeded.
    pub async fn delete_tournament(&self, id: &TournamentId) -> Result<(), ServiceError> {
        id.validate()?;
        let _guard = self.locks.lock(&format!("tournament:{}", id)).await;

        with_deadline(self.provider_timeout, self.provider.delete_tournament(id))
            .await
            .map_err(ServiceError::Provider)?;
        self.tournaments.delete(id).await?;
        tracing::info!("Deleted tournament {}", id);
        Ok(())
    }

    pub async fn end_tournament(&self, id: &TournamentId) -> Result<Tournament, ServiceError> {
        id.validate()?;
        let _guard = self.locks.lock(&format!("tournament:{}", id)).await;

        let mut tournament = self.load(id).await?;
        tournament.end(self.clock.now())?;
        self.tournaments.save(&tournament).await?;
        tracing::info!("Ended tournament {}", id);
        Ok(tournament)
    }

    /// Moves the tournament to reset and zeroes every participant's attempts.
    pub async fn reset_tournament(&self, id: &TournamentId) -> Result<Tournament, ServiceError> {
        id.validate()?;
        let _guard = self.locks.lock(&format!("tournament:{}", id)).await;

        let now = self.clock.now();
        let mut tournament = self.load(id).await?;
        tournament.reset(now)?;
        self.tournaments.save(&tournament).await?;

        let participants = self.participants.list_by_tournament(id).await?;
        for listed in participants {
            let key = listed.key();
            let _p = self.locks.lock(&format!("participant:{}", key)).await;
            if let Some(mut participant) = self.participants.get(&key).await? {
                participant.reset_attempts(now);
                self.participants.save(&participant).await?;
            }
        }
        tracing::info!("Reset tournament {}", id);
        Ok(tournament)
    }

    pub async fn get_tournament(&self, id: &TournamentId) -> Result<Tournament, ServiceError> {
        id.validate()?;
        self.load(id).await
    }

    /// Lists tournaments; a non-positive limit falls back to the configured default.
    pub async fn list_tournaments(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Tournament>, ServiceError> {
        let limit = if limit <= 0 { self.default_list_limit } else { limit as usize };
        let offset = offset.max(0) as usize;
        Ok(self.tournaments.list(limit, offset).await?)
    }

    pub async fn pending_sync(&self) -> Result<Vec<Tournament>, ServiceError> {
        Ok(self.tournaments.list_pending_sync().await?)
    }

    async fn load(&self, id: &TournamentId) -> Result<Tournament, ServiceError> {
        self.tournaments
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Tournament>(id))
    }
}
