//! Leaderboard score submission: validate and forward

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::application::errors::ServiceError;
use crate::domain::entities::{ScoreSubmission, Season};
use crate::domain::shared::{IdempotencyKey, PlayerId, SeasonId};
use crate::domain::traits::{Clock, LeaderboardRepository, SystemClock};

#[derive(Debug, Clone, Default)]
pub struct SubmitScore {
    pub player_id: PlayerId,
    pub season_id: SeasonId,
    pub value: i64,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledged {
    pub idempotency_key: IdempotencyKey,
    pub submitted_at: DateTime<Utc>,
}

pub struct LeaderboardService {
    leaderboard: Arc<dyn LeaderboardRepository>,
    clock: Arc<dyn Clock>,
}

impl LeaderboardService {
    pub fn new(leaderboard: Arc<dyn LeaderboardRepository>) -> Self {
        Self {
            leaderboard,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Hands a validated submission to the store, which dedupes on its key.
    pub async fn submit(&self, cmd: SubmitScore) -> Result<Acknowledged, ServiceError> {
        let submission = ScoreSubmission {
            player_id: cmd.player_id,
            season_id: cmd.season_id,
            value: cmd.value,
            idempotency_key: cmd.idempotency_key,
            submitted_at: self.clock.now(),
        };
        submission.validate()?;
        self.leaderboard.submit_score(&submission).await?;

        tracing::debug!(
            "Submitted score {} for {} in {}",
            submission.value,
            submission.player_id,
            submission.season_id
        );
        Ok(Acknowledged {
            idempotency_key: submission.idempotency_key,
            submitted_at: submission.submitted_at,
        })
    }

    /// Loads a season with its active flag evaluated at the current time.
    pub async fn season(&self, id: &SeasonId) -> Result<Season, ServiceError> {
        id.validate()?;
        let mut season = self
            .leaderboard
            .get_season(id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Season>(id))?;
        season.activate(self.clock.now());
        Ok(season)
    }
}
