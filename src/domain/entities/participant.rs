//! Tournament participant

use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::errors::DomainError;
use crate::domain::shared::{PlayerId, TournamentId};
use crate::domain::traits::Aggregate;

/// Composite key of a participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantKey {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
}

impl ParticipantKey {
    pub fn new(tournament_id: TournamentId, player_id: PlayerId) -> Self {
        Self { tournament_id, player_id }
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tournament_id, self.player_id)
    }
}

/// A player's standing in one tournament. Created lazily on the first attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub attempts: u64,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(
        tournament_id: TournamentId,
        player_id: PlayerId,
        joined_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        tournament_id.validate()?;
        player_id.validate()?;
        Ok(Self {
            tournament_id,
            player_id,
            attempts: 0,
            joined_at,
            updated_at: joined_at,
        })
    }

    /// Adds `count` attempts. Non-positive counts are rejected without touching the counter.
    pub fn add_attempts(&mut self, count: i64, now: DateTime<Utc>) -> Result<(), DomainError> {
        if count <= 0 {
            return Err(DomainError::InvalidAttemptCount(count));
        }
        self.attempts = self.attempts.saturating_add(count as u64);
        self.updated_at = now;
        Ok(())
    }

    pub fn reset_attempts(&mut self, now: DateTime<Utc>) {
        self.attempts = 0;
        self.updated_at = now;
    }
}

impl Aggregate for Participant {
    type Key = ParticipantKey;
    const KIND: &'static str = "participant";

    fn key(&self) -> ParticipantKey {
        ParticipantKey::new(self.tournament_id.clone(), self.player_id.clone())
    }
}
