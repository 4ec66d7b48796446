//! Battle aggregate

use chrono::{DateTime, Utc};

use crate::domain::errors::DomainError;
use crate::domain::shared::{BattleId, IdempotencyKey, Metadata, PlayerId};
use crate::domain::traits::Aggregate;

/// Latest authoritative match state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchState {
    pub tick: i64,
    pub payload: Vec<u8>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A player's seat in a battle
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSlot {
    pub player_id: PlayerId,
    pub joined_at: DateTime<Utc>,
    pub ready: bool,
}

/// Match lifecycle around an external match session
#[derive(Debug, Clone, PartialEq)]
pub struct Battle {
    pub id: BattleId,
    pub leader: PlayerId,
    /// External match session id returned by the match provider
    pub match_id: String,
    pub slots: Vec<PlayerSlot>,
    pub snapshot: MatchState,
    pub metadata: Metadata,
    /// Names the creation intent, not the match session; fixed at creation.
    pub idempotency_key: IdempotencyKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Battle {
    /// Seeds the battle with the leader in the first, ready slot.
    pub fn new(
        id: BattleId,
        leader: PlayerId,
        idempotency_key: IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        id.validate()?;
        leader.validate()?;
        idempotency_key.validate()?;
        Ok(Self {
            id,
            slots: vec![PlayerSlot {
                player_id: leader.clone(),
                joined_at: now,
                ready: true,
            }],
            leader,
            match_id: String::new(),
            snapshot: MatchState::default(),
            metadata: Metadata::new(),
            idempotency_key,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_match(mut self, match_id: impl Into<String>) -> Self {
        self.match_id = match_id.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn add_player(&mut self, player: PlayerId, now: DateTime<Utc>) -> Result<(), DomainError> {
        player.validate()?;
        if self.has_player(&player) {
            return Err(DomainError::PlayerAlreadyJoined(player));
        }
        self.slots.push(PlayerSlot {
            player_id: player,
            joined_at: now,
            ready: false,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_ready(
        &mut self,
        player: &PlayerId,
        ready: bool,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| &slot.player_id == player)
            .ok_or_else(|| DomainError::PlayerNotFound(player.clone()))?;
        slot.ready = ready;
        self.updated_at = now;
        Ok(())
    }

    /// Replaces the stored snapshot.
    pub fn update_snapshot(&mut self, tick: i64, payload: Vec<u8>, now: DateTime<Utc>) {
        self.snapshot = MatchState {
            tick,
            payload,
            updated_at: Some(now),
        };
        self.updated_at = now;
    }

    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.slots.iter().any(|slot| &slot.player_id == player)
    }

    pub fn all_ready(&self) -> bool {
        self.slots.iter().all(|slot| slot.ready)
    }
}

impl Aggregate for Battle {
    type Key = BattleId;
    const KIND: &'static str = "battle";

    fn key(&self) -> BattleId {
        self.id.clone()
    }
}
