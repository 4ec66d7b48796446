use async_trait::async_trait;

use crate::application::errors::StorageError;
use crate::domain::entities::{BotCommand, Participant, ScoreSubmission, Season, Tournament};
use crate::domain::shared::{SeasonId, TournamentId};
use crate::domain::traits::Aggregate;

/// Local durable storage for one aggregate type
///
/// `get` reports absence as `Ok(None)`; errors are reserved for the store
/// itself failing. Implementations must not let two concurrent writers of
/// the same key interleave a read-modify-write; the services additionally
/// serialize their own read-modify-write calls per key.
#[async_trait]
pub trait Repository<T: Aggregate>: Send + Sync {
    async fn get(&self, key: &T::Key) -> Result<Option<T>, StorageError>;

    async fn save(&self, item: &T) -> Result<(), StorageError>;

    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &T::Key) -> Result<(), StorageError>;

    /// Items in key order.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<T>, StorageError>;
}

#[async_trait]
pub trait TournamentRepository: Repository<Tournament> {
    /// Tournaments saved locally whose backend create has not been acknowledged
    async fn list_pending_sync(&self) -> Result<Vec<Tournament>, StorageError>;
}

#[async_trait]
pub trait ParticipantRepository: Repository<Participant> {
    async fn list_by_tournament(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<Participant>, StorageError>;
}

/// Outcome of claiming an idempotency key
#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    /// The key was already claimed by this command
    Existing(BotCommand),
    /// The key was free; the candidate is now stored in its pending state
    Reserved,
}

#[async_trait]
pub trait BotCommandRepository: Repository<BotCommand> {
    /// Atomically claims `candidate.idempotency_key`.
    ///
    /// Either returns the command that already owns the key, or stores
    /// `candidate` as the key's owner. Two concurrent callers with the same
    /// key must never both see [`Reservation::Reserved`].
    async fn reserve_command(&self, candidate: &BotCommand) -> Result<Reservation, StorageError>;
}

#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    /// Records a score. Dedupe on the submission's idempotency key is the
    /// store's responsibility.
    async fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), StorageError>;

    async fn get_season(&self, id: &SeasonId) -> Result<Option<Season>, StorageError>;
}
