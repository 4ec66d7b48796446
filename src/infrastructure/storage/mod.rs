//! In-memory storage implementation
//!
//! Backs every repository contract with maps behind a `tokio` lock. Used by
//! tests and local runs; durable deployments plug in their own stores.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{BotCommand, Participant, ScoreSubmission, Season, Tournament};
use crate::domain::shared::{BotCommandId, IdempotencyKey, SeasonId, TournamentId};
use crate::domain::traits::{
    Aggregate, BotCommandRepository, LeaderboardRepository, ParticipantRepository, Repository,
    Reservation, TournamentRepository,
};

/// Map-backed repository for any aggregate
pub struct MemoryRepository<T: Aggregate> {
    items: Arc<RwLock<BTreeMap<T::Key, T>>>,
}

impl<T: Aggregate> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl<T: Aggregate> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Aggregate> Repository<T> for MemoryRepository<T> {
    async fn get(&self, key: &T::Key) -> Result<Option<T>, StorageError> {
        let items = self.items.read().await;
        Ok(items.get(key).cloned())
    }

    async fn save(&self, item: &T) -> Result<(), StorageError> {
        let mut items = self.items.write().await;
        items.insert(item.key(), item.clone());
        Ok(())
    }

    async fn delete(&self, key: &T::Key) -> Result<(), StorageError> {
        let mut items = self.items.write().await;
        items.remove(key);
        Ok(())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<T>, StorageError> {
        let items = self.items.read().await;
        Ok(items.values().skip(offset).take(limit).cloned().collect())
    }
}

#[async_trait]
impl TournamentRepository for MemoryRepository<Tournament> {
    async fn list_pending_sync(&self) -> Result<Vec<Tournament>, StorageError> {
        let items = self.items.read().await;
        Ok(items.values().filter(|t| t.sync_pending).cloned().collect())
    }
}

#[async_trait]
impl ParticipantRepository for MemoryRepository<Participant> {
    async fn list_by_tournament(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<Participant>, StorageError> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|p| &p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct CommandTable {
    by_id: BTreeMap<BotCommandId, BotCommand>,
    by_key: HashMap<IdempotencyKey, BotCommandId>,
}

impl CommandTable {
    fn insert(&mut self, command: &BotCommand) {
        self.by_key.insert(command.idempotency_key.clone(), command.id.clone());
        self.by_id.insert(command.id.clone(), command.clone());
    }
}

/// Bot-command store with an idempotency-key index.
///
/// Reservation runs under the table's write lock, so check and insert are
/// one step.
#[derive(Default)]
pub struct MemoryCommandRepository {
    table: Arc<RwLock<CommandTable>>,
}

impl MemoryCommandRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_by_key(&self, key: &IdempotencyKey) -> Option<BotCommand> {
        let table = self.table.read().await;
        table.by_key.get(key).and_then(|id| table.by_id.get(id)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.by_id.len()
    }
}

#[async_trait]
impl Repository<BotCommand> for MemoryCommandRepository {
    async fn get(&self, key: &BotCommandId) -> Result<Option<BotCommand>, StorageError> {
        Ok(self.table.read().await.by_id.get(key).cloned())
    }

    async fn save(&self, item: &BotCommand) -> Result<(), StorageError> {
        self.table.write().await.insert(item);
        Ok(())
    }

    async fn delete(&self, key: &BotCommandId) -> Result<(), StorageError> {
        let mut table = self.table.write().await;
        if let Some(command) = table.by_id.remove(key) {
            table.by_key.remove(&command.idempotency_key);
        }
        Ok(())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<BotCommand>, StorageError> {
        let table = self.table.read().await;
        Ok(table.by_id.values().skip(offset).take(limit).cloned().collect())
    }
}

#[async_trait]
impl BotCommandRepository for MemoryCommandRepository {
    async fn reserve_command(&self, candidate: &BotCommand) -> Result<Reservation, StorageError> {
        let mut table = self.table.write().await;
        if let Some(existing) = table
            .by_key
            .get(&candidate.idempotency_key)
            .and_then(|id| table.by_id.get(id))
        {
            return Ok(Reservation::Existing(existing.clone()));
        }
        table.insert(candidate);
        Ok(Reservation::Reserved)
    }
}

/// Leaderboard store keeping the first submission per idempotency key
#[derive(Default)]
pub struct MemoryLeaderboard {
    submissions: Arc<RwLock<HashMap<IdempotencyKey, ScoreSubmission>>>,
    seasons: Arc<RwLock<BTreeMap<SeasonId, Season>>>,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_season(&self, season: Season) {
        self.seasons.write().await.insert(season.id.clone(), season);
    }

    pub async fn submissions(&self) -> Vec<ScoreSubmission> {
        let mut all: Vec<_> = self.submissions.read().await.values().cloned().collect();
        all.sort_by_key(|s| s.submitted_at);
        all
    }
}

#[async_trait]
impl LeaderboardRepository for MemoryLeaderboard {
    async fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), StorageError> {
        let mut submissions = self.submissions.write().await;
        submissions
            .entry(submission.idempotency_key.clone())
            .or_insert_with(|| submission.clone());
        Ok(())
    }

    async fn get_season(&self, id: &SeasonId) -> Result<Option<Season>, StorageError> {
        Ok(self.seasons.read().await.get(id).cloned())
    }
}
