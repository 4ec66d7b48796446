//! SQLite-backed bot command store
//!
//! The idempotency key carries a UNIQUE constraint; reservation is an
//! `INSERT OR IGNORE` followed by a lookup, so the database decides which
//! caller owns a key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::application::errors::StorageError;
use crate::domain::entities::BotCommand;
use crate::domain::shared::{BotCommandId, IdempotencyKey};
use crate::domain::traits::{BotCommandRepository, Repository, Reservation};

const COLUMNS: &str = "id, idempotency_key, channel, payload, state, retry_count, last_error, \
                       queued_at, attempted_at, completed_at, created_at";

pub struct SqliteCommandRepository {
    conn: Mutex<Connection>,
}

impl SqliteCommandRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bot_commands (
                id TEXT PRIMARY KEY,
                idempotency_key TEXT UNIQUE NOT NULL,
                channel TEXT NOT NULL,
                payload BLOB NOT NULL,
                state TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                queued_at TEXT,
                attempted_at TEXT,
                completed_at TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_bot_commands_state ON bot_commands(state)",
            [],
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("sqlite connection lock poisoned".to_string()))
    }

    pub fn find_by_key(&self, key: &IdempotencyKey) -> Result<Option<BotCommand>, StorageError> {
        let conn = self.conn()?;
        select_one(&conn, "idempotency_key", key.as_str())
    }
}

/// Raw column values; timestamps are stored as RFC 3339 text.
struct CommandRow {
    id: String,
    idempotency_key: String,
    channel: String,
    payload: Vec<u8>,
    state: String,
    retry_count: u32,
    last_error: Option<String>,
    queued_at: Option<String>,
    attempted_at: Option<String>,
    completed_at: Option<String>,
    created_at: String,
}

impl CommandRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            idempotency_key: row.get(1)?,
            channel: row.get(2)?,
            payload: row.get(3)?,
            state: row.get(4)?,
            retry_count: row.get(5)?,
            last_error: row.get(6)?,
            queued_at: row.get(7)?,
            attempted_at: row.get(8)?,
            completed_at: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_command(self) -> Result<BotCommand, StorageError> {
        Ok(BotCommand {
            id: BotCommandId::new(self.id),
            channel: self.channel,
            payload: self.payload,
            idempotency_key: IdempotencyKey::new(self.idempotency_key),
            state: self.state.parse().map_err(|e| {
                StorageError::Serialization(format!("bad state {:?}: {}", self.state, e))
            })?,
            retry_count: self.retry_count,
            last_error: self.last_error,
            queued_at: self.queued_at.as_deref().map(parse_time).transpose()?,
            attempted_at: self.attempted_at.as_deref().map(parse_time).transpose()?,
            completed_at: self.completed_at.as_deref().map(parse_time).transpose()?,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("bad timestamp {:?}: {}", raw, e)))
}

fn select_one(
    conn: &Connection,
    column: &str,
    value: &str,
) -> Result<Option<BotCommand>, StorageError> {
    let sql = format!("SELECT {} FROM bot_commands WHERE {} = ?1", COLUMNS, column);
    conn.query_row(&sql, [value], CommandRow::from_row)
        .optional()?
        .map(CommandRow::into_command)
        .transpose()
}

#[async_trait]
impl Repository<BotCommand> for SqliteCommandRepository {
    async fn get(&self, key: &BotCommandId) -> Result<Option<BotCommand>, StorageError> {
        let conn = self.conn()?;
        select_one(&conn, "id", key.as_str())
    }

    async fn save(&self, item: &BotCommand) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO bot_commands ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                    channel = excluded.channel,
                    payload = excluded.payload,
                    state = excluded.state,
                    retry_count = excluded.retry_count,
                    last_error = excluded.last_error,
                    queued_at = excluded.queued_at,
                    attempted_at = excluded.attempted_at,
                    completed_at = excluded.completed_at",
                COLUMNS
            ),
            params![
                item.id.as_str(),
                item.idempotency_key.as_str(),
                item.channel,
                item.payload,
                item.state.as_str(),
                item.retry_count,
                item.last_error,
                item.queued_at.map(|t| t.to_rfc3339()),
                item.attempted_at.map(|t| t.to_rfc3339()),
                item.completed_at.map(|t| t.to_rfc3339()),
                item.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, key: &BotCommandId) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM bot_commands WHERE id = ?1", [key.as_str()])?;
        Ok(())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<BotCommand>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bot_commands ORDER BY id LIMIT ?1 OFFSET ?2",
            COLUMNS
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit, offset], CommandRow::from_row)?;

        let mut commands = Vec::new();
        for row in rows {
            commands.push(row?.into_command()?);
        }
        Ok(commands)
    }
}

#[async_trait]
impl BotCommandRepository for SqliteCommandRepository {
    async fn reserve_command(&self, candidate: &BotCommand) -> Result<Reservation, StorageError> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO bot_commands ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                COLUMNS
            ),
            params![
                candidate.id.as_str(),
                candidate.idempotency_key.as_str(),
                candidate.channel,
                candidate.payload,
                candidate.state.as_str(),
                candidate.retry_count,
                candidate.last_error,
                candidate.queued_at.map(|t| t.to_rfc3339()),
                candidate.attempted_at.map(|t| t.to_rfc3339()),
                candidate.completed_at.map(|t| t.to_rfc3339()),
                candidate.created_at.to_rfc3339(),
            ],
        )?;
        if inserted == 1 {
            return Ok(Reservation::Reserved);
        }

        match select_one(&conn, "idempotency_key", candidate.idempotency_key.as_str())? {
            Some(existing) => Ok(Reservation::Existing(existing)),
            None => Err(StorageError::Unavailable(format!(
                "command id {} collided with an existing row",
                candidate.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn command(id: &str, key: &str) -> BotCommand {
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 8, 30, 0).unwrap();
        BotCommand::new(id.into(), "discord", vec![0, 1, 2, 255], key.into(), at).unwrap()
    }

    #[tokio::test]
    async fn reserve_then_read_back() {
        let repo = SqliteCommandRepository::in_memory().unwrap();
        let c = command("c1", "k1");
        assert_eq!(repo.reserve_command(&c).await.unwrap(), Reservation::Reserved);
        assert_eq!(repo.get(&c.id).await.unwrap(), Some(c.clone()));
        assert_eq!(repo.find_by_key(&"k1".into()).unwrap(), Some(c));
    }

    #[tokio::test]
    async fn second_reservation_sees_owner() {
        let repo = SqliteCommandRepository::in_memory().unwrap();
        let owner = command("c1", "k1");
        repo.reserve_command(&owner).await.unwrap();

        match repo.reserve_command(&command("c2", "k1")).await.unwrap() {
            Reservation::Existing(existing) => assert_eq!(existing.id, owner.id),
            Reservation::Reserved => panic!("key reserved twice"),
        }
        assert_eq!(repo.list(10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_updates_state() {
        let repo = SqliteCommandRepository::in_memory().unwrap();
        let mut c = command("c1", "k1");
        repo.reserve_command(&c).await.unwrap();

        let later = c.created_at + chrono::Duration::seconds(30);
        c.mark_attempt(later, Err("worker crashed".into())).unwrap();
        repo.save(&c).await.unwrap();

        let stored = repo.get(&c.id).await.unwrap().unwrap();
        assert!(stored.is_failed());
        assert_eq!(stored.retry_count, 1);
        assert_eq!(stored.last_error.as_deref(), Some("worker crashed"));
        assert_eq!(stored.attempted_at, Some(later));
    }

    #[tokio::test]
    async fn queue_acknowledgement_is_stored() {
        let repo = SqliteCommandRepository::in_memory().unwrap();
        let mut c = command("c1", "k1");
        repo.reserve_command(&c).await.unwrap();
        assert_eq!(repo.get(&c.id).await.unwrap().unwrap().queued_at, None);

        c.mark_queued(c.created_at).unwrap();
        repo.save(&c).await.unwrap();
        assert_eq!(repo.get(&c.id).await.unwrap().unwrap().queued_at, Some(c.created_at));
    }

    #[tokio::test]
    async fn list_pages_in_id_order() {
        let repo = SqliteCommandRepository::in_memory().unwrap();
        for i in 0..5 {
            repo.save(&command(&format!("c{}", i), &format!("k{}", i))).await.unwrap();
        }
        let page: Vec<_> = repo
            .list(2, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(page, vec!["c1", "c2"]);

        repo.delete(&"c1".into()).await.unwrap();
        assert_eq!(repo.list(10, 0).await.unwrap().len(), 4);
    }

    #[test]
    fn file_database_persists_between_opens() {
        let path = std::env::temp_dir().join(format!("arena-core-{}.db", uuid::Uuid::new_v4()));
        {
            let repo = SqliteCommandRepository::open(&path).unwrap();
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(repo.save(&command("c1", "k1"))).unwrap();
        }
        let repo = SqliteCommandRepository::open(&path).unwrap();
        assert!(repo.find_by_key(&"k1".into()).unwrap().is_some());
        let _ = std::fs::remove_file(&path);
    }
}
