//! arena-core - command orchestration for tournaments, battles, bot
//! commands, player accounts, analytics sessions, groups and leaderboards.
//!
//! Layers:
//! - `domain`: identifiers, aggregates and the storage/backend/clock traits
//! - `application`: the command services and their error taxonomy
//! - `infrastructure`: configuration, in-memory and SQLite stores, console backend

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::errors::{ConfigError, ProviderError, ServiceError, StorageError};
