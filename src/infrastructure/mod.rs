//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: In-memory repositories
//! - Database: SQLite bot-command store
//! - Adapters: Backend stand-ins (console)

pub mod adapters;
pub mod config;
pub mod database;
pub mod storage;
