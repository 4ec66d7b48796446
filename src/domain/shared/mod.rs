//! Shared kernel - identifiers and value types used by every bounded context

pub mod ids;
pub mod metadata;

pub use ids::{BattleId, BotCommandId, GroupId, IdempotencyKey, PlayerId, SeasonId, TournamentId};
pub use metadata::{Metadata, MetadataValue};
