//! Application services - one command service per bounded context
//!
//! Every service follows the same protocol: validate the command, load or
//! construct the aggregate, mutate it through its own methods, then persist
//! and sync with the backend in the order the operation requires.

pub mod analytics_service;
pub mod auth_service;
pub mod battle_service;
pub mod bot_command_service;
pub mod deadline;
pub mod group_service;
pub mod key_lock;
pub mod leaderboard_service;
pub mod tournament_service;

#[cfg(test)]
pub(crate) mod testing;

pub use analytics_service::{AnalyticsService, TrackEvent};
pub use auth_service::AuthService;
pub use battle_service::{BattleService, StartBattle, StartedBattle};
pub use bot_command_service::{BotCommandService, CommandAccepted, SubmitCommand};
pub use deadline::{with_deadline, DEFAULT_PROVIDER_TIMEOUT};
pub use group_service::{CreateGroup, CreatedGroup, GroupService};
pub use key_lock::KeyedLock;
pub use leaderboard_service::{Acknowledged, LeaderboardService, SubmitScore};
pub use tournament_service::TournamentService;
