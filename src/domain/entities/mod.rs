//! Domain entities - one aggregate per bounded context

pub mod battle;
pub mod bot_command;
pub mod event;
pub mod group;
pub mod leaderboard;
pub mod participant;
pub mod player_account;
pub mod session;
pub mod tournament;

pub use battle::{Battle, MatchState, PlayerSlot};
pub use bot_command::{BotCommand, CommandState};
pub use event::{AppInfo, Event, EventContext, EventName, EventType, LibraryInfo, OsInfo};
pub use group::{Group, Membership, Role};
pub use leaderboard::{ScoreSubmission, Season};
pub use participant::{Participant, ParticipantKey};
pub use player_account::{DeviceFingerprint, PlayerAccount, SessionRecord};
pub use session::{Session, SessionState};
pub use tournament::{Operator, SortOrder, Tournament, TournamentDraft, TournamentState};
