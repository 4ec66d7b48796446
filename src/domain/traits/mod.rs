//! Domain traits - Abstractions for infrastructure implementations

pub mod aggregate;
pub mod clock;
pub mod provider;
pub mod repository;

pub use aggregate::Aggregate;
pub use clock::{Clock, ManualClock, SystemClock};
pub use provider::{
    AuthProvider, AuthResult, CommandQueue, CreateGroupPayload, CreateGroupResult,
    CreateTournamentParams, DeviceCredentials, EmailCredentials, EventDispatcher, GroupProvider,
    MatchCreated, MatchProvider, Notification, Notifier, StartMatchPayload, TournamentProvider,
};
pub use repository::{
    BotCommandRepository, LeaderboardRepository, ParticipantRepository, Repository, Reservation,
    TournamentRepository,
};
