//! Contracts for the external authoritative backend
//!
//! Every call here may be slow or fail independently of local storage. The
//! command services wrap each call in the configured deadline and decide,
//! per operation, whether a failure leaves local state untouched or not.

use async_trait::async_trait;
use serde::Serialize;

use crate::application::errors::ProviderError;
use crate::domain::entities::{BotCommand, Event, Role, Tournament};
use crate::domain::shared::{BattleId, BotCommandId, GroupId, Metadata, PlayerId, TournamentId};

/// Snapshot of a tournament in the backend's native units: unix seconds
/// for times (0 for "no end time") and whole seconds for the duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTournamentParams {
    pub id: String,
    pub authoritative: bool,
    pub sort_order: String,
    pub operator: String,
    pub reset_schedule: String,
    pub title: String,
    pub description: String,
    pub category: u32,
    pub start_time: i64,
    pub end_time: i64,
    pub duration: i64,
    pub max_size: u32,
    pub max_num_score: u32,
    pub join_required: bool,
}

impl From<&Tournament> for CreateTournamentParams {
    fn from(t: &Tournament) -> Self {
        Self {
            id: t.id.to_string(),
            authoritative: t.authoritative,
            sort_order: t.sort_order.as_str().to_string(),
            operator: t.operator.as_str().to_string(),
            reset_schedule: t.reset_schedule.clone(),
            title: t.title.clone(),
            description: t.description.clone(),
            category: t.category,
            start_time: t.start_time.timestamp(),
            end_time: t.end_time.map(|e| e.timestamp()).unwrap_or(0),
            duration: t.duration.num_seconds(),
            max_size: t.max_size,
            max_num_score: t.max_num_score,
            join_required: t.join_required,
        }
    }
}

#[async_trait]
pub trait TournamentProvider: Send + Sync {
    async fn create_tournament(&self, params: &CreateTournamentParams) -> Result<(), ProviderError>;

    async fn delete_tournament(&self, id: &TournamentId) -> Result<(), ProviderError>;

    async fn add_attempt(
        &self,
        tournament_id: &TournamentId,
        player_id: &PlayerId,
        count: i64,
    ) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartMatchPayload {
    pub leader_id: PlayerId,
    pub metadata: Metadata,
    pub preset: String,
}

/// Identifiers minted by the match backend
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCreated {
    pub battle_id: BattleId,
    pub match_id: String,
}

#[async_trait]
pub trait MatchProvider: Send + Sync {
    async fn create_match(
        &self,
        payload: &StartMatchPayload,
    ) -> Result<MatchCreated, ProviderError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCredentials {
    pub device_id: String,
    pub username: String,
    pub email: Option<String>,
    pub platform: Option<String>,
}

#[derive(Clone, PartialEq)]
pub struct EmailCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for EmailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session issued by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResult {
    pub user_id: PlayerId,
    pub session_token: String,
    pub refresh_token: String,
    pub username: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate_device(
        &self,
        credentials: &DeviceCredentials,
    ) -> Result<AuthResult, ProviderError>;

    async fn authenticate_email(
        &self,
        credentials: &EmailCredentials,
    ) -> Result<AuthResult, ProviderError>;
}

/// Analytics sink. A batch is delivered as a whole or reported as failed.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, events: &[Event]) -> Result<(), ProviderError>;
}

/// Downstream worker queue for accepted bot commands
#[async_trait]
pub trait CommandQueue: Send + Sync {
    async fn enqueue(&self, command: &BotCommand) -> Result<(), ProviderError>;
}

/// Player-facing notification payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    CommandAccepted { command_id: BotCommandId, channel: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        player_id: &PlayerId,
        notification: &Notification,
    ) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateGroupPayload {
    pub name: String,
    pub description: String,
    pub creator_id: PlayerId,
    pub avatar_url: String,
    pub lang_tag: String,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateGroupResult {
    pub group_id: GroupId,
    pub handle: String,
}

#[async_trait]
pub trait GroupProvider: Send + Sync {
    async fn create_group(
        &self,
        payload: &CreateGroupPayload,
    ) -> Result<CreateGroupResult, ProviderError>;

    async fn update_metadata(
        &self,
        group_id: &GroupId,
        metadata: &Metadata,
    ) -> Result<(), ProviderError>;

    async fn update_member_role(
        &self,
        group_id: &GroupId,
        player_id: &PlayerId,
        role: Role,
    ) -> Result<(), ProviderError>;
}
