//! Console adapter for development/testing
//!
//! Stands in for the authoritative backend during local runs: every call is
//! logged and succeeds, and ids are minted locally.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::errors::ProviderError;
use crate::domain::entities::{BotCommand, Event, Role};
use crate::domain::shared::{GroupId, Metadata, PlayerId, TournamentId};
use crate::domain::traits::{
    AuthProvider, AuthResult, CommandQueue, CreateGroupPayload, CreateGroupResult,
    CreateTournamentParams, DeviceCredentials, EmailCredentials, EventDispatcher, GroupProvider,
    MatchCreated, MatchProvider, Notification, Notifier, StartMatchPayload, TournamentProvider,
};

/// Logging backend for local development
pub struct ConsoleBackend {
    name: String,
    calls: AtomicU64,
}

impl ConsoleBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicU64::new(0),
        }
    }

    /// Number of backend calls served so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn mint(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, uuid::Uuid::new_v4())
    }

    fn record(&self, op: &str, detail: impl std::fmt::Display) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        tracing::info!("[{}] {} {}", self.name, op, detail);
    }
}

impl Default for ConsoleBackend {
    fn default() -> Self {
        Self::new("console")
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ProviderError> {
    serde_json::to_string(value)
        .map_err(|e| ProviderError::Rejected(format!("unserializable payload: {}", e)))
}

#[async_trait]
impl TournamentProvider for ConsoleBackend {
    async fn create_tournament(
        &self,
        params: &CreateTournamentParams,
    ) -> Result<(), ProviderError> {
        self.record("create_tournament", to_json(params)?);
        Ok(())
    }

    async fn delete_tournament(&self, id: &TournamentId) -> Result<(), ProviderError> {
        self.record("delete_tournament", id);
        Ok(())
    }

    async fn add_attempt(
        &self,
        tournament_id: &TournamentId,
        player_id: &PlayerId,
        count: i64,
    ) -> Result<(), ProviderError> {
        self.record("add_attempt", format!("{} {} +{}", tournament_id, player_id, count));
        Ok(())
    }
}

#[async_trait]
impl MatchProvider for ConsoleBackend {
    async fn create_match(
        &self,
        payload: &StartMatchPayload,
    ) -> Result<MatchCreated, ProviderError> {
        self.record("create_match", to_json(payload)?);
        Ok(MatchCreated {
            battle_id: self.mint("battle").into(),
            match_id: self.mint("match"),
        })
    }
}

#[async_trait]
impl AuthProvider for ConsoleBackend {
    async fn authenticate_device(
        &self,
        credentials: &DeviceCredentials,
    ) -> Result<AuthResult, ProviderError> {
        self.record("authenticate_device", &credentials.device_id);
        Ok(AuthResult {
            user_id: format!("device-{}", credentials.device_id).into(),
            session_token: self.mint("session"),
            refresh_token: self.mint("refresh"),
            username: credentials.username.clone(),
        })
    }

    async fn authenticate_email(
        &self,
        credentials: &EmailCredentials,
    ) -> Result<AuthResult, ProviderError> {
        self.record("authenticate_email", &credentials.email);
        let username = credentials.email.split('@').next().unwrap_or_default().to_string();
        Ok(AuthResult {
            user_id: format!("email-{}", credentials.email).into(),
            session_token: self.mint("session"),
            refresh_token: self.mint("refresh"),
            username,
        })
    }
}

#[async_trait]
impl EventDispatcher for ConsoleBackend {
    async fn dispatch(&self, events: &[Event]) -> Result<(), ProviderError> {
        for event in events {
            event.validate().map_err(|e| ProviderError::Rejected(e.to_string()))?;
        }
        self.record("dispatch", to_json(&events)?);
        Ok(())
    }
}

#[async_trait]
impl CommandQueue for ConsoleBackend {
    async fn enqueue(&self, command: &BotCommand) -> Result<(), ProviderError> {
        self.record(
            "enqueue",
            format!("{} on {} ({} bytes)", command.id, command.channel, command.payload.len()),
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for ConsoleBackend {
    async fn notify(
        &self,
        player_id: &PlayerId,
        notification: &Notification,
    ) -> Result<(), ProviderError> {
        self.record("notify", format!("{} {}", player_id, to_json(notification)?));
        Ok(())
    }
}

#[async_trait]
impl GroupProvider for ConsoleBackend {
    async fn create_group(
        &self,
        payload: &CreateGroupPayload,
    ) -> Result<CreateGroupResult, ProviderError> {
        self.record("create_group", to_json(payload)?);
        Ok(CreateGroupResult {
            group_id: self.mint("group").into(),
            handle: payload.name.to_lowercase().replace(' ', "-"),
        })
    }

    async fn update_metadata(
        &self,
        group_id: &GroupId,
        metadata: &Metadata,
    ) -> Result<(), ProviderError> {
        self.record("update_metadata", format!("{} {}", group_id, to_json(metadata)?));
        Ok(())
    }

    async fn update_member_role(
        &self,
        group_id: &GroupId,
        player_id: &PlayerId,
        role: Role,
    ) -> Result<(), ProviderError> {
        self.record("update_member_role", format!("{} {} {}", group_id, player_id, role));
        Ok(())
    }
}
