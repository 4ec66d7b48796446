//! Test doubles shared by the service unit tests

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::errors::ProviderError;
use crate::domain::entities::{BotCommand, Event, Role};
use crate::domain::shared::{GroupId, Metadata, PlayerId, TournamentId};
use crate::domain::traits::{
    AuthProvider, AuthResult, CommandQueue, CreateGroupPayload, CreateGroupResult,
    CreateTournamentParams, DeviceCredentials, EmailCredentials, EventDispatcher, GroupProvider,
    ManualClock, MatchCreated, MatchProvider, Notification, Notifier, StartMatchPayload,
    TournamentProvider,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(t0()))
}

/// Records every backend call and fails the operations it is told to.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    delay: Mutex<Option<Duration>>,
    events: Mutex<Vec<Event>>,
    seq: AtomicU64,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn stall(&self, by: Duration) {
        *self.delay.lock().unwrap() = Some(by);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.split(' ').next() == Some(op)).count()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn call(&self, op: &'static str, detail: String) -> Result<(), ProviderError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(format!("{} {}", op, detail));
        if self.failing.lock().unwrap().contains(op) {
            return Err(ProviderError::Unavailable(format!("{} failed", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl TournamentProvider for FakeBackend {
    async fn create_tournament(
        &self,
        params: &CreateTournamentParams,
    ) -> Result<(), ProviderError> {
        self.call("create_tournament", params.id.clone()).await
    }

    async fn delete_tournament(&self, id: &TournamentId) -> Result<(), ProviderError> {
        self.call("delete_tournament", id.to_string()).await
    }

    async fn add_attempt(
        &self,
        tournament_id: &TournamentId,
        player_id: &PlayerId,
        count: i64,
    ) -> Result<(), ProviderError> {
        self.call("add_attempt", format!("{}/{}/{}", tournament_id, player_id, count)).await
    }
}

#[async_trait]
impl MatchProvider for FakeBackend {
    async fn create_match(
        &self,
        payload: &StartMatchPayload,
    ) -> Result<MatchCreated, ProviderError> {
        self.call("create_match", payload.leader_id.to_string()).await?;
        Ok(MatchCreated {
            battle_id: self.next_id("battle").into(),
            match_id: self.next_id("match"),
        })
    }
}

#[async_trait]
impl AuthProvider for FakeBackend {
    async fn authenticate_device(
        &self,
        credentials: &DeviceCredentials,
    ) -> Result<AuthResult, ProviderError> {
        self.call("authenticate_device", credentials.device_id.clone()).await?;
        Ok(AuthResult {
            user_id: format!("user-{}", credentials.device_id).into(),
            session_token: self.next_id("session"),
            refresh_token: self.next_id("refresh"),
            username: credentials.username.clone(),
        })
    }

    async fn authenticate_email(
        &self,
        credentials: &EmailCredentials,
    ) -> Result<AuthResult, ProviderError> {
        self.call("authenticate_email", credentials.email.clone()).await?;
        Ok(AuthResult {
            user_id: format!("user-{}", credentials.email).into(),
            session_token: self.next_id("session"),
            refresh_token: self.next_id("refresh"),
            username: "emailed".to_string(),
        })
    }
}

#[async_trait]
impl EventDispatcher for FakeBackend {
    async fn dispatch(&self, events: &[Event]) -> Result<(), ProviderError> {
        self.call("dispatch", events.len().to_string()).await?;
        self.events.lock().unwrap().extend_from_slice(events);
        Ok(())
    }
}

#[async_trait]
impl CommandQueue for FakeBackend {
    async fn enqueue(&self, command: &BotCommand) -> Result<(), ProviderError> {
        self.call("enqueue", command.id.to_string()).await
    }
}

#[async_trait]
impl Notifier for FakeBackend {
    async fn notify(
        &self,
        player_id: &PlayerId,
        _notification: &Notification,
    ) -> Result<(), ProviderError> {
        self.call("notify", player_id.to_string()).await
    }
}

#[async_trait]
impl GroupProvider for FakeBackend {
    async fn create_group(
        &self,
        payload: &CreateGroupPayload,
    ) -> Result<CreateGroupResult, ProviderError> {
        self.call("create_group", payload.name.clone()).await?;
        Ok(CreateGroupResult {
            group_id: self.next_id("group").into(),
            handle: payload.name.to_lowercase(),
        })
    }

    async fn update_metadata(
        &self,
        group_id: &GroupId,
        metadata: &Metadata,
    ) -> Result<(), ProviderError> {
        self.call("update_metadata", format!("{}/{}", group_id, metadata.len())).await
    }

    async fn update_member_role(
        &self,
        group_id: &GroupId,
        player_id: &PlayerId,
        role: Role,
    ) -> Result<(), ProviderError> {
        self.call("update_member_role", format!("{}/{}/{}", group_id, player_id, role)).await
    }
}
