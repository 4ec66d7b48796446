//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};

use arena_core::domain::entities::{BotCommand, Event, Role};
use arena_core::domain::shared::{GroupId, Metadata, PlayerId, TournamentId};
use arena_core::domain::traits::{
    AuthProvider, AuthResult, CommandQueue, CreateGroupPayload, CreateGroupResult,
    CreateTournamentParams, DeviceCredentials, EmailCredentials, EventDispatcher, GroupProvider,
    ManualClock, MatchCreated, MatchProvider, Notification, Notifier, StartMatchPayload,
    TournamentProvider,
};
use arena_core::ProviderError;

static INIT: Once = Once::new();

pub fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2031, 3, 1, 9, 0, 0).unwrap()
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start()))
}

/// Backend that logs each call in order and fails the ones it is told to.
#[derive(Default)]
pub struct RecordingBackend {
    log: Mutex<Vec<String>>,
    broken: Mutex<HashSet<&'static str>>,
    events: Mutex<Vec<Event>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn break_op(&self, op: &'static str) {
        self.broken.lock().unwrap().insert(op);
    }

    pub fn fix_op(&self, op: &'static str) {
        self.broken.lock().unwrap().remove(op);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn ops(&self, op: &str) -> usize {
        self.log().iter().filter(|line| line.starts_with(op)).count()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn hit(&self, op: &'static str, detail: impl std::fmt::Display) -> Result<(), ProviderError> {
        self.log.lock().unwrap().push(format!("{}:{}", op, detail));
        if self.broken.lock().unwrap().contains(op) {
            return Err(ProviderError::Unavailable(format!("{} is down", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl TournamentProvider for RecordingBackend {
    async fn create_tournament(
        &self,
        params: &CreateTournamentParams,
    ) -> Result<(), ProviderError> {
        self.hit("create_tournament", &params.id)
    }

    async fn delete_tournament(&self, id: &TournamentId) -> Result<(), ProviderError> {
        self.hit("delete_tournament", id)
    }

    async fn add_attempt(
        &self,
        tournament_id: &TournamentId,
        player_id: &PlayerId,
        count: i64,
    ) -> Result<(), ProviderError> {
        self.hit("add_attempt", format!("{}/{}/{}", tournament_id, player_id, count))
    }
}

#[async_trait]
impl MatchProvider for RecordingBackend {
    async fn create_match(
        &self,
        payload: &StartMatchPayload,
    ) -> Result<MatchCreated, ProviderError> {
        self.hit("create_match", &payload.leader_id)?;
        let n = self.ops("create_match");
        Ok(MatchCreated {
            battle_id: format!("b{}", n).into(),
            match_id: format!("m{}", n),
        })
    }
}

#[async_trait]
impl AuthProvider for RecordingBackend {
    async fn authenticate_device(
        &self,
        credentials: &DeviceCredentials,
    ) -> Result<AuthResult, ProviderError> {
        self.hit("authenticate_device", &credentials.device_id)?;
        Ok(AuthResult {
            user_id: format!("u-{}", credentials.device_id).into(),
            session_token: format!("s{}", self.ops("authenticate_device")),
            refresh_token: "r".to_string(),
            username: credentials.username.clone(),
        })
    }

    async fn authenticate_email(
        &self,
        credentials: &EmailCredentials,
    ) -> Result<AuthResult, ProviderError> {
        self.hit("authenticate_email", &credentials.email)?;
        Ok(AuthResult {
            user_id: format!("u-{}", credentials.email).into(),
            session_token: format!("s{}", self.ops("authenticate_email")),
            refresh_token: "r".to_string(),
            username: credentials.email.clone(),
        })
    }
}

#[async_trait]
impl EventDispatcher for RecordingBackend {
    async fn dispatch(&self, events: &[Event]) -> Result<(), ProviderError> {
        self.hit("dispatch", events.len())?;
        self.events.lock().unwrap().extend_from_slice(events);
        Ok(())
    }
}

#[async_trait]
impl CommandQueue for RecordingBackend {
    async fn enqueue(&self, command: &BotCommand) -> Result<(), ProviderError> {
        self.hit("enqueue", &command.idempotency_key)
    }
}

#[async_trait]
impl Notifier for RecordingBackend {
    async fn notify(
        &self,
        player_id: &PlayerId,
        _notification: &Notification,
    ) -> Result<(), ProviderError> {
        self.hit("notify", player_id)
    }
}

#[async_trait]
impl GroupProvider for RecordingBackend {
    async fn create_group(
        &self,
        payload: &CreateGroupPayload,
    ) -> Result<CreateGroupResult, ProviderError> {
        self.hit("create_group", &payload.name)?;
        Ok(CreateGroupResult {
            group_id: format!("g{}", self.ops("create_group")).into(),
            handle: payload.name.to_lowercase(),
        })
    }

    async fn update_metadata(
        &self,
        group_id: &GroupId,
        metadata: &Metadata,
    ) -> Result<(), ProviderError> {
        self.hit("update_metadata", format!("{}/{}", group_id, metadata.len()))
    }

    async fn update_member_role(
        &self,
        group_id: &GroupId,
        player_id: &PlayerId,
        role: Role,
    ) -> Result<(), ProviderError> {
        self.hit("update_member_role", format!("{}/{}/{}", group_id, player_id, role))
    }
}
