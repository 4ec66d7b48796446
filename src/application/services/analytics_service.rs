//! Analytics session orchestration
//!
//! Sessions are recorded locally before their events are dispatched. A
//! dispatch failure is reported as [`ServiceError::DispatchFailed`] and
//! never undoes the session change.

use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::ServiceError;
use crate::application::services::deadline::{with_deadline, DEFAULT_PROVIDER_TIMEOUT};
use crate::application::services::key_lock::KeyedLock;
use crate::domain::entities::{Event, EventContext, EventName, LibraryInfo, Session};
use crate::domain::shared::PlayerId;
use crate::domain::traits::{Clock, EventDispatcher, Repository, SystemClock};

/// Context stamped on events when none is configured
pub fn default_context() -> EventContext {
    EventContext {
        direct: true,
        library: LibraryInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackEvent {
    pub user_id: PlayerId,
    pub name: String,
    pub app_name: String,
    pub app_version: String,
    pub os_name: String,
    pub os_version: String,
}

pub struct AnalyticsService {
    sessions: Arc<dyn Repository<Session>>,
    dispatcher: Arc<dyn EventDispatcher>,
    context: EventContext,
    clock: Arc<dyn Clock>,
    provider_timeout: Duration,
    locks: KeyedLock,
}

impl AnalyticsService {
    pub fn new(
        sessions: Arc<dyn Repository<Session>>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            sessions,
            dispatcher,
            context: default_context(),
            clock: Arc::new(SystemClock),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            locks: KeyedLock::new(),
        }
    }

    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Records a new session and dispatches identify + start as one batch.
    pub async fn start_session(
        &self,
        user_id: PlayerId,
        version: &str,
        variant: &str,
    ) -> Result<Session, ServiceError> {
        let now = self.clock.now();
        let session = Session::new(user_id, version, variant, now)?;
        let identify = Event::identify(session.user_id.clone(), self.context.clone(), now)?;
        let start = Event::track(
            session.user_id.clone(),
            EventName::start(),
            self.context.clone(),
            now,
        )?
        .with_app_info(variant, version)
        .with_os_info(std::env::consts::OS, std::env::consts::ARCH);

        let _guard = self.locks.lock(session.user_id.as_str()).await;
        self.sessions.save(&session).await?;

        let events = [identify, start];
        let dispatched = with_deadline(self.provider_timeout, self.dispatcher.dispatch(&events));
        if let Err(e) = dispatched.await {
            tracing::warn!(
                "Session for {} recorded but start events were not delivered: {}",
                session.user_id,
                e
            );
            return Err(ServiceError::DispatchFailed(e));
        }
        tracing::info!("Started session for {} ({} {})", session.user_id, variant, version);
        Ok(session)
    }

    /// Ends the active session, dispatches the end event and removes the record.
    ///
    /// The record is removed whether or not the dispatch succeeded.
    pub async fn end_session(&self, user_id: &PlayerId) -> Result<Session, ServiceError> {
        user_id.validate()?;
        let _guard = self.locks.lock(user_id.as_str()).await;

        let mut session = self
            .sessions
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Session>(user_id))?;
        let now = self.clock.now();
        session.end(now)?;
        self.sessions.save(&session).await?;

        let end = Event::track(user_id.clone(), EventName::end(), self.context.clone(), now)?;
        let dispatched =
            with_deadline(self.provider_timeout, self.dispatcher.dispatch(&[end])).await;

        if let Err(e) = self.sessions.delete(user_id).await {
            tracing::warn!("Could not remove ended session for {}: {}", user_id, e);
        }

        match dispatched {
            Ok(()) => {
                tracing::info!(
                    "Ended session for {} after {}s",
                    user_id,
                    session.duration(now).num_seconds()
                );
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(
                    "Session for {} ended but end event was not delivered: {}",
                    user_id,
                    e
                );
                Err(ServiceError::DispatchFailed(e))
            }
        }
    }

    /// Dispatches a custom track event. No local state is involved.
    pub async fn track_event(&self, cmd: TrackEvent) -> Result<(), ServiceError> {
        let now = self.clock.now();
        let mut event =
            Event::track(cmd.user_id, EventName::new(cmd.name), self.context.clone(), now)?;
        if !cmd.app_name.is_empty() || !cmd.app_version.is_empty() {
            event = event.with_app_info(cmd.app_name, cmd.app_version);
        }
        if !cmd.os_name.is_empty() || !cmd.os_version.is_empty() {
            event = event.with_os_info(cmd.os_name, cmd.os_version);
        }
        event.validate()?;

        with_deadline(self.provider_timeout, self.dispatcher.dispatch(&[event]))
            .await
            .map_err(ServiceError::Provider)
    }

    pub async fn get_session(&self, user_id: &PlayerId) -> Result<Session, ServiceError> {
        self.sessions
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Session>(user_id))
    }
}
