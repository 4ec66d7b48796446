//! Analytics session aggregate

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::domain::errors::DomainError;
use crate::domain::shared::PlayerId;
use crate::domain::traits::Aggregate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => f.write_str("active"),
            SessionState::Ended => f.write_str("ended"),
        }
    }
}

/// A user's app session, keyed by user id
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: PlayerId,
    pub state: SessionState,
    pub version: String,
    pub variant: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        user_id: PlayerId,
        version: impl Into<String>,
        variant: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        user_id.validate()?;
        let version = version.into();
        if version.trim().is_empty() {
            return Err(DomainError::Required("version"));
        }
        Ok(Self {
            user_id,
            state: SessionState::Active,
            version,
            variant: variant.into(),
            started_at,
            ended_at: None,
        })
    }

    pub fn end(&mut self, ended_at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.state == SessionState::Ended {
            return Err(DomainError::AlreadyEnded("session"));
        }
        if ended_at < self.started_at {
            return Err(DomainError::EndBeforeStart);
        }
        self.state = SessionState::Ended;
        self.ended_at = Some(ended_at);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Exact length of an ended session; for an active one, time elapsed until `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        match self.ended_at {
            Some(ended_at) => ended_at - self.started_at,
            None => now - self.started_at,
        }
    }
}

impl Aggregate for Session {
    type Key = PlayerId;
    const KIND: &'static str = "session";

    fn key(&self) -> PlayerId {
        self.user_id.clone()
    }
}
