//! Analytics events

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::domain::errors::DomainError;
use crate::domain::shared::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Identify,
    Track,
}

/// Name of a track event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EventName(String);

impl EventName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn start() -> Self {
        Self::new("start")
    }

    pub fn end() -> Self {
        Self::new("end")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
}

/// Metadata attached to every event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventContext {
    pub direct: bool,
    pub library: LibraryInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub user_id: PlayerId,
    #[serde(rename = "event", skip_serializing_if = "Option::is_none")]
    pub name: Option<EventName>,
    pub context: EventContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<AppInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<OsInfo>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn identify(
        user_id: PlayerId,
        context: EventContext,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        user_id.validate()?;
        Ok(Self {
            event_type: EventType::Identify,
            user_id,
            name: None,
            context,
            app: None,
            os: None,
            timestamp,
        })
    }

    pub fn track(
        user_id: PlayerId,
        name: EventName,
        context: EventContext,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        user_id.validate()?;
        if name.as_str().trim().is_empty() {
            return Err(DomainError::InvalidEvent("event name cannot be empty".to_string()));
        }
        Ok(Self {
            event_type: EventType::Track,
            user_id,
            name: Some(name),
            context,
            app: None,
            os: None,
            timestamp,
        })
    }

    pub fn with_app_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.app = Some(AppInfo {
            name: name.into(),
            version: version.into(),
        });
        self
    }

    pub fn with_os_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.os = Some(OsInfo {
            name: name.into(),
            version: version.into(),
        });
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.user_id.validate()?;
        let unnamed = self.name.as_ref().map_or(true, |n| n.as_str().trim().is_empty());
        if self.event_type == EventType::Track && unnamed {
            return Err(DomainError::InvalidEvent("track events require a name".to_string()));
        }
        Ok(())
    }
}
