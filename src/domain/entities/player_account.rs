//! Player account aggregate - authentication and session policy

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::errors::DomainError;
use crate::domain::shared::{IdempotencyKey, PlayerId};
use crate::domain::traits::Aggregate;

/// Device claims trusted during authentication
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFingerprint {
    pub id: String,
    pub platform: Option<String>,
    pub last_seen: DateTime<Utc>,
}

/// One issued session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub session_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            ip_address: None,
            user_agent: None,
            issued_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAccount {
    pub id: PlayerId,
    pub email: Option<String>,
    pub display_name: String,
    pub devices: BTreeMap<String, DeviceFingerprint>,
    pub sessions: Vec<SessionRecord>,
    pub suspended: bool,
    pub suspension_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerAccount {
    /// Device-authenticated players may not have an email yet; when one is
    /// supplied it must look like an address.
    pub fn new(
        id: PlayerId,
        email: Option<String>,
        display_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        id.validate()?;
        let email = match email {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) if !raw.contains('@') => return Err(DomainError::Required("valid email")),
            other => other,
        };
        Ok(Self {
            id,
            email,
            display_name: display_name.into(),
            devices: BTreeMap::new(),
            sessions: Vec::new(),
            suspended: false,
            suspension_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Registers or refreshes a device fingerprint.
    pub fn register_device(
        &mut self,
        device: DeviceFingerprint,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if device.id.trim().is_empty() {
            return Err(DomainError::DeviceInvalid("device id is required".to_string()));
        }
        self.devices.insert(device.id.clone(), device);
        self.updated_at = now;
        Ok(())
    }

    pub fn record_session(
        &mut self,
        session: SessionRecord,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if session.session_id.trim().is_empty() {
            return Err(DomainError::Required("session id"));
        }
        self.sessions.push(session);
        self.updated_at = now;
        Ok(())
    }

    pub fn suspend(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.suspended = true;
        self.suspension_message = Some(message.into());
        self.updated_at = now;
    }

    pub fn reinstate(&mut self, now: DateTime<Utc>) {
        self.suspended = false;
        self.suspension_message = None;
        self.updated_at = now;
    }

    pub fn can_start_battle(&self, key: &IdempotencyKey) -> Result<(), DomainError> {
        self.ensure_active()?;
        key.validate()
    }

    pub fn latest_session(&self) -> Option<&SessionRecord> {
        self.sessions.last()
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.suspended {
            return Err(DomainError::AccountSuspended(
                self.suspension_message.clone().unwrap_or_default(),
            ));
        }
        Ok(())
    }
}

impl Aggregate for PlayerAccount {
    type Key = PlayerId;
    const KIND: &'static str = "player account";

    fn key(&self) -> PlayerId {
        self.id.clone()
    }
}
