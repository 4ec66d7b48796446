//! Domain errors raised by aggregate factories and mutators

use thiserror::Error;

use crate::domain::shared::PlayerId;

/// How a domain error should be surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input
    Validation,
    /// Illegal state transition or duplicate membership
    Conflict,
    /// Referenced member of an aggregate does not exist
    NotFound,
    /// Account-level gate
    Suspended,
}

/// Every failure an aggregate can report. A mutator that returns one of
/// these has left its receiver untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{kind} is required")]
    EmptyIdentifier { kind: &'static str },

    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be non-negative")]
    Negative(&'static str),

    #[error("attempt count must be positive, got {0}")]
    InvalidAttemptCount(i64),

    #[error("end time cannot be before start time")]
    EndBeforeStart,

    #[error("{kind} {id} already exists with a different definition")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("{0} already ended")]
    AlreadyEnded(&'static str),

    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("player {0} already joined battle")]
    PlayerAlreadyJoined(PlayerId),

    #[error("player {0} not in battle")]
    PlayerNotFound(PlayerId),

    #[error("player {0} is already a group member")]
    AlreadyMember(PlayerId),

    #[error("group member {0} not found")]
    MemberNotFound(PlayerId),

    #[error("player account suspended: {0}")]
    AccountSuspended(String),

    #[error("device fingerprint invalid: {0}")]
    DeviceInvalid(String),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::AlreadyEnded(_)
            | DomainError::AlreadyExists { .. }
            | DomainError::InvalidTransition { .. }
            | DomainError::PlayerAlreadyJoined(_)
            | DomainError::AlreadyMember(_) => ErrorKind::Conflict,
            DomainError::PlayerNotFound(_) | DomainError::MemberNotFound(_) => ErrorKind::NotFound,
            DomainError::AccountSuspended(_) => ErrorKind::Suspended,
            _ => ErrorKind::Validation,
        }
    }

    pub(crate) fn transition(entity: &'static str, from: impl ToString, to: impl ToString) -> Self {
        DomainError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
