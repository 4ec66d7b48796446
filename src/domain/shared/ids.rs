//! Typed identifiers
//!
//! Every entity kind gets its own newtype over `String` so a `PlayerId` can
//! never be handed to something expecting a `GroupId`. Values are opaque; the
//! only rule is that the trimmed value must not be blank.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::DomainError;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Fails with `EmptyIdentifier` when the trimmed value is blank.
            pub fn validate(&self) -> Result<(), DomainError> {
                if self.0.trim().is_empty() {
                    return Err(DomainError::EmptyIdentifier { kind: $kind });
                }
                Ok(())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Player (user) identifier
    PlayerId,
    "player id"
);
define_id!(
    /// Group identifier
    GroupId,
    "group id"
);
define_id!(
    /// Battle identifier, minted by the match provider
    BattleId,
    "battle id"
);
define_id!(
    /// Leaderboard season identifier
    SeasonId,
    "season id"
);
define_id!(
    /// Bot command identifier
    BotCommandId,
    "bot command id"
);
define_id!(
    /// Tournament identifier
    TournamentId,
    "tournament id"
);
define_id!(
    /// Caller-supplied token naming one logical intent
    IdempotencyKey,
    "idempotency key"
);
