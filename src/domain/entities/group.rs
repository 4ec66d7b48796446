//! Group aggregate: membership and role policy

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;
use crate::domain::shared::{GroupId, Metadata, PlayerId};
use crate::domain::traits::Aggregate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            _ => Err(DomainError::Required("role of owner, admin or member")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub player_id: PlayerId,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub members: BTreeMap<PlayerId, Membership>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Creates the group with `owner` as its first member.
    pub fn new(
        id: GroupId,
        name: impl Into<String>,
        owner: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        id.validate()?;
        owner.validate()?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::Required("group name"));
        }

        let mut members = BTreeMap::new();
        members.insert(
            owner.clone(),
            Membership {
                player_id: owner,
                role: Role::Owner,
                joined_at: now,
            },
        );

        Ok(Self {
            id,
            name,
            description: String::new(),
            members,
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn add_member(
        &mut self,
        player_id: PlayerId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        player_id.validate()?;
        if self.members.contains_key(&player_id) {
            return Err(DomainError::AlreadyMember(player_id));
        }
        self.members.insert(
            player_id.clone(),
            Membership {
                player_id,
                role,
                joined_at: now,
            },
        );
        self.updated_at = now;
        Ok(())
    }

    /// Changes a member's role; the original join time is kept.
    pub fn assign_role(
        &mut self,
        player_id: &PlayerId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let member = self
            .members
            .get_mut(player_id)
            .ok_or_else(|| DomainError::MemberNotFound(player_id.clone()))?;
        member.role = role;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_metadata(&mut self, metadata: Metadata, now: DateTime<Utc>) {
        self.metadata = metadata;
        self.updated_at = now;
    }

    pub fn role_of(&self, player_id: &PlayerId) -> Option<Role> {
        self.members.get(player_id).map(|m| m.role)
    }
}

impl Aggregate for Group {
    type Key = GroupId;
    const KIND: &'static str = "group";

    fn key(&self) -> GroupId {
        self.id.clone()
    }
}
