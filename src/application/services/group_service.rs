//! Group orchestration
//!
//! The backend mints group ids, so creation goes to the backend first.
//! Role and metadata changes are saved locally and then synced.

use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::ServiceError;
use crate::application::services::deadline::{with_deadline, DEFAULT_PROVIDER_TIMEOUT};
use crate::application::services::key_lock::KeyedLock;
use crate::domain::entities::{Group, Role};
use crate::domain::errors::DomainError;
use crate::domain::shared::{GroupId, Metadata, PlayerId};
use crate::domain::traits::{Clock, CreateGroupPayload, GroupProvider, Repository, SystemClock};

#[derive(Debug, Clone, Default)]
pub struct CreateGroup {
    pub creator_id: PlayerId,
    pub name: String,
    pub description: String,
    pub open: bool,
    pub avatar_url: String,
    pub lang_tag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedGroup {
    pub group_id: GroupId,
    pub handle: String,
}

pub struct GroupService {
    groups: Arc<dyn Repository<Group>>,
    provider: Arc<dyn GroupProvider>,
    clock: Arc<dyn Clock>,
    provider_timeout: Duration,
    locks: KeyedLock,
}

impl GroupService {
    pub fn new(groups: Arc<dyn Repository<Group>>, provider: Arc<dyn GroupProvider>) -> Self {
        Self {
            groups,
            provider,
            clock: Arc::new(SystemClock),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            locks: KeyedLock::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub async fn create_group(&self, cmd: CreateGroup) -> Result<CreatedGroup, ServiceError> {
        cmd.creator_id.validate()?;
        if cmd.name.trim().is_empty() {
            return Err(DomainError::Required("group name").into());
        }

        let payload = CreateGroupPayload {
            name: cmd.name.clone(),
            description: cmd.description.clone(),
            creator_id: cmd.creator_id.clone(),
            avatar_url: cmd.avatar_url,
            lang_tag: cmd.lang_tag,
            open: cmd.open,
        };
        let created = with_deadline(self.provider_timeout, self.provider.create_group(&payload))
            .await
            .map_err(ServiceError::Provider)?;

        let group = Group::new(
            created.group_id.clone(),
            cmd.name,
            cmd.creator_id,
            self.clock.now(),
        )?
        .with_description(cmd.description);
        if let Err(e) = self.groups.save(&group).await {
            tracing::warn!("Group {} exists in the backend but was not saved: {}", group.id, e);
            return Err(e.into());
        }

        tracing::info!("Created group {} ({})", group.id, created.handle);
        Ok(CreatedGroup {
            group_id: created.group_id,
            handle: created.handle,
        })
    }

    /// Adds a member locally.
    pub async fn add_member(
        &self,
        group_id: &GroupId,
        player_id: PlayerId,
        role: Role,
    ) -> Result<Group, ServiceError> {
        group_id.validate()?;
        let _guard = self.locks.lock(group_id.as_str()).await;

        let mut group = self.load(group_id).await?;
        group.add_member(player_id, role, self.clock.now())?;
        self.groups.save(&group).await?;
        Ok(group)
    }

    pub async fn assign_role(
        &self,
        group_id: &GroupId,
        player_id: &PlayerId,
        role: Role,
    ) -> Result<Group, ServiceError> {
        group_id.validate()?;
        player_id.validate()?;
        let _guard = self.locks.lock(group_id.as_str()).await;

        let mut group = self.load(group_id).await?;
        group.assign_role(player_id, role, self.clock.now())?;
        self.groups.save(&group).await?;

        with_deadline(
            self.provider_timeout,
            self.provider.update_member_role(group_id, player_id, role),
        )
        .await
        .map_err(|e| {
            tracing::warn!(
                "Role of {} in {} saved locally but not synced: {}",
                player_id,
                group_id,
                e
            );
            ServiceError::SyncFailed(e)
        })?;
        Ok(group)
    }

    pub async fn update_metadata(
        &self,
        group_id: &GroupId,
        metadata: Metadata,
    ) -> Result<Group, ServiceError> {
        group_id.validate()?;
        let _guard = self.locks.lock(group_id.as_str()).await;

        let mut group = self.load(group_id).await?;
        group.set_metadata(metadata, self.clock.now());
        self.groups.save(&group).await?;

        with_deadline(
            self.provider_timeout,
            self.provider.update_metadata(group_id, &group.metadata),
        )
        .await
        .map_err(|e| {
            tracing::warn!("Metadata of group {} saved locally but not synced: {}", group_id, e);
            ServiceError::SyncFailed(e)
        })?;
        Ok(group)
    }

    pub async fn get_group(&self, group_id: &GroupId) -> Result<Group, ServiceError> {
        group_id.validate()?;
        self.load(group_id).await
    }

    async fn load(&self, id: &GroupId) -> Result<Group, ServiceError> {
        self.groups
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Group>(id))
    }
}
