//! Player authentication on top of the backend's auth API

use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::ServiceError;
use crate::application::services::deadline::{with_deadline, DEFAULT_PROVIDER_TIMEOUT};
use crate::application::services::key_lock::KeyedLock;
use crate::domain::entities::{DeviceFingerprint, PlayerAccount, SessionRecord};
use crate::domain::errors::DomainError;
use crate::domain::shared::PlayerId;
use crate::domain::traits::{
    AuthProvider, AuthResult, Clock, DeviceCredentials, EmailCredentials, Repository, SystemClock,
};

pub struct AuthService {
    accounts: Arc<dyn Repository<PlayerAccount>>,
    provider: Arc<dyn AuthProvider>,
    clock: Arc<dyn Clock>,
    provider_timeout: Duration,
    locks: KeyedLock,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn Repository<PlayerAccount>>,
        provider: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            accounts,
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

    /// Authenticates with the backend, then records the device and session
    /// on the local account, creating it on first sign-in.
    pub async fn authenticate_device(
        &self,
        credentials: DeviceCredentials,
    ) -> Result<AuthResult, ServiceError> {
        if credentials.device_id.trim().is_empty() {
            return Err(DomainError::DeviceInvalid("device id is required".to_string()).into());
        }

        let result = with_deadline(
            self.provider_timeout,
            self.provider.authenticate_device(&credentials),
        )
        .await
        .map_err(ServiceError::Provider)?;

        let _guard = self.locks.lock(result.user_id.as_str()).await;
        let now = self.clock.now();
        let mut account = self
            .load_or_create(&result.user_id, credentials.email.clone(), &credentials.username)
            .await?;
        account.register_device(
            DeviceFingerprint {
                id: credentials.device_id.clone(),
                platform: credentials.platform.clone(),
                last_seen: now,
            },
            now,
        )?;
        account.record_session(SessionRecord::new(result.session_token.clone(), now), now)?;
        self.accounts.save(&account).await?;

        tracing::info!("Player {} signed in from device {}", result.user_id, credentials.device_id);
        Ok(result)
    }

    pub async fn authenticate_email(
        &self,
        credentials: EmailCredentials,
    ) -> Result<AuthResult, ServiceError> {
        if credentials.email.trim().is_empty() {
            return Err(DomainError::Required("email").into());
        }
        if credentials.password.is_empty() {
            return Err(DomainError::Required("password").into());
        }

        let result = with_deadline(
            self.provider_timeout,
            self.provider.authenticate_email(&credentials),
        )
        .await
        .map_err(ServiceError::Provider)?;

        let _guard = self.locks.lock(result.user_id.as_str()).await;
        let now = self.clock.now();
        let mut account = self
            .load_or_create(&result.user_id, Some(credentials.email.clone()), &result.username)
            .await?;
        account.record_session(SessionRecord::new(result.session_token.clone(), now), now)?;
        self.accounts.save(&account).await?;

        tracing::info!("Player {} signed in by email", result.user_id);
        Ok(result)
    }

    pub async fn suspend_account(
        &self,
        id: &PlayerId,
        message: &str,
    ) -> Result<PlayerAccount, ServiceError> {
        id.validate()?;
        let _guard = self.locks.lock(id.as_str()).await;
        let mut account = self.load(id).await?;
        account.suspend(message, self.clock.now());
        self.accounts.save(&account).await?;
        tracing::info!("Suspended player {}: {}", id, message);
        Ok(account)
    }

    pub async fn reinstate_account(&self, id: &PlayerId) -> Result<PlayerAccount, ServiceError> {
        id.validate()?;
        let _guard = self.locks.lock(id.as_str()).await;
        let mut account = self.load(id).await?;
        account.reinstate(self.clock.now());
        self.accounts.save(&account).await?;
        tracing::info!("Reinstated player {}", id);
        Ok(account)
    }

    pub async fn get_account(&self, id: &PlayerId) -> Result<PlayerAccount, ServiceError> {
        id.validate()?;
        self.load(id).await
    }

    async fn load(&self, id: &PlayerId) -> Result<PlayerAccount, ServiceError> {
        self.accounts
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<PlayerAccount>(id))
    }

    async fn load_or_create(
        &self,
        id: &PlayerId,
        email: Option<String>,
        display_name: &str,
    ) -> Result<PlayerAccount, ServiceError> {
        match self.accounts.get(id).await? {
            Some(account) => Ok(account),
            None => Ok(PlayerAccount::new(id.clone(), email, display_name, self.clock.now())?),
        }
    }
}
