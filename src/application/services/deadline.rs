use std::future::Future;
use std::time::Duration;

use crate::application::errors::ProviderError;

/// Deadline applied to provider calls when none is configured
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a provider call under `limit`. A zero limit waits forever.
///
/// An elapsed deadline drops the call and reports [`ProviderError::Timeout`],
/// which callers treat exactly like any other provider failure.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    if limit.is_zero() {
        return call.await;
    }
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}
