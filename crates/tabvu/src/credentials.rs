//! Process-wide credential cache.
//!
//! One token serves every concurrent operation. It is refreshed two
//! independent ways: a background timer re-signs-in unconditionally
//! every 30 minutes, and any caller observing a rejected request
//! invalidates the cache so the next [`CredentialCache::get_valid`]
//! signs in again. Refresh is single-flight: the cache slot's mutex is
//! held across the sign-in, so concurrent callers that found the slot
//! empty wait for the one in-flight sign-in instead of issuing their
//! own. The token is only ever replaced whole; last writer wins.

use crate::TabvuError;
use async_trait::async_trait;
use diagnostics::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// How often the background timer re-authenticates, regardless of
/// whether any request has failed.
pub const REAUTH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// A signed-in credential: the API token and the site it is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub site_id: String,
}

/// Where fresh tokens come from. The REST client implements this; tests
/// substitute counting fakes.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn sign_in(&self) -> Result<AuthToken, TabvuError>;
}

pub struct CredentialCache {
    source: Arc<dyn TokenSource>,
    current: Mutex<Option<AuthToken>>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Arc<Self> {
        Arc::new(Self {
            source,
            current: Mutex::new(None),
        })
    }

    /// Returns the cached token, signing in first if the cache is empty
    /// or was invalidated.
    pub async fn get_valid(&self) -> Result<AuthToken, TabvuError> {
        let mut slot = self.current.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let fresh = self.source.sign_in().await?;
        let site_id = fresh.site_id.as_str();
        info!("signed in to site {site_id}");
        *slot = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drops the cached token so the next caller signs in again. Called
    /// by request paths that observe an authentication rejection.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }

    /// Signs in unconditionally and replaces the cached token.
    pub async fn force_refresh(&self) -> Result<AuthToken, TabvuError> {
        let mut slot = self.current.lock().await;
        let fresh = self.source.sign_in().await?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }

    /// Spawns the 30-minute re-authentication timer. The returned handle
    /// owns the task; abort it to stop refreshing.
    pub fn spawn_refresh_timer(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAUTH_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick completes immediately; the sign-in at startup
            // already happened through get_valid
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.force_refresh().await {
                    Ok(_) => info!("refreshed credential on schedule"),
                    Err(e) => {
                        let reason = e.to_string();
                        warn!("scheduled re-authentication failed: {reason}");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        sign_ins: AtomicUsize,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn sign_in(&self) -> Result<AuthToken, TabvuError> {
            let n = self.sign_ins.fetch_add(1, Ordering::SeqCst) + 1;
            // slow enough that concurrent callers overlap the refresh
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(AuthToken {
                token: format!("token-{n}"),
                site_id: "site-1".into(),
            })
        }
    }

    fn counting_cache() -> (Arc<CredentialCache>, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            sign_ins: AtomicUsize::new(0),
        });
        let cache = CredentialCache::new(source.clone());
        (cache, source)
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_sign_in() {
        let (cache, source) = counting_cache();
        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_valid().await })
            })
            .collect();
        for task in tasks {
            let token = task.await.unwrap().unwrap();
            assert_eq!(token.token, "token-1");
        }
        assert_eq!(source.sign_ins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_sign_in() {
        let (cache, source) = counting_cache();
        assert_eq!(cache.get_valid().await.unwrap().token, "token-1");
        assert_eq!(cache.get_valid().await.unwrap().token, "token-1");
        cache.invalidate().await;
        assert_eq!(cache.get_valid().await.unwrap().token, "token-2");
        assert_eq!(source.sign_ins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_replaces_cached_token() {
        let (cache, _) = counting_cache();
        assert_eq!(cache.get_valid().await.unwrap().token, "token-1");
        let refreshed = cache.force_refresh().await.unwrap();
        assert_eq!(refreshed.token, "token-2");
        assert_eq!(cache.get_valid().await.unwrap().token, "token-2");
    }
}
