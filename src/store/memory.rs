use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CredentialRecord, CredentialStore, Installation, StoreError, TocSettings};

/// In-process [`CredentialStore`].
///
/// Counts successful writes and can be told to refuse writes, which lets the
/// HTTP layer's persistence-failure paths be exercised without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: RwLock<Option<CredentialRecord>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every subsequent write fail with [`StoreError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "memory store is refusing writes".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.record.read().await.clone())
    }

    async fn save_installation(
        &self,
        installation: &Installation,
    ) -> Result<CredentialRecord, StoreError> {
        self.check_writable()?;
        let mut guard = self.record.write().await;

        let settings = guard
            .as_ref()
            .map(|r| r.settings.clone())
            .unwrap_or_default();
        let record = CredentialRecord {
            installation: Some(installation.clone()),
            settings,
            updated_at: Utc::now(),
        };

        *guard = Some(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn save_settings(&self, settings: &TocSettings) -> Result<CredentialRecord, StoreError> {
        self.check_writable()?;
        let mut guard = self.record.write().await;

        let record = CredentialRecord {
            installation: guard.as_ref().and_then(|r| r.installation.clone()),
            settings: settings.clone(),
            updated_at: Utc::now(),
        };

        *guard = Some(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShopDomain;
    use crate::store::AccessToken;

    fn installation(shop: &str, token: &str) -> Installation {
        Installation {
            shop: ShopDomain::new(shop).unwrap(),
            access_token: AccessToken::new(token),
        }
    }

    #[tokio::test]
    async fn test_empty_store_loads_none() {
        assert!(MemoryStore::new().load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_installation_keeps_settings() {
        let store = MemoryStore::new();
        let settings = TocSettings {
            toc_enabled: true,
            ..TocSettings::default()
        };
        store.save_settings(&settings).await.unwrap();

        let record = store
            .save_installation(&installation("test-shop", "shpat_1"))
            .await
            .unwrap();

        assert_eq!(record.settings, settings);
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_reinstall_replaces_credential() {
        let store = MemoryStore::new();
        store
            .save_installation(&installation("test-shop", "shpat_old"))
            .await
            .unwrap();
        store
            .save_installation(&installation("test-shop", "shpat_new"))
            .await
            .unwrap();

        let record = store.load().await.unwrap().unwrap();
        assert_eq!(
            record.installation.unwrap().access_token,
            AccessToken::new("shpat_new")
        );
    }

    #[tokio::test]
    async fn test_refused_write_leaves_record_untouched() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);

        let result = store
            .save_installation(&installation("test-shop", "shpat_1"))
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(store.writes(), 0);
    }
}
