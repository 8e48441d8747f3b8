//! TTL cache for granted permissions.
//!
//! The cache only ever answers "this slot was recently verified"; the
//! ledger remains the authority. Entries live for a fixed freshness
//! window regardless of the token's own expiry, and a hit additionally
//! requires the recorded expiry to still be in the future. Denials are
//! never cached.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use covenant_core::Fingerprint;

/// Default freshness window.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// One cached grant.
#[derive(Debug, Clone, Copy)]
pub struct CachedPermission {
    /// The token's expiry at verification time (unix seconds, 0 = never).
    pub expiry: u64,
    /// When the entry was inserted.
    pub cached_at: Instant,
}

/// Per-manager permission cache.
///
/// Owned by each manager instance; two managers never share entries.
pub struct PermissionCache {
    ttl: Duration,
    entries: RwLock<HashMap<Fingerprint, CachedPermission>>,
}

impl PermissionCache {
    /// Create a cache with the given freshness window.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a cache with the default freshness window.
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }

    /// Record a verified grant for a slot.
    pub async fn insert(&self, fingerprint: Fingerprint, expiry: u64) {
        let entry = CachedPermission {
            expiry,
            cached_at: Instant::now(),
        };
        self.entries.write().await.insert(fingerprint, entry);
    }

    /// Whether a slot has a fresh, still-valid entry.
    pub async fn is_fresh(&self, fingerprint: &Fingerprint, now: u64) -> bool {
        let entries = self.entries.read().await;
        match entries.get(fingerprint) {
            Some(entry) => {
                entry.cached_at.elapsed() < self.ttl && (entry.expiry == 0 || entry.expiry > now)
            }
            None => false,
        }
    }

    /// Drop a slot's entry, if present.
    pub async fn remove(&self, fingerprint: &Fingerprint) {
        self.entries.write().await.remove(fingerprint);
    }

    /// Number of entries currently held (fresh or not).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(byte: u8) -> Fingerprint {
        Fingerprint::from_bytes([byte; 32])
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_window_boundaries() {
        let cache = PermissionCache::new(Duration::from_secs(300));
        cache.insert(fingerprint(1), 0).await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.is_fresh(&fingerprint(1), 0).await);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.is_fresh(&fingerprint(1), 0).await);
    }

    #[tokio::test]
    async fn test_unknown_slot_misses() {
        let cache = PermissionCache::with_default_ttl();
        assert!(!cache.is_fresh(&fingerprint(1), 0).await);
    }

    #[tokio::test]
    async fn test_token_expiry_overrides_freshness() {
        let cache = PermissionCache::with_default_ttl();
        cache.insert(fingerprint(1), 100).await;

        // Fresh by the window, but the token itself has expired.
        assert!(cache.is_fresh(&fingerprint(1), 99).await);
        assert!(!cache.is_fresh(&fingerprint(1), 100).await);
        assert!(!cache.is_fresh(&fingerprint(1), 200).await);
    }

    #[tokio::test]
    async fn test_expiry_zero_never_expires() {
        let cache = PermissionCache::with_default_ttl();
        cache.insert(fingerprint(1), 0).await;
        assert!(cache.is_fresh(&fingerprint(1), u64::MAX).await);
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = PermissionCache::with_default_ttl();
        cache.insert(fingerprint(1), 0).await;
        cache.remove(&fingerprint(1)).await;
        assert!(!cache.is_fresh(&fingerprint(1), 0).await);
        assert!(cache.is_empty().await);
    }
}
