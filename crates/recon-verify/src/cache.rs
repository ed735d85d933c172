//! Ephemeral verdict cache.
//!
//! Entries expire lazily: an entry past its `expires_at` is a miss on read
//! and is dropped at that point, or by an explicit [`VerificationCache::purge_expired`].
//! Nothing here is ever persisted.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use recon_types::{MatchType, StoreId, VerificationMode, VerificationResult};

/// Supplier component of a key when no supplier is given.
pub const ANY_SUPPLIER: &str = "any";

/// Trim and uppercase a reference or supplier name.
pub fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Identity of a cached verdict.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub store_id: StoreId,
    pub reference: String,
    pub supplier: String,
    pub mode: VerificationMode,
}

impl CacheKey {
    pub fn new(
        store_id: StoreId,
        reference: &str,
        supplier_name: Option<&str>,
        mode: VerificationMode,
    ) -> Self {
        let supplier = supplier_name
            .map(normalize)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ANY_SUPPLIER.to_string());
        Self {
            store_id,
            reference: normalize(reference),
            supplier,
            mode,
        }
    }
}

/// A cached verdict.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub exists: bool,
    pub match_type: MatchType,
    pub amount: Option<f64>,
    pub supplier_name_matched: Option<String>,
    /// `false` for indeterminate verdicts; such entries are never stored.
    pub errorless: bool,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: CacheKey, result: &VerificationResult, expires_at: DateTime<Utc>) -> Self {
        Self {
            key,
            exists: result.exists,
            match_type: result.match_type,
            amount: result.invoice_amount,
            supplier_name_matched: result.supplier_name_matched.clone(),
            errorless: result.error_message.is_none(),
            expires_at,
        }
    }

    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// The verdict this entry was built from.
    pub fn to_result(&self) -> VerificationResult {
        VerificationResult {
            exists: self.exists,
            match_type: self.match_type,
            invoice_amount: self.amount,
            supplier_name_matched: self.supplier_name_matched.clone(),
            error_message: None,
        }
    }
}

/// Key → verdict store with a uniform TTL.
///
/// Last writer wins. Concurrent readers of the same key may both miss; the
/// cache does not coordinate them.
pub struct VerificationCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: chrono::Duration,
}

impl VerificationCache {
    /// Create a cache whose entries live for `ttl`.
    ///
    /// A TTL too large for `chrono` saturates to the largest representable
    /// duration.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Live entry for `key`, or `None` if absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CacheEntry> {
        {
            let entries = self.read();
            match entries.get(key) {
                Some(entry) if entry.is_live_at(now) => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: drop it unless a writer refreshed it in the meantime.
        let mut entries = self.write();
        if entries.get(key).is_some_and(|e| !e.is_live_at(now)) {
            entries.remove(key);
        }
        None
    }

    /// Store an entry, replacing any entry for the same key.
    ///
    /// Returns `false` (and stores nothing) for an entry that is not
    /// errorless.
    pub fn put(&self, entry: CacheEntry) -> bool {
        if !entry.errorless {
            debug!(key = ?entry.key, "refusing to cache an indeterminate verdict");
            return false;
        }
        self.write().insert(entry.key.clone(), entry);
        true
    }

    /// Cache `result` under `key`, expiring one TTL from now.
    pub fn store(&self, key: CacheKey, result: &VerificationResult) -> bool {
        self.store_at(key, result, Utc::now())
    }

    pub fn store_at(&self, key: CacheKey, result: &VerificationResult, now: DateTime<Utc>) -> bool {
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.put(CacheEntry::new(key, result, expires_at))
    }

    /// Drop the entry for `key`. Returns `true` if one was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.write().remove(key).is_some()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, e| e.is_live_at(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    // The cache holds no invariant a panicking writer could break, so a
    // poisoned lock is recovered rather than propagated.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for VerificationCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CACHE_TTL)
    }
}

impl std::fmt::Debug for VerificationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationCache")
            .field("entries", &self.len())
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}
