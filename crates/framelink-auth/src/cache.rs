//! TTL-bounded memoization of permission decisions.
//!
//! The cache is strictly a memoization: every entry can be recomputed
//! from (context, rules, hierarchy) at any time, and any change to
//! those inputs invalidates the affected entries. It is never a
//! second source of truth.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cache key: one decision per (user, action, resource).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// User the decision was computed for.
    pub user_id: String,
    /// Queried action.
    pub action: String,
    /// Queried resource.
    pub resource: String,
}

impl CacheKey {
    /// Builds a key.
    #[must_use]
    pub fn new(user_id: &str, action: &str, resource: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    allowed: bool,
    inserted: Instant,
}

/// Permission decision cache with per-entry TTL.
#[derive(Debug)]
pub struct PermissionCache {
    ttl: Duration,
    entries: HashMap<CacheKey, Entry>,
}

impl PermissionCache {
    /// Default entry lifetime.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    /// Creates a cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Looks up a non-expired decision.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<bool> {
        let entry = self.entries.get(key)?;
        if entry.inserted.elapsed() > self.ttl {
            return None;
        }
        Some(entry.allowed)
    }

    /// Stores a decision.
    pub fn insert(&mut self, key: CacheKey, allowed: bool) {
        self.entries.insert(
            key,
            Entry {
                allowed,
                inserted: Instant::now(),
            },
        );
    }

    /// Drops every entry for one user.
    pub fn invalidate_user(&mut self, user_id: &str) {
        self.entries.retain(|key, _| key.user_id != user_id);
    }

    /// Drops everything.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Drops expired entries; returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.inserted.elapsed() <= ttl);
        before - self.entries.len()
    }

    /// Number of entries (including not-yet-purged expired ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut cache = PermissionCache::default();
        let key = CacheKey::new("u1", "edit", "annotation");
        assert_eq!(cache.get(&key), None);

        cache.insert(key.clone(), true);
        assert_eq!(cache.get(&key), Some(true));
    }

    #[test]
    fn expired_entries_miss() {
        let mut cache = PermissionCache::new(Duration::ZERO);
        let key = CacheKey::new("u1", "edit", "annotation");
        cache.insert(key.clone(), true);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn invalidate_user_is_scoped() {
        let mut cache = PermissionCache::default();
        cache.insert(CacheKey::new("u1", "edit", "annotation"), true);
        cache.insert(CacheKey::new("u2", "edit", "annotation"), false);

        cache.invalidate_user("u1");
        assert_eq!(cache.get(&CacheKey::new("u1", "edit", "annotation")), None);
        assert_eq!(
            cache.get(&CacheKey::new("u2", "edit", "annotation")),
            Some(false)
        );
    }

    #[test]
    fn purge_expired_reports_count() {
        let mut cache = PermissionCache::new(Duration::ZERO);
        cache.insert(CacheKey::new("u1", "a", "r"), true);
        cache.insert(CacheKey::new("u2", "a", "r"), true);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_all() {
        let mut cache = PermissionCache::default();
        cache.insert(CacheKey::new("u1", "a", "r"), true);
        cache.invalidate_all();
        assert_eq!(cache.len(), 0);
    }
}
