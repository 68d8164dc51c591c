//! Short-TTL read-through cache for user-by-id lookups.
//!
//! A pure performance aid, injected explicitly where it is used. Correctness
//! never depends on it: every user mutation invalidates the entry, and a
//! stale entry can outlive reality by at most the TTL.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::models::User;

struct CacheEntry {
    user: User,
    cached_at: Instant,
}

pub struct UserCache {
    ttl: Duration,
    entries: DashMap<Uuid, CacheEntry>,
}

impl UserCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_seconds),
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, user_id: Uuid) -> Option<User> {
        let expired = match self.entries.get(&user_id) {
            Some(entry) if entry.cached_at.elapsed() < self.ttl => {
                return Some(entry.user.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(&user_id);
        }
        None
    }

    pub fn insert(&self, user: User) {
        self.entries.insert(
            user.id,
            CacheEntry {
                user,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, user_id: Uuid) {
        self.entries.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User::new(
            "a@example.com".to_string(),
            "alice".to_string(),
            "hash".to_string(),
        )
    }

    #[test]
    fn caches_and_returns_users() {
        let cache = UserCache::new(300);
        let user = sample_user();
        let id = user.id;

        assert!(cache.get(id).is_none());
        cache.insert(user);
        assert_eq!(cache.get(id).unwrap().username, "alice");
    }

    #[test]
    fn invalidate_removes_the_entry() {
        let cache = UserCache::new(300);
        let user = sample_user();
        let id = user.id;

        cache.insert(user);
        cache.invalidate(id);
        assert!(cache.get(id).is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = UserCache::new(0);
        let user = sample_user();
        let id = user.id;

        cache.insert(user);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(id).is_none());
    }
}
