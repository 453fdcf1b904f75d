//! Short-lived read cache for leaderboard pages.
//!
//! Each scope key has a slot with a generation counter. Readers take the
//! generation before querying the ranked store and may only populate the
//! slot if no write invalidated it in between, so a slow read cannot put a
//! pre-write page back after the write expired it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::models::LeaderboardEntry;

/// Cache lifetime of a leaderboard page
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct CachedPage {
    limit: usize,
    entries: Arc<Vec<LeaderboardEntry>>,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    page: Option<CachedPage>,
}

/// Generation observed by a reader before it queried the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug)]
pub struct LeaderboardCache {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl Default for LeaderboardCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl LeaderboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh page computed with the same limit
    pub fn get(&self, key: &str, limit: usize) -> Option<Arc<Vec<LeaderboardEntry>>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let page = slots.get(key)?.page.as_ref()?;
        (page.limit == limit && Instant::now() < page.expires_at).then(|| page.entries.clone())
    }

    pub fn ticket(&self, key: &str) -> Ticket {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ticket(slots.get(key).map_or(0, |slot| slot.generation))
    }

    /// Store a page unless the key was invalidated after `ticket` was taken
    pub fn put(
        &self,
        key: &str,
        ticket: Ticket,
        limit: usize,
        entries: Arc<Vec<LeaderboardEntry>>,
    ) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key.to_string()).or_default();
        if slot.generation != ticket.0 {
            return false;
        }
        slot.page = Some(CachedPage {
            limit,
            entries,
            expires_at: Instant::now() + self.ttl,
        });
        true
    }

    /// Expire the key's page immediately
    pub fn invalidate(&self, key: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key.to_string()).or_default();
        slot.generation += 1;
        slot.page = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(score: i64) -> Arc<Vec<LeaderboardEntry>> {
        Arc::new(vec![LeaderboardEntry {
            rank: 1,
            user_id: 1,
            score,
        }])
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_expires_after_ttl() {
        let cache = LeaderboardCache::default();
        let ticket = cache.ticket("k");
        assert!(cache.put("k", ticket, 10, page(1)));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.get("k", 10).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k", 10).is_none());
    }

    #[test]
    fn test_other_limit_is_a_miss() {
        let cache = LeaderboardCache::default();
        cache.put("k", cache.ticket("k"), 10, page(1));
        assert!(cache.get("k", 5).is_none());
        assert!(cache.get("k", 10).is_some());
    }

    #[test]
    fn test_invalidation_rejects_stale_population() {
        let cache = LeaderboardCache::default();
        let stale = cache.ticket("k");
        cache.invalidate("k");

        assert!(!cache.put("k", stale, 10, page(1)));
        assert!(cache.get("k", 10).is_none());

        assert!(cache.put("k", cache.ticket("k"), 10, page(2)));
        assert_eq!(cache.get("k", 10).unwrap()[0].score, 2);
    }

    #[test]
    fn test_invalidate_is_per_key() {
        let cache = LeaderboardCache::default();
        cache.put("a", cache.ticket("a"), 10, page(1));
        cache.put("b", cache.ticket("b"), 10, page(1));
        cache.invalidate("a");
        assert!(cache.get("a", 10).is_none());
        assert!(cache.get("b", 10).is_some());
    }
}
