//! Ranked-set storage.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

use crate::{db::StoreResult, tournament::models::UserId};

/// Sorted member-to-score sets addressed by key
#[async_trait]
pub trait RankedStore: Send + Sync {
    /// Set a member's absolute score
    async fn upsert(&self, key: &str, member: UserId, score: i64) -> StoreResult<()>;

    /// Up to `limit` members, highest score first
    async fn top(&self, key: &str, limit: usize) -> StoreResult<Vec<(UserId, i64)>>;

    /// Zero-based descending position and score of a member
    async fn rank(&self, key: &str, member: UserId) -> StoreResult<Option<(u64, i64)>>;
}

#[derive(Debug, Default)]
struct RankedSet {
    scores: HashMap<UserId, i64>,
    order: BTreeSet<(Reverse<i64>, UserId)>,
}

impl RankedSet {
    fn upsert(&mut self, member: UserId, score: i64) {
        if let Some(old) = self.scores.insert(member, score) {
            self.order.remove(&(Reverse(old), member));
        }
        self.order.insert((Reverse(score), member));
    }
}

/// In-process ranked store; equal scores are ordered by member id
#[derive(Debug, Default)]
pub struct MemoryRankedStore {
    sets: Mutex<HashMap<String, RankedSet>>,
}

impl MemoryRankedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RankedStore for MemoryRankedStore {
    async fn upsert(&self, key: &str, member: UserId, score: i64) -> StoreResult<()> {
        self.sets
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .upsert(member, score);
        Ok(())
    }

    async fn top(&self, key: &str, limit: usize) -> StoreResult<Vec<(UserId, i64)>> {
        let sets = self.sets.lock().await;
        Ok(sets
            .get(key)
            .map(|set| {
                set.order
                    .iter()
                    .take(limit)
                    .map(|(Reverse(score), member)| (*member, *score))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn rank(&self, key: &str, member: UserId) -> StoreResult<Option<(u64, i64)>> {
        let sets = self.sets.lock().await;
        let Some(set) = sets.get(key) else {
            return Ok(None);
        };
        let Some(&score) = set.scores.get(&member) else {
            return Ok(None);
        };
        let position = set.order.range(..(Reverse(score), member)).count();
        Ok(Some((position as u64, score)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let store = MemoryRankedStore::new();
        store.upsert("k", 1, 10).await.unwrap();
        store.upsert("k", 2, 20).await.unwrap();
        store.upsert("k", 1, 5).await.unwrap();

        assert_eq!(store.top("k", 10).await.unwrap(), vec![(2, 20), (1, 5)]);
        assert_eq!(store.rank("k", 1).await.unwrap(), Some((1, 5)));
    }

    #[tokio::test]
    async fn test_top_respects_limit_and_missing_keys() {
        let store = MemoryRankedStore::new();
        for member in 1..=5 {
            store.upsert("k", member, member * 10).await.unwrap();
        }
        assert_eq!(store.top("k", 2).await.unwrap(), vec![(5, 50), (4, 40)]);
        assert!(store.top("other", 2).await.unwrap().is_empty());
        assert_eq!(store.rank("other", 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_equal_scores_ordered_by_member() {
        let store = MemoryRankedStore::new();
        store.upsert("k", 9, 7).await.unwrap();
        store.upsert("k", 3, 7).await.unwrap();
        assert_eq!(store.rank("k", 3).await.unwrap(), Some((0, 7)));
        assert_eq!(store.rank("k", 9).await.unwrap(), Some((1, 7)));
    }
}
