//! Leaderboard write path (score events) and read path (cached pages).

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use super::{
    cache::LeaderboardCache,
    errors::{LeaderboardError, LeaderboardResult},
    models::{LeaderboardEntry, LeaderboardScope, UserRank},
    store::RankedStore,
};
use crate::{
    bus::{EventHandler, LeaderboardScoreUpdated},
    telemetry,
    tournament::models::{TournamentId, UserId},
};

/// Serves global, country and tournament leaderboards
pub struct LeaderboardService {
    store: Arc<dyn RankedStore>,
    cache: LeaderboardCache,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn RankedStore>, cache: LeaderboardCache) -> Self {
        Self { store, cache }
    }

    /// Write an absolute score to every scope it belongs to and expire their pages
    pub async fn apply_update(&self, update: &LeaderboardScoreUpdated) -> LeaderboardResult<()> {
        let mut scopes = vec![
            LeaderboardScope::Global,
            LeaderboardScope::Tournament(update.tournament_id),
        ];
        if !update.country.is_empty() {
            scopes.push(LeaderboardScope::Country(update.country.clone()));
        }

        for scope in scopes {
            let key = scope.key();
            self.store.upsert(&key, update.user_id, update.score).await?;
            self.cache.invalidate(&key);
        }

        log::debug!(
            "Leaderboard score for user {} set to {}",
            update.user_id,
            update.score
        );
        Ok(())
    }

    pub async fn global_leaderboard(&self, limit: usize) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        self.page(&LeaderboardScope::Global, limit).await
    }

    pub async fn country_leaderboard(
        &self,
        country: &str,
        limit: usize,
    ) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        self.page(&LeaderboardScope::Country(country.to_string()), limit)
            .await
    }

    pub async fn tournament_leaderboard(
        &self,
        tournament_id: TournamentId,
        limit: usize,
    ) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        self.page(&LeaderboardScope::Tournament(tournament_id), limit)
            .await
    }

    /// Global standing, read straight from the ranked store
    pub async fn user_rank(&self, user_id: UserId) -> LeaderboardResult<UserRank> {
        let started = Instant::now();
        let found = self
            .store
            .rank(&LeaderboardScope::Global.key(), user_id)
            .await?;
        telemetry::leaderboard_query_duration_ms("rank", started.elapsed().as_secs_f64() * 1000.0);

        let (position, score) = found.ok_or(LeaderboardError::UserNotRanked(user_id))?;
        Ok(UserRank {
            user_id,
            rank: position + 1,
            score,
        })
    }

    async fn page(
        &self,
        scope: &LeaderboardScope,
        limit: usize,
    ) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let key = scope.key();
        if let Some(entries) = self.cache.get(&key, limit) {
            telemetry::leaderboard_cache_hit(scope.label());
            return Ok(entries.as_ref().clone());
        }
        telemetry::leaderboard_cache_miss(scope.label());

        let ticket = self.cache.ticket(&key);
        let started = Instant::now();
        let rows = self.store.top(&key, limit).await?;
        telemetry::leaderboard_query_duration_ms("top", started.elapsed().as_secs_f64() * 1000.0);

        let entries: Vec<LeaderboardEntry> = rows
            .into_iter()
            .enumerate()
            .map(|(idx, (user_id, score))| LeaderboardEntry {
                rank: idx as u64 + 1,
                user_id,
                score,
            })
            .collect();

        self.cache
            .put(&key, ticket, limit, Arc::new(entries.clone()));
        Ok(entries)
    }
}

#[async_trait]
impl EventHandler for LeaderboardService {
    type Event = LeaderboardScoreUpdated;
    type Error = LeaderboardError;

    async fn handle(&self, event: LeaderboardScoreUpdated) -> Result<(), LeaderboardError> {
        self.apply_update(&event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::store::MemoryRankedStore;

    fn update(user_id: UserId, country: &str, score: i64) -> LeaderboardScoreUpdated {
        LeaderboardScoreUpdated {
            user_id,
            tournament_id: 1,
            country: country.to_string(),
            score,
        }
    }

    fn service() -> LeaderboardService {
        LeaderboardService::new(
            Arc::new(MemoryRankedStore::new()),
            LeaderboardCache::default(),
        )
    }

    #[tokio::test]
    async fn test_dense_ranks_by_position() {
        let service = service();
        service.apply_update(&update(1, "US", 5)).await.unwrap();
        service.apply_update(&update(2, "DE", 9)).await.unwrap();
        service.apply_update(&update(3, "US", 7)).await.unwrap();

        let global = service.global_leaderboard(10).await.unwrap();
        let ranked: Vec<(u64, UserId)> = global.iter().map(|e| (e.rank, e.user_id)).collect();
        assert_eq!(ranked, vec![(1, 2), (2, 3), (3, 1)]);

        let us = service.country_leaderboard("US", 10).await.unwrap();
        assert_eq!(us.len(), 2);
        assert_eq!(us[0].user_id, 3);

        let tournament = service.tournament_leaderboard(1, 2).await.unwrap();
        assert_eq!(tournament.len(), 2);
    }

    #[tokio::test]
    async fn test_write_expires_cached_page() {
        let service = service();
        service.apply_update(&update(7, "US", 10)).await.unwrap();
        assert_eq!(service.country_leaderboard("US", 10).await.unwrap()[0].score, 10);

        service.apply_update(&update(7, "US", 42)).await.unwrap();
        assert_eq!(service.country_leaderboard("US", 10).await.unwrap()[0].score, 42);
        assert_eq!(service.global_leaderboard(10).await.unwrap()[0].score, 42);
    }

    #[tokio::test]
    async fn test_user_rank() {
        let service = service();
        service.apply_update(&update(1, "US", 3)).await.unwrap();
        service.apply_update(&update(2, "US", 8)).await.unwrap();

        let rank = service.user_rank(1).await.unwrap();
        assert_eq!(rank, UserRank { user_id: 1, rank: 2, score: 3 });
        assert!(matches!(
            service.user_rank(99).await,
            Err(LeaderboardError::UserNotRanked(99))
        ));
    }

    #[tokio::test]
    async fn test_zero_limit_is_empty() {
        let service = service();
        service.apply_update(&update(1, "US", 3)).await.unwrap();
        assert!(service.global_leaderboard(0).await.unwrap().is_empty());
    }
}
