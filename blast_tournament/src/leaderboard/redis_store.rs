//! Redis sorted-set backend.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::{Mutex, MutexGuard};

use super::store::RankedStore;
use crate::{
    db::{Context, StoreError, StoreResult},
    tournament::models::UserId,
};

type ConnectionGuard<'a> = MutexGuard<'a, Option<ConnectionManager>>;

/// Ranked store on Redis `ZADD` / `ZREVRANGE` / `ZREVRANK`
pub struct RedisRankedStore {
    client: redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
}

impl RedisRankedStore {
    /// Validate the URL; the connection is opened on first use
    pub fn new(url: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    async fn ensure_connection(&self) -> StoreResult<ConnectionGuard<'_>> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            let manager = self
                .client
                .get_connection_manager()
                .await
                .context("failed to connect to redis")?;
            *guard = Some(manager);
        }
        Ok(guard)
    }

    /// Round-trip check
    pub async fn ping(&self) -> StoreResult<()> {
        let mut guard = self.ensure_connection().await?;
        let conn = live(&mut guard, "failed to ping redis")?;
        let result: redis::RedisResult<String> = redis::cmd("PING").query_async(conn).await;
        settle(&mut guard, result, "failed to ping redis").map(|_| ())
    }
}

fn live<'g>(
    guard: &'g mut ConnectionGuard<'_>,
    context: &'static str,
) -> StoreResult<&'g mut ConnectionManager> {
    guard.as_mut().ok_or(StoreError::Corrupt {
        context,
        message: "redis connection unavailable".to_string(),
    })
}

/// Drop the cached connection after a failed command so the next call reconnects
fn settle<T>(
    guard: &mut ConnectionGuard<'_>,
    result: redis::RedisResult<T>,
    context: &'static str,
) -> StoreResult<T> {
    if let Err(err) = &result {
        log::warn!("Redis command failed, resetting connection: {}", err);
        **guard = None;
    }
    result.context(context)
}

#[async_trait]
impl RankedStore for RedisRankedStore {
    async fn upsert(&self, key: &str, member: UserId, score: i64) -> StoreResult<()> {
        const CONTEXT: &str = "failed to update leaderboard";
        let mut guard = self.ensure_connection().await?;
        let conn = live(&mut guard, CONTEXT)?;
        let result: redis::RedisResult<()> = conn.zadd(key, member, score).await;
        settle(&mut guard, result, CONTEXT)
    }

    async fn top(&self, key: &str, limit: usize) -> StoreResult<Vec<(UserId, i64)>> {
        const CONTEXT: &str = "failed to read leaderboard";
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);

        let mut guard = self.ensure_connection().await?;
        let conn = live(&mut guard, CONTEXT)?;
        let result: redis::RedisResult<Vec<(UserId, f64)>> =
            conn.zrevrange_withscores(key, 0, stop).await;
        let rows = settle(&mut guard, result, CONTEXT)?;

        Ok(rows
            .into_iter()
            .map(|(member, score)| (member, score as i64))
            .collect())
    }

    async fn rank(&self, key: &str, member: UserId) -> StoreResult<Option<(u64, i64)>> {
        const CONTEXT: &str = "failed to read user rank";
        let mut guard = self.ensure_connection().await?;
        let conn = live(&mut guard, CONTEXT)?;
        let result: redis::RedisResult<(Option<u64>, Option<f64>)> = redis::pipe()
            .zrevrank(key, member)
            .zscore(key, member)
            .query_async(conn)
            .await;
        let (rank, score) = settle(&mut guard, result, CONTEXT)?;

        Ok(rank.zip(score).map(|(rank, score)| (rank, score as i64)))
    }
}
