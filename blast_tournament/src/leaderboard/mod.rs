//! Ranked leaderboards per scope with a short-TTL read cache.

pub mod cache;
pub mod errors;
pub mod models;
pub mod redis_store;
pub mod service;
pub mod store;

pub use cache::{DEFAULT_CACHE_TTL, LeaderboardCache};
pub use errors::{LeaderboardError, LeaderboardResult};
pub use models::{LeaderboardEntry, LeaderboardScope, UserRank};
pub use redis_store::RedisRankedStore;
pub use service::LeaderboardService;
pub use store::{MemoryRankedStore, RankedStore};
