//! Shared setup for integration tests: in-memory store, manual clock,
//! channel bus and an engine wired from them.
#![allow(dead_code)]

use blast_tournament::{
    Engine, EngineDeps,
    bus::ChannelBus,
    clock::ManualClock,
    config::{ConfigHandle, DynamicConfig},
    db::{MemoryStore, ParticipantRepository, Repositories},
    leaderboard::MemoryRankedStore,
    tournament::{Tournament, TournamentUser, User},
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub ranked: Arc<MemoryRankedStore>,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<ChannelBus>,
    pub config: DynamicConfig,
    pub engine: Engine,
}

/// Tiers small enough to read in assertions
pub fn test_config() -> DynamicConfig {
    DynamicConfig {
        tournament_cutoff_hour: 20,
        minimum_tournament_entry_level: 10,
        tournament_entrance_coins: 500,
        reward1: 100,
        reward2: 50,
        reward3: 25,
        reward4_to_10: 10,
        coin_per_level: 100,
        ..DynamicConfig::default()
    }
}

pub fn at(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, min, sec).unwrap()
}

pub fn harness_at(now: DateTime<Utc>) -> Harness {
    harness_with(now, test_config())
}

pub fn harness_with(now: DateTime<Utc>, config: DynamicConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(now));
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let ranked = Arc::new(MemoryRankedStore::new());
    let bus = Arc::new(ChannelBus::default());

    let engine = Engine::new(EngineDeps::new(
        Repositories::from_store(store.clone()),
        ranked.clone(),
        bus.clone(),
        clock.clone(),
        ConfigHandle::new(config.clone()),
    ));

    Harness {
        store,
        ranked,
        clock,
        bus,
        config,
        engine,
    }
}

impl Harness {
    /// Eligible user with enough coins for one entry
    pub async fn eligible_user(&self, name: &str, country: &str) -> User {
        self.store.insert_user(name, 1000, 12, country).await
    }

    pub async fn active_tournament(&self) -> Tournament {
        self.engine
            .lifecycle()
            .create_and_start_daily()
            .await
            .expect("tournament starts")
    }

    pub async fn participant(&self, tournament: &Tournament, user: &User) -> Option<TournamentUser> {
        self.store.find(tournament.id, user.id).await.unwrap()
    }

    /// Poll until the user has a participation row, for up to two seconds
    pub async fn wait_for_participant(&self, tournament: &Tournament, user: &User) -> bool {
        for _ in 0..200 {
            if self.participant(tournament, user).await.is_some() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Poll until the user's global leaderboard score equals `score`
    pub async fn wait_for_global_score(&self, user: &User, score: i64) -> bool {
        for _ in 0..200 {
            if let Ok(rank) = self.engine.user_rank(user.id).await {
                if rank.score == score {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}
