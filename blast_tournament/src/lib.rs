//! # Blast Tournament
//!
//! Daily tournament engine for a mobile game backend.
//!
//! A tournament covers one UTC day. Users who meet the level and coin
//! requirements enter before the daily cutoff and are packed into groups of
//! at most [`GROUP_CAPACITY`] entrants. Every level a participant completes
//! while the tournament is active scores one point; scores feed global,
//! per-country and per-tournament leaderboards. At close the top ten receive
//! tiered coin rewards which they claim later.
//!
//! ## Architecture
//!
//! - **Lifecycle** ([`tournament::TournamentLifecycle`]): create, start and
//!   close daily tournaments
//! - **Entry** ([`tournament::EntryCoordinator`]): eligibility check, then a
//!   transactional group assignment driven by a bus consumer
//! - **Scoring** ([`tournament::ScorePipeline`]): progress events to score
//!   increments to leaderboard events
//! - **Leaderboard** ([`leaderboard::LeaderboardService`]): ranked sets with a
//!   30 second read cache
//! - **Rewards** ([`tournament::RewardDistributor`]): tiered rewards and claims
//! - **Users** ([`users::UserService`]): registration and the level-ups that
//!   feed scoring
//!
//! Components are assembled by [`Engine`] from repository, ranked store, bus,
//! clock and configuration handles; there is no global state.
//!
//! ## Example
//!
//! ```no_run
//! use blast_tournament::{
//!     Engine, EngineDeps,
//!     bus::ChannelBus,
//!     clock::SystemClock,
//!     config::ConfigHandle,
//!     db::{MemoryStore, Repositories},
//!     leaderboard::MemoryRankedStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = Arc::new(ChannelBus::default());
//! let engine = Engine::new(EngineDeps::new(
//!     Repositories::from_store(Arc::new(MemoryStore::new())),
//!     Arc::new(MemoryRankedStore::new()),
//!     bus.clone(),
//!     Arc::new(SystemClock),
//!     ConfigHandle::default(),
//! ));
//! engine.spawn_consumers(&bus)?;
//! let tournament = engine.lifecycle().create_and_start_daily().await?;
//! println!("tournament {} is {}", tournament.id, tournament.status);
//! # Ok(())
//! # }
//! ```

/// Bus abstraction, in-process channel bus and consumer loop.
pub mod bus;

/// Wall-clock abstraction.
pub mod clock;

/// Remotely refreshable game configuration.
pub mod config;

/// PostgreSQL pool, migrations and repositories.
pub mod db;

/// Composition root.
pub mod engine;

/// Shared error classification.
pub mod error;

/// Ranked leaderboards and their cache.
pub mod leaderboard;

/// Metric recording.
pub mod telemetry;

/// Tournament lifecycle, entry, scoring and rewards.
pub mod tournament;

/// User registration and level-up.
pub mod users;

pub use engine::{Engine, EngineDeps};
pub use error::ErrorKind;
pub use tournament::models::GROUP_CAPACITY;
