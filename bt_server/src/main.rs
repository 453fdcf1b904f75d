//! Daily tournament worker.
//!
//! Runs the bus consumers (entry, score, leaderboard), the midnight
//! create/start and 23:59 close jobs, and the dynamic config refresher.

mod config;
mod logging;
mod metrics;
mod scheduler;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use blast_tournament::{
    Engine, EngineDeps,
    bus::ChannelBus,
    clock::SystemClock,
    config::{ConfigHandle, ConfigSource, HttpConfigSource},
    db::{Database, Repositories},
    leaderboard::{MemoryRankedStore, RankedStore, RedisRankedStore},
};
use log::{info, warn};
use pico_args::Arguments;

use config::ServerConfig;

const HELP: &str = "\
Run the daily tournament worker

USAGE:
  bt_server [OPTIONS]

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --redis-url  URL         Redis URL for leaderboards  [default: env REDIS_URL or in-memory]
  --metrics    IP:PORT     Prometheus exporter address [default: env METRICS_BIND or disabled]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  CONFIG_URL               Dynamic configuration document URL
  CONFIG_TOKEN             Bearer token for CONFIG_URL
  CONFIG_REFRESH_SECS      Configuration refresh period [default: 300]
  SCHEDULER_ENABLED        Run the daily jobs on this instance [default: true]
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let db_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let redis_url: Option<String> = pargs.opt_value_from_str("--redis-url")?;
    let metrics_bind: Option<SocketAddr> = pargs.opt_value_from_str("--metrics")?;

    logging::init();

    let server_config = ServerConfig::from_env(db_url, redis_url, metrics_bind)?;
    server_config.validate()?;

    if let Some(addr) = server_config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Metrics exporter listening on {}", addr);
    }

    let db = Database::new(&server_config.database)
        .await
        .context("connecting to database")?;
    db.migrate().await.context("running migrations")?;
    info!("Database ready");

    let repositories = Repositories::from_store(Arc::new(db.store()));

    let ranked_store: Arc<dyn RankedStore> = match &server_config.redis_url {
        Some(url) => {
            let store = RedisRankedStore::new(url).context("opening redis client")?;
            if let Err(e) = store.ping().await {
                warn!("Redis not reachable yet, will retry on demand: {}", e);
            }
            Arc::new(store)
        }
        None => {
            warn!("REDIS_URL not set, leaderboards are kept in memory");
            Arc::new(MemoryRankedStore::new())
        }
    };

    let config_handle = ConfigHandle::default();
    let refresh = match &server_config.remote_config.url {
        Some(url) => {
            let source: Arc<dyn ConfigSource> = Arc::new(HttpConfigSource::new(
                url.clone(),
                server_config.remote_config.token.clone(),
            )?);
            let loaded = config_handle.reload(source.as_ref()).await;
            metrics::config_reloads_total(loaded.is_ok());
            if let Err(e) = loaded {
                warn!("Using default configuration, initial load failed: {}", e);
            }
            Some(config_handle.spawn_refresh(source, server_config.config_refresh_interval()))
        }
        None => {
            info!("CONFIG_URL not set, using default configuration");
            None
        }
    };

    let bus = Arc::new(ChannelBus::new(server_config.bus_capacity));
    let mut deps = EngineDeps::new(
        repositories,
        ranked_store,
        bus.clone(),
        Arc::new(SystemClock),
        config_handle.clone(),
    );
    deps.cache_ttl = server_config.leaderboard_cache_ttl();
    let engine = Engine::new(deps);

    let topics = {
        let config = config_handle.snapshot();
        [
            config.tournament_entry_topic.clone(),
            config.user_progress_update_topic.clone(),
            config.leaderboard_update_topic.clone(),
        ]
    };
    let consumers = engine.spawn_consumers(&bus)?;
    info!("Consumers started on {}", topics.join(", "));

    let jobs = if server_config.scheduler_enabled {
        scheduler::spawn_daily_jobs(engine.clone())?
    } else {
        info!("Scheduler disabled on this instance");
        Vec::new()
    };

    match engine.active_tournament().await {
        Ok(Some(t)) => info!("Tournament {} is active", t.id),
        Ok(None) => info!("No active tournament"),
        Err(e) => warn!("Could not read active tournament: {}", e),
    }

    shutdown_signal().await?;
    info!("Shutting down");

    for job in &jobs {
        job.abort();
    }
    if let Some(refresh) = refresh {
        refresh.abort();
    }

    // Consumers drain what is already queued, then exit.
    bus.close();
    for (topic, consumer) in topics.iter().zip(consumers) {
        match consumer.await {
            Ok(stats) => logging::log_consumer_exit(
                topic,
                stats.received,
                stats.handled,
                stats.decode_failures + stats.handler_failures,
            ),
            Err(e) => warn!("Consumer for {} panicked: {}", topic, e),
        }
    }

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() -> Result<(), Error> {
    tokio::signal::ctrl_c()
        .await
        .context("installing CTRL+C signal handler")
}
