//! Shared configuration snapshot with atomic replacement.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::{DynamicConfig, errors::ConfigResult, source::ConfigSource};

/// Cloneable handle to the current configuration
#[derive(Clone)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<DynamicConfig>>>,
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(DynamicConfig::default())
    }
}

impl ConfigHandle {
    pub fn new(config: DynamicConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Current document; stays valid after later replacements
    pub fn snapshot(&self) -> Arc<DynamicConfig> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, config: DynamicConfig) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    /// Fetch, validate and swap in a new document. On error the previous
    /// snapshot stays in place.
    pub async fn reload(&self, source: &dyn ConfigSource) -> ConfigResult<Arc<DynamicConfig>> {
        let config = source.fetch().await?;
        config.validate()?;
        self.replace(config);
        log::info!("Dynamic configuration reloaded");
        Ok(self.snapshot())
    }

    /// Reload every `interval` until the task is aborted
    pub fn spawn_refresh(
        &self,
        source: Arc<dyn ConfigSource>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; the caller already loaded once.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = handle.reload(source.as_ref()).await {
                    log::warn!("Keeping previous configuration, reload failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, StaticConfigSource};
    use async_trait::async_trait;

    struct BrokenSource;

    #[async_trait]
    impl ConfigSource for BrokenSource {
        async fn fetch(&self) -> ConfigResult<DynamicConfig> {
            Err(ConfigError::Status(503))
        }
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let handle = ConfigHandle::default();
        let before = handle.snapshot();

        let source = StaticConfigSource::new(DynamicConfig {
            coin_per_level: 7,
            ..DynamicConfig::default()
        });
        handle.reload(&source).await.unwrap();

        assert_eq!(handle.snapshot().coin_per_level, 7);
        assert_eq!(before.coin_per_level, DynamicConfig::default().coin_per_level);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous() {
        let handle = ConfigHandle::new(DynamicConfig {
            reward1: 77,
            ..DynamicConfig::default()
        });
        assert!(handle.reload(&BrokenSource).await.is_err());

        let invalid = StaticConfigSource::new(DynamicConfig {
            tournament_cutoff_hour: 99,
            ..DynamicConfig::default()
        });
        assert!(handle.reload(&invalid).await.is_err());
        assert_eq!(handle.snapshot().reward1, 77);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh_applies_source() {
        let handle = ConfigHandle::default();
        let source = Arc::new(StaticConfigSource::new(DynamicConfig {
            reward2: 3,
            ..DynamicConfig::default()
        }));
        let task = handle.spawn_refresh(source, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(handle.snapshot().reward2, 3);
        task.abort();
    }
}
