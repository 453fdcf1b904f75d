//! User registration and level-up, the producer side of the score pipeline.

use std::sync::Arc;

use crate::{
    bus::{MessageBus, ProgressUpdated, publish_event},
    config::ConfigHandle,
    db::UserRepository,
    telemetry,
    tournament::{
        errors::{TournamentError, TournamentResult},
        models::{User, UserId},
    },
};

/// Registers users, levels them up and announces it on the progress topic
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    bus: Arc<dyn MessageBus>,
    config: ConfigHandle,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, bus: Arc<dyn MessageBus>, config: ConfigHandle) -> Self {
        Self { users, bus, config }
    }

    /// Register a user at level 1 with the starting coin balance.
    pub async fn create_user(&self, username: &str, country: &str) -> TournamentResult<User> {
        let user = self
            .users
            .create_user(username, country)
            .await?
            .ok_or_else(|| TournamentError::UserAlreadyExists(username.to_string()))?;
        log::info!("Created user {} ({}) from {}", user.id, user.username, user.country);
        Ok(user)
    }

    /// Add one level and `coinPerLevel` coins, then publish a progress event.
    /// The event is fire-and-forget: a publish failure does not undo the level.
    pub async fn update_progress(&self, user_id: UserId) -> TournamentResult<User> {
        let config = self.config.snapshot();
        let user = self
            .users
            .level_up(user_id, config.coin_per_level)
            .await?
            .ok_or(TournamentError::UserNotFound(user_id))?;

        let event = ProgressUpdated {
            user_id,
            country: user.country.clone(),
        };
        if let Err(e) = publish_event(self.bus.as_ref(), &config.user_progress_update_topic, &event) {
            telemetry::publish_failures_total(&config.user_progress_update_topic);
            log::warn!(
                "User {} reached level {} but progress event not published: {}",
                user_id,
                user.level,
                e
            );
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ChannelBus;
    use crate::config::DynamicConfig;
    use crate::db::MemoryStore;
    use crate::tournament::models::{STARTING_COINS, STARTING_LEVEL};

    fn service(store: Arc<MemoryStore>) -> UserService {
        UserService::new(store, Arc::new(ChannelBus::default()), ConfigHandle::default())
    }

    #[tokio::test]
    async fn test_create_user_starts_at_level_one() {
        let service = service(Arc::new(MemoryStore::new()));
        let user = service.create_user("erin", "DE").await.unwrap();
        assert_eq!(user.level, STARTING_LEVEL);
        assert_eq!(user.coins, STARTING_COINS);
        assert_eq!(user.country, "DE");
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let service = service(Arc::new(MemoryStore::new()));
        service.create_user("erin", "DE").await.unwrap();
        let err = service.create_user("erin", "US").await.unwrap_err();
        assert!(matches!(&err, TournamentError::UserAlreadyExists(name) if name == "erin"));
        assert_eq!(err.kind(), crate::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_level_up_credits_coins_and_publishes() {
        let store = Arc::new(MemoryStore::new());
        let user = store.insert_user("carol", 1000, 1, "TR").await;
        let bus = Arc::new(ChannelBus::default());
        let config = DynamicConfig::default();
        let mut rx = bus.subscribe(&config.user_progress_update_topic).unwrap();
        let service = UserService::new(store.clone(), bus.clone(), ConfigHandle::new(config));

        let updated = service.update_progress(user.id).await.unwrap();
        assert_eq!(updated.level, 2);
        assert_eq!(updated.coins, 1100);

        let envelope = rx.recv().await.unwrap();
        let event: ProgressUpdated = serde_json::from_slice(&envelope.payload).unwrap();
        assert_eq!(event, ProgressUpdated { user_id: user.id, country: "TR".into() });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_level_ups_do_not_lose_concurrent_credits() {
        let store = Arc::new(MemoryStore::new());
        let user = store.insert_user("frank", 1000, 1, "NL").await;
        let service = service(store.clone());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.update_progress(user.id).await.map(|_| ())
            }));
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                UserRepository::credit_coins(store.as_ref(), user.id, 60)
                    .await
                    .map(|_| ())
                    .map_err(TournamentError::from)
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = UserRepository::find_by_id(store.as_ref(), user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.level, 51);
        assert_eq!(stored.coins, 1000 + 50 * 100 + 50 * 60);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_level() {
        let store = Arc::new(MemoryStore::new());
        let user = store.insert_user("dave", 0, 4, "FR").await;
        let bus = Arc::new(ChannelBus::default());
        bus.close();
        let service = UserService::new(store.clone(), bus, ConfigHandle::default());

        let updated = service.update_progress(user.id).await.unwrap();
        assert_eq!(updated.level, 5);
        let stored = UserRepository::find_by_id(store.as_ref(), user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.level, 5);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let service = service(Arc::new(MemoryStore::new()));
        assert!(matches!(
            service.update_progress(404).await,
            Err(TournamentError::UserNotFound(404))
        ));
    }
}
