//! PostgreSQL implementation of the repository traits.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::sync::Arc;
use std::time::Duration;

use super::{
    config::DatabaseConfig,
    errors::{Context, StoreResult},
    repository::{
        EntryStore, EntryTransaction, ParticipantRepository, RewardRepository,
        TournamentRepository, UserRepository,
    },
    timeouts::with_timeout,
};
use crate::tournament::models::{
    Group, GroupId, NewReward, STARTING_COINS, STARTING_LEVEL, Tournament, TournamentId,
    TournamentReward, TournamentStatus, TournamentUser, User, UserId,
};

/// PostgreSQL-backed store implementing every repository trait
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

fn tournament_from_row(row: &PgRow) -> Result<Tournament, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Tournament {
        id: row.try_get("id")?,
        start_date: row.try_get::<DateTime<Utc>, _>("start_date")?,
        end_date: row.try_get::<DateTime<Utc>, _>("end_date")?,
        status: status
            .parse::<TournamentStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        coins: row.try_get("coins")?,
        level: row.try_get("level")?,
        country: row.try_get("country")?,
    })
}

fn group_from_row(row: &PgRow) -> Result<Group, sqlx::Error> {
    Ok(Group {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        group_number: row.try_get("group_number")?,
        current_size: row.try_get("current_size")?,
    })
}

fn participant_from_row(row: &PgRow) -> Result<TournamentUser, sqlx::Error> {
    Ok(TournamentUser {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        user_id: row.try_get("user_id")?,
        group_id: row.try_get("group_id")?,
        score: row.try_get("score")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn reward_from_row(row: &PgRow) -> Result<TournamentReward, sqlx::Error> {
    Ok(TournamentReward {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        user_id: row.try_get("user_id")?,
        rank: row.try_get("rank")?,
        reward_coins: row.try_get("reward_coins")?,
        claimed: row.try_get("claimed")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn collect_rows<T>(
    rows: Vec<PgRow>,
    decode: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>, sqlx::Error> {
    rows.iter().map(decode).collect()
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = with_timeout(
            self.read_timeout,
            sqlx::query("SELECT id, username, coins, level, country FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch user by ID")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode user")
    }

    async fn create_user(&self, username: &str, country: &str) -> StoreResult<Option<User>> {
        let row = with_timeout(
            self.write_timeout,
            sqlx::query(
                r#"
                INSERT INTO users (username, coins, level, country)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (username) DO NOTHING
                RETURNING id, username, coins, level, country
                "#,
            )
            .bind(username)
            .bind(STARTING_COINS)
            .bind(STARTING_LEVEL)
            .bind(country)
            .fetch_optional(self.pool.as_ref()),
        )
        .await
        .context("failed to create user")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode user")
    }

    async fn level_up(&self, user_id: UserId, coins: i64) -> StoreResult<Option<User>> {
        let row = with_timeout(
            self.write_timeout,
            sqlx::query(
                r#"
                UPDATE users SET level = level + 1, coins = coins + $1
                WHERE id = $2
                RETURNING id, username, coins, level, country
                "#,
            )
            .bind(coins)
            .bind(user_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await
        .context("failed to update user progress")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode user")
    }

    async fn credit_coins(&self, user_id: UserId, amount: i64) -> StoreResult<Option<i64>> {
        let row = with_timeout(
            self.write_timeout,
            sqlx::query("UPDATE users SET coins = coins + $1 WHERE id = $2 RETURNING coins")
                .bind(amount)
                .bind(user_id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await
        .context("failed to credit user coins")?;

        row.map(|r| r.try_get::<i64, _>("coins"))
            .transpose()
            .context("failed to decode user balance")
    }
}

#[async_trait]
impl TournamentRepository for PgStore {
    async fn create(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        status: TournamentStatus,
    ) -> StoreResult<Tournament> {
        let row = with_timeout(
            self.write_timeout,
            sqlx::query(
                r#"
                INSERT INTO tournaments (start_date, end_date, status)
                VALUES ($1, $2, $3)
                RETURNING id, start_date, end_date, status
                "#,
            )
            .bind(start_date)
            .bind(end_date)
            .bind(status.as_str())
            .fetch_one(self.pool.as_ref()),
        )
        .await
        .context("failed to create tournament")?;

        tournament_from_row(&row).context("failed to decode tournament")
    }

    async fn find_by_id(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = with_timeout(
            self.read_timeout,
            sqlx::query("SELECT id, start_date, end_date, status FROM tournaments WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch tournament by ID")?;

        row.as_ref()
            .map(tournament_from_row)
            .transpose()
            .context("failed to decode tournament")
    }

    async fn update_status(&self, id: TournamentId, status: TournamentStatus) -> StoreResult<()> {
        with_timeout(
            self.write_timeout,
            sqlx::query("UPDATE tournaments SET status = $1 WHERE id = $2")
                .bind(status.as_str())
                .bind(id)
                .execute(self.pool.as_ref()),
        )
        .await
        .context("failed to update tournament")?;
        Ok(())
    }

    async fn find_active(&self, now: DateTime<Utc>) -> StoreResult<Option<Tournament>> {
        let row = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, start_date, end_date, status
                FROM tournaments
                WHERE status = 'active' AND start_date <= $1 AND end_date >= $1
                ORDER BY start_date DESC
                LIMIT 1
                "#,
            )
            .bind(now)
            .fetch_optional(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch active tournament")?;

        row.as_ref()
            .map(tournament_from_row)
            .transpose()
            .context("failed to decode tournament")
    }

    async fn find_open_by_start(
        &self,
        start_date: DateTime<Utc>,
    ) -> StoreResult<Option<Tournament>> {
        let row = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, start_date, end_date, status
                FROM tournaments
                WHERE start_date = $1 AND status IN ('planned', 'active')
                ORDER BY (status = 'active') DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(start_date)
            .fetch_optional(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch tournament by start date")?;

        row.as_ref()
            .map(tournament_from_row)
            .transpose()
            .context("failed to decode tournament")
    }

    async fn activate(
        &self,
        id: TournamentId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Tournament>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin activation transaction")?;

        // Self-conflicting lock mode: concurrent activations run one at a
        // time while plain reads and entry row locks proceed.
        with_timeout(
            self.write_timeout,
            sqlx::query("LOCK TABLE tournaments IN SHARE ROW EXCLUSIVE MODE").execute(&mut *tx),
        )
        .await
        .context("failed to lock tournaments")?;

        let other = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, start_date, end_date, status
                FROM tournaments
                WHERE status = 'active' AND id <> $1 AND start_date <= $2 AND end_date >= $2
                ORDER BY start_date DESC
                LIMIT 1
                "#,
            )
            .bind(id)
            .bind(now)
            .fetch_optional(&mut *tx),
        )
        .await
        .context("failed to fetch active tournament")?;

        if let Some(row) = other {
            return tournament_from_row(&row)
                .map(Some)
                .context("failed to decode tournament");
        }

        with_timeout(
            self.write_timeout,
            sqlx::query("UPDATE tournaments SET status = 'active' WHERE id = $1")
                .bind(id)
                .execute(&mut *tx),
        )
        .await
        .context("failed to activate tournament")?;

        tx.commit()
            .await
            .context("failed to commit activation transaction")?;
        Ok(None)
    }
}

#[async_trait]
impl ParticipantRepository for PgStore {
    async fn find(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<Option<TournamentUser>> {
        // Duplicate rows are possible; the earliest entry is the one that scores.
        let row = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, tournament_id, user_id, group_id, score, created_at
                FROM tournament_users
                WHERE tournament_id = $1 AND user_id = $2
                ORDER BY id
                LIMIT 1
                "#,
            )
            .bind(tournament_id)
            .bind(user_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch tournament user")?;

        row.as_ref()
            .map(participant_from_row)
            .transpose()
            .context("failed to decode tournament user")
    }

    async fn increment_score(&self, participant_id: i64) -> StoreResult<i64> {
        let row = with_timeout(
            self.write_timeout,
            sqlx::query(
                "UPDATE tournament_users SET score = score + 1 WHERE id = $1 RETURNING score",
            )
            .bind(participant_id)
            .fetch_one(self.pool.as_ref()),
        )
        .await
        .context("failed to update tournament user score")?;

        row.try_get::<i64, _>("score")
            .context("failed to decode tournament user score")
    }

    async fn list_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<TournamentUser>> {
        let rows = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, tournament_id, user_id, group_id, score, created_at
                FROM tournament_users
                WHERE tournament_id = $1
                ORDER BY id
                "#,
            )
            .bind(tournament_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch tournament users by tournament ID")?;

        collect_rows(rows, participant_from_row).context("failed to decode tournament users")
    }

    async fn list_by_group(
        &self,
        tournament_id: TournamentId,
        group_id: GroupId,
    ) -> StoreResult<Vec<TournamentUser>> {
        let rows = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, tournament_id, user_id, group_id, score, created_at
                FROM tournament_users
                WHERE tournament_id = $1 AND group_id = $2
                ORDER BY score DESC, id
                "#,
            )
            .bind(tournament_id)
            .bind(group_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch tournament users by group")?;

        collect_rows(rows, participant_from_row).context("failed to decode tournament users")
    }

    async fn list_groups(&self, tournament_id: TournamentId) -> StoreResult<Vec<Group>> {
        let rows = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, tournament_id, group_number, current_size
                FROM tournament_groups
                WHERE tournament_id = $1
                ORDER BY group_number
                "#,
            )
            .bind(tournament_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch tournament groups")?;

        collect_rows(rows, group_from_row).context("failed to decode tournament groups")
    }
}

#[async_trait]
impl RewardRepository for PgStore {
    async fn create_rewards(&self, rewards: &[NewReward]) -> StoreResult<()> {
        if rewards.is_empty() {
            return Ok(());
        }

        let tournament_ids: Vec<i64> = rewards.iter().map(|r| r.tournament_id).collect();
        let user_ids: Vec<i64> = rewards.iter().map(|r| r.user_id).collect();
        let ranks: Vec<i32> = rewards.iter().map(|r| r.rank).collect();
        let coins: Vec<i64> = rewards.iter().map(|r| r.reward_coins).collect();

        with_timeout(
            self.write_timeout,
            sqlx::query(
                r#"
                INSERT INTO tournament_rewards (tournament_id, user_id, rank, reward_coins)
                SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::INTEGER[], $4::BIGINT[])
                "#,
            )
            .bind(tournament_ids)
            .bind(user_ids)
            .bind(ranks)
            .bind(coins)
            .execute(self.pool.as_ref()),
        )
        .await
        .context("failed to create tournament rewards")?;
        Ok(())
    }

    async fn unclaimed_by_user(&self, user_id: UserId) -> StoreResult<Vec<TournamentReward>> {
        let rows = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, tournament_id, user_id, rank, reward_coins, claimed, created_at
                FROM tournament_rewards
                WHERE user_id = $1 AND claimed = FALSE
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch unclaimed rewards")?;

        collect_rows(rows, reward_from_row).context("failed to decode tournament rewards")
    }

    async fn mark_claimed(&self, reward_id: i64) -> StoreResult<()> {
        with_timeout(
            self.write_timeout,
            sqlx::query("UPDATE tournament_rewards SET claimed = TRUE WHERE id = $1")
                .bind(reward_id)
                .execute(self.pool.as_ref()),
        )
        .await
        .context("failed to claim reward")?;
        Ok(())
    }

    async fn list_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<TournamentReward>> {
        let rows = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, tournament_id, user_id, rank, reward_coins, claimed, created_at
                FROM tournament_rewards
                WHERE tournament_id = $1
                ORDER BY rank
                "#,
            )
            .bind(tournament_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await
        .context("failed to fetch tournament rewards")?;

        collect_rows(rows, reward_from_row).context("failed to decode tournament rewards")
    }
}

#[async_trait]
impl EntryStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn EntryTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("failed to begin entry transaction")?;

        Ok(Box::new(PgEntryTransaction {
            tx,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        }))
    }
}

/// Entry commit running inside one PostgreSQL transaction
pub struct PgEntryTransaction {
    tx: Transaction<'static, Postgres>,
    read_timeout: Duration,
    write_timeout: Duration,
}

#[async_trait]
impl EntryTransaction for PgEntryTransaction {
    async fn find_active_tournament(
        &mut self,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Tournament>> {
        let row = with_timeout(
            self.read_timeout,
            sqlx::query(
                r#"
                SELECT id, start_date, end_date, status
                FROM tournaments
                WHERE status = 'active' AND start_date <= $1 AND end_date >= $1
                ORDER BY start_date DESC
                LIMIT 1
                "#,
            )
            .bind(now)
            .fetch_optional(&mut *self.tx),
        )
        .await
        .context("failed to fetch active tournament")?;

        row.as_ref()
            .map(tournament_from_row)
            .transpose()
            .context("failed to decode tournament")
    }

    async fn lock_user(&mut self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = with_timeout(
            self.read_timeout,
            sqlx::query(
                "SELECT id, username, coins, level, country FROM users WHERE id = $1 FOR UPDATE",
            )
            .bind(user_id)
            .fetch_optional(&mut *self.tx),
        )
        .await
        .context("failed to find user for update")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode user")
    }

    async fn set_user_coins(&mut self, user_id: UserId, coins: i64) -> StoreResult<()> {
        with_timeout(
            self.write_timeout,
            sqlx::query("UPDATE users SET coins = $1 WHERE id = $2")
                .bind(coins)
                .bind(user_id)
                .execute(&mut *self.tx),
        )
        .await
        .context("failed to update user transactionally")?;
        Ok(())
    }

    async fn lock_last_group(&mut self, tournament_id: TournamentId) -> StoreResult<Option<Group>> {
        // A tournament without groups has no row to lock, and a sealed group
        // is re-read by every waiter; the tournament row lock serialises the
        // creation of the next group number.
        with_timeout(
            self.write_timeout,
            sqlx::query("SELECT id FROM tournaments WHERE id = $1 FOR UPDATE")
                .bind(tournament_id)
                .fetch_optional(&mut *self.tx),
        )
        .await
        .context("failed to lock tournament")?;

        let row = with_timeout(
            self.write_timeout,
            sqlx::query(
                r#"
                SELECT id, tournament_id, group_number, current_size
                FROM tournament_groups
                WHERE tournament_id = $1
                ORDER BY group_number DESC
                LIMIT 1
                FOR UPDATE
                "#,
            )
            .bind(tournament_id)
            .fetch_optional(&mut *self.tx),
        )
        .await
        .context("failed to find last group for tournament")?;

        row.as_ref()
            .map(group_from_row)
            .transpose()
            .context("failed to decode group")
    }

    async fn create_group(
        &mut self,
        tournament_id: TournamentId,
        group_number: i32,
    ) -> StoreResult<Group> {
        let row = with_timeout(
            self.write_timeout,
            sqlx::query(
                r#"
                INSERT INTO tournament_groups (tournament_id, group_number, current_size)
                VALUES ($1, $2, 0)
                RETURNING id, tournament_id, group_number, current_size
                "#,
            )
            .bind(tournament_id)
            .bind(group_number)
            .fetch_one(&mut *self.tx),
        )
        .await
        .context("failed to create group")?;

        group_from_row(&row).context("failed to decode group")
    }

    async fn set_group_size(&mut self, group_id: GroupId, size: i32) -> StoreResult<()> {
        with_timeout(
            self.write_timeout,
            sqlx::query("UPDATE tournament_groups SET current_size = $1 WHERE id = $2")
                .bind(size)
                .bind(group_id)
                .execute(&mut *self.tx),
        )
        .await
        .context("failed to update group")?;
        Ok(())
    }

    async fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
        group_id: GroupId,
    ) -> StoreResult<TournamentUser> {
        let row = with_timeout(
            self.write_timeout,
            sqlx::query(
                r#"
                INSERT INTO tournament_users (tournament_id, user_id, group_id, score)
                VALUES ($1, $2, $3, 0)
                RETURNING id, tournament_id, user_id, group_id, score, created_at
                "#,
            )
            .bind(tournament_id)
            .bind(user_id)
            .bind(group_id)
            .fetch_one(&mut *self.tx),
        )
        .await
        .context("failed to create tournament user")?;

        participant_from_row(&row).context("failed to decode tournament user")
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .context("failed to commit entry transaction")
    }
}
