//! Tiered rewards computed at close, and reward claiming.

use std::sync::Arc;

use super::{
    errors::{TournamentError, TournamentResult},
    models::{
        ClaimSummary, NewReward, REWARDED_RANKS, TournamentId, TournamentReward, TournamentUser,
        UserId,
    },
};
use crate::{
    config::{ConfigHandle, DynamicConfig},
    db::{ParticipantRepository, RewardRepository, UserRepository},
    telemetry,
};

/// Coins per rank: three podium amounts and one shared amount for 4 through 10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardTiers {
    pub first: i64,
    pub second: i64,
    pub third: i64,
    pub fourth_to_tenth: i64,
}

impl RewardTiers {
    pub fn from_config(config: &DynamicConfig) -> Self {
        Self {
            first: config.reward1,
            second: config.reward2,
            third: config.reward3,
            fourth_to_tenth: config.reward4_to_10,
        }
    }

    /// Coins for a 1-based rank; `None` past the rewarded ranks
    pub fn coins_for_rank(&self, rank: usize) -> Option<i64> {
        match rank {
            1 => Some(self.first),
            2 => Some(self.second),
            3 => Some(self.third),
            4..=REWARDED_RANKS => Some(self.fourth_to_tenth),
            _ => None,
        }
    }
}

/// Order participants best first: higher score, then earlier entry, then lower id
pub fn rank_participants(participants: &[TournamentUser]) -> Vec<&TournamentUser> {
    let mut ranked: Vec<&TournamentUser> = participants.iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    ranked
}

/// Reward rows for the top ranks of a tournament
pub fn compute_rewards(
    tournament_id: TournamentId,
    participants: &[TournamentUser],
    tiers: &RewardTiers,
) -> Vec<NewReward> {
    rank_participants(participants)
        .into_iter()
        .take(REWARDED_RANKS)
        .enumerate()
        .filter_map(|(idx, participant)| {
            let rank = idx + 1;
            tiers.coins_for_rank(rank).map(|coins| NewReward {
                tournament_id,
                user_id: participant.user_id,
                rank: rank as i32,
                reward_coins: coins,
            })
        })
        .collect()
}

/// Persists rewards at close and pays them out on claim
#[derive(Clone)]
pub struct RewardDistributor {
    users: Arc<dyn UserRepository>,
    participants: Arc<dyn ParticipantRepository>,
    rewards: Arc<dyn RewardRepository>,
    config: ConfigHandle,
}

impl RewardDistributor {
    pub fn new(
        users: Arc<dyn UserRepository>,
        participants: Arc<dyn ParticipantRepository>,
        rewards: Arc<dyn RewardRepository>,
        config: ConfigHandle,
    ) -> Self {
        Self {
            users,
            participants,
            rewards,
            config,
        }
    }

    /// Rank the tournament's participants and insert unclaimed rows in one batch
    pub async fn store_rewards(&self, tournament_id: TournamentId) -> TournamentResult<Vec<NewReward>> {
        let participants = self.participants.list_by_tournament(tournament_id).await?;
        let tiers = RewardTiers::from_config(&self.config.snapshot());
        let rewards = compute_rewards(tournament_id, &participants, &tiers);

        if rewards.is_empty() {
            log::info!("Tournament {} closed without participants", tournament_id);
            return Ok(rewards);
        }

        self.rewards.create_rewards(&rewards).await?;
        telemetry::rewards_created_total(rewards.len());
        log::info!(
            "Stored {} rewards for tournament {} ({} participants)",
            rewards.len(),
            tournament_id,
            participants.len()
        );

        Ok(rewards)
    }

    /// Credit the sum of all unclaimed rewards, then mark each one claimed.
    ///
    /// The credit and the marks are separate writes: if marking fails after
    /// the credit, the remaining rewards stay claimable.
    pub async fn claim(&self, user_id: UserId) -> TournamentResult<ClaimSummary> {
        let unclaimed = self.rewards.unclaimed_by_user(user_id).await?;
        if unclaimed.is_empty() {
            return Err(TournamentError::NoUnclaimedReward(user_id));
        }

        let total_coins: i64 = unclaimed.iter().map(|r| r.reward_coins).sum();
        let new_balance = self
            .users
            .credit_coins(user_id, total_coins)
            .await?
            .ok_or(TournamentError::UserNotFound(user_id))?;

        let mut reward_ids = Vec::with_capacity(unclaimed.len());
        for reward in &unclaimed {
            self.rewards.mark_claimed(reward.id).await?;
            reward_ids.push(reward.id);
        }

        telemetry::reward_coins_claimed(total_coins);
        log::info!(
            "User {} claimed {} rewards worth {} coins",
            user_id,
            reward_ids.len(),
            total_coins
        );

        Ok(ClaimSummary {
            user_id,
            total_coins,
            reward_ids,
            new_balance,
        })
    }

    pub async fn rewards_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<TournamentReward>> {
        Ok(self.rewards.list_by_tournament(tournament_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn participant(id: i64, score: i64, entered_secs: i64) -> TournamentUser {
        TournamentUser {
            id,
            tournament_id: 1,
            user_id: 100 + id,
            group_id: 1,
            score,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
                + Duration::seconds(entered_secs),
        }
    }

    const TIERS: RewardTiers = RewardTiers {
        first: 100,
        second: 50,
        third: 25,
        fourth_to_tenth: 10,
    };

    #[test]
    fn test_twelve_participants_get_ten_rewards() {
        let participants: Vec<_> = (1..=12).map(|i| participant(i, 100 - i, 0)).collect();
        let rewards = compute_rewards(1, &participants, &TIERS);

        let coins: Vec<i64> = rewards.iter().map(|r| r.reward_coins).collect();
        assert_eq!(coins, vec![100, 50, 25, 10, 10, 10, 10, 10, 10, 10]);
        assert!(rewards.iter().all(|r| r.user_id != 111 && r.user_id != 112));
        assert_eq!(rewards[0].user_id, 101);
    }

    #[test]
    fn test_ties_go_to_earlier_entrant() {
        let participants = vec![
            participant(1, 5, 30),
            participant(2, 5, 10),
            participant(3, 5, 10),
        ];
        let ranked: Vec<i64> = rank_participants(&participants)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ranked, vec![2, 3, 1]);
    }

    #[test]
    fn test_no_participants_no_rewards() {
        assert!(compute_rewards(1, &[], &TIERS).is_empty());
    }

    #[test]
    fn test_coins_for_rank_bounds() {
        assert_eq!(TIERS.coins_for_rank(0), None);
        assert_eq!(TIERS.coins_for_rank(4), Some(10));
        assert_eq!(TIERS.coins_for_rank(10), Some(10));
        assert_eq!(TIERS.coins_for_rank(11), None);
    }

    proptest! {
        #[test]
        fn prop_rewards_follow_ranking(scores in proptest::collection::vec(0i64..50, 0..40)) {
            let participants: Vec<_> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| participant(i as i64 + 1, *s, i as i64))
                .collect();
            let rewards = compute_rewards(1, &participants, &TIERS);

            prop_assert_eq!(rewards.len(), participants.len().min(REWARDED_RANKS));
            for (idx, reward) in rewards.iter().enumerate() {
                prop_assert_eq!(reward.rank as usize, idx + 1);
                prop_assert_eq!(Some(reward.reward_coins), TIERS.coins_for_rank(idx + 1));
            }

            let score_of = |user_id: i64| {
                participants.iter().find(|p| p.user_id == user_id).map(|p| p.score)
            };
            for pair in rewards.windows(2) {
                prop_assert!(score_of(pair[0].user_id) >= score_of(pair[1].user_id));
            }
            if let Some(last) = rewards.last() {
                let cutoff = score_of(last.user_id);
                let rewarded = |uid: i64| rewards.iter().any(|r| r.user_id == uid);
                for p in participants.iter().filter(|p| !rewarded(p.user_id)) {
                    prop_assert!(Some(p.score) <= cutoff);
                }
            }
        }
    }
}
