//! Integration tests for reward computation at close and claiming.

mod common;

use blast_tournament::{
    ErrorKind,
    db::{RewardRepository, UserRepository},
    tournament::{NewReward, TournamentError},
};
use chrono::Duration;
use common::{at, harness_at};

#[tokio::test]
async fn test_twelve_participants_ten_rewards() {
    let h = harness_at(at(9, 0, 0));
    let tournament = h.active_tournament().await;

    let mut users = Vec::new();
    for i in 0..12 {
        let user = h.eligible_user(&format!("p{i}"), "US").await;
        h.engine.entry().commit_entry(user.id).await.unwrap();
        let participant = h.participant(&tournament, &user).await.unwrap();
        h.store.set_score(participant.id, 100 - i).await;
        users.push(user);
        h.clock.advance(Duration::seconds(1));
    }

    let rewards = h.engine.close_tournament(tournament.id).await.unwrap();
    let coins: Vec<i64> = rewards.iter().map(|r| r.reward_coins).collect();
    assert_eq!(coins, vec![100, 50, 25, 10, 10, 10, 10, 10, 10, 10]);

    let stored = h.engine.tournament_rewards(tournament.id).await.unwrap();
    assert_eq!(stored.len(), 10);
    assert!(stored.iter().all(|r| !r.claimed));
    assert_eq!(stored[0].user_id, users[0].id);
    assert_eq!(stored[0].rank, 1);
    for loser in &users[10..] {
        assert!(stored.iter().all(|r| r.user_id != loser.id));
    }
}

#[tokio::test]
async fn test_tied_scores_favour_earlier_entrant() {
    let h = harness_at(at(9, 0, 0));
    let tournament = h.active_tournament().await;

    let early = h.eligible_user("early", "US").await;
    h.engine.entry().commit_entry(early.id).await.unwrap();
    h.clock.advance(Duration::minutes(5));
    let late = h.eligible_user("late", "US").await;
    h.engine.entry().commit_entry(late.id).await.unwrap();

    for user in [&early, &late] {
        let participant = h.participant(&tournament, user).await.unwrap();
        h.store.set_score(participant.id, 7).await;
    }

    let rewards = h.engine.close_tournament(tournament.id).await.unwrap();
    assert_eq!(rewards[0].user_id, early.id);
    assert_eq!(rewards[1].user_id, late.id);
}

#[tokio::test]
async fn test_claim_sums_all_unclaimed_rewards_once() {
    let h = harness_at(at(9, 0, 0));
    let user = h.store.insert_user("winner", 1000, 15, "US").await;
    h.store
        .create_rewards(&[
            NewReward {
                tournament_id: 1,
                user_id: user.id,
                rank: 2,
                reward_coins: 50,
            },
            NewReward {
                tournament_id: 2,
                user_id: user.id,
                rank: 4,
                reward_coins: 10,
            },
        ])
        .await
        .unwrap();

    let summary = h.engine.claim_rewards(user.id).await.unwrap();
    assert_eq!(summary.total_coins, 60);
    assert_eq!(summary.reward_ids.len(), 2);
    assert_eq!(summary.new_balance, 1060);

    let stored = UserRepository::find_by_id(h.store.as_ref(), user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.coins, 1060);
    assert!(h.store.unclaimed_by_user(user.id).await.unwrap().is_empty());

    let err = h.engine.claim_rewards(user.id).await.unwrap_err();
    assert!(matches!(err, TournamentError::NoUnclaimedReward(id) if id == user.id));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_failed_mark_leaves_rewards_claimable() {
    let h = harness_at(at(9, 0, 0));
    let user = h.store.insert_user("retry", 0, 15, "US").await;
    h.store
        .create_rewards(&[NewReward {
            tournament_id: 1,
            user_id: user.id,
            rank: 1,
            reward_coins: 100,
        }])
        .await
        .unwrap();

    h.store.fail_claim_marks(true);
    let err = h.engine.claim_rewards(user.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    h.store.fail_claim_marks(false);

    // The credit went through; the reward is still unclaimed.
    let stored = UserRepository::find_by_id(h.store.as_ref(), user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.coins, 100);
    assert_eq!(h.store.unclaimed_by_user(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_claim_for_unknown_user() {
    let h = harness_at(at(9, 0, 0));
    h.store
        .create_rewards(&[NewReward {
            tournament_id: 1,
            user_id: 4242,
            rank: 1,
            reward_coins: 100,
        }])
        .await
        .unwrap();

    assert!(matches!(
        h.engine.claim_rewards(4242).await,
        Err(TournamentError::UserNotFound(4242))
    ));
}

#[tokio::test]
async fn test_reward_insert_failure_surfaces_from_close() {
    let h = harness_at(at(9, 0, 0));
    let tournament = h.active_tournament().await;
    let user = h.eligible_user("solo", "US").await;
    h.engine.entry().commit_entry(user.id).await.unwrap();

    h.store.fail_reward_inserts(true);
    let err = h.engine.close_tournament(tournament.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}
