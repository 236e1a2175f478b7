mod common;

use common::{FaultStore, TestPlatform};
use std::sync::Arc;
use wayfarer::config::PlatformConfig;
use wayfarer::Platform;

const LAKES: [&str; 5] = [
    "Lake Superior shoreline",
    "a view of Lake Michigan",
    "Lake Huron",
    "lake erie in the fog",
    "Lake Ontario from the pier",
];

#[tokio::test]
async fn test_great_lakes_challenge_completes_on_fifth_landmark() {
    let t = TestPlatform::new();

    for detected in &LAKES[..4] {
        let outcomes = t.platform.submit_photo("alex", detected, 80).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].newly_completed);
        assert!(!outcomes[0].challenge_completed);
    }

    let progress = t.platform.challenge_progress("alex").await.unwrap();
    let lakes = &progress["great-lakes-explorer"];
    assert_eq!(lakes.completed_landmarks.len(), 4);
    assert!(lakes.completed_at.is_none());

    let outcomes = t.platform.submit_photo("alex", LAKES[4], 80).await.unwrap();
    assert!(outcomes[0].challenge_completed);
    assert_eq!(outcomes[0].bonus_awarded, 500);
    assert_eq!(outcomes[0].challenge_total, 5 * 80 + 500);

    let progress = t.platform.challenge_progress("alex").await.unwrap();
    assert!(progress["great-lakes-explorer"].completed_at.is_some());

    // The one-time bonus flowed into the lifetime aggregate and the
    // global ranking.
    let stats = t.platform.user_stats("alex").await.unwrap();
    assert_eq!(stats.aggregate.total_score, 500);
    assert_eq!(stats.aggregate.games_played, 0);
    assert_eq!(stats.global_rank, Some(1));
}

#[tokio::test]
async fn test_resubmitting_a_landmark_changes_nothing() {
    let t = TestPlatform::new();

    let first = t
        .platform
        .submit_photo("alex", "Lake Superior", 80)
        .await
        .unwrap();
    assert!(first[0].newly_completed);

    let second = t
        .platform
        .submit_photo("alex", "Lake Superior", 80)
        .await
        .unwrap();
    assert!(!second[0].newly_completed);
    assert!(!second[0].challenge_completed);

    // Phrasing variants of the same landmark are also no-ops.
    let third = t
        .platform
        .submit_photo("alex", "photo of lake superior at dawn", 80)
        .await
        .unwrap();
    assert!(!third[0].newly_completed);

    let progress = t.platform.challenge_progress("alex").await.unwrap();
    let lakes = &progress["great-lakes-explorer"];
    assert_eq!(lakes.completed_landmarks.len(), 1);
    assert_eq!(lakes.total_score, 80);
}

#[tokio::test]
async fn test_completion_bonus_is_paid_exactly_once() {
    let t = TestPlatform::new();

    for detected in LAKES {
        t.platform.submit_photo("alex", detected, 50).await.unwrap();
    }
    let stamped = t.platform.challenge_progress("alex").await.unwrap()
        ["great-lakes-explorer"]
        .completed_at
        .unwrap();

    // Replaying the full set after completion awards nothing further.
    for detected in LAKES {
        let outcomes = t.platform.submit_photo("alex", detected, 50).await.unwrap();
        assert!(!outcomes[0].challenge_completed);
        assert_eq!(outcomes[0].bonus_awarded, 0);
    }

    let progress = t.platform.challenge_progress("alex").await.unwrap();
    assert_eq!(progress["great-lakes-explorer"].completed_at.unwrap(), stamped);
    assert_eq!(progress["great-lakes-explorer"].total_score, 5 * 50 + 500);

    let stats = t.platform.user_stats("alex").await.unwrap();
    assert_eq!(stats.aggregate.total_score, 500);
}

#[tokio::test]
async fn test_completion_bonus_survives_a_failed_aggregate_write() {
    let store = Arc::new(FaultStore::new());
    let platform = Platform::new(store.clone(), PlatformConfig::default());
    let downtown = ["City Hall", "Union Station", "Riverfront Park"];

    for landmark in &downtown[..2] {
        platform.submit_photo("alex", landmark, 40).await.unwrap();
    }

    // The completing photo stamps the challenge, but the bonus transfer
    // into the aggregate fails.
    store.fail_next_put("stats:").await;
    let result = platform.submit_photo("alex", downtown[2], 40).await;
    assert!(result.is_err());

    let progress = platform.challenge_progress("alex").await.unwrap();
    assert!(progress["downtown-discovery"].completed_at.is_some());
    assert_eq!(platform.user_stats("alex").await.unwrap().aggregate.total_score, 0);

    // The host retries the same photo: the landmark is a no-op but the
    // pending bonus still gets paid.
    let retry = platform.submit_photo("alex", downtown[2], 40).await.unwrap();
    assert!(!retry[0].newly_completed);
    let stats = platform.user_stats("alex").await.unwrap();
    assert_eq!(stats.aggregate.total_score, 250);
    assert_eq!(stats.global_rank, Some(1));

    // A further replay pays nothing more.
    platform.submit_photo("alex", downtown[2], 40).await.unwrap();
    let stats = platform.user_stats("alex").await.unwrap();
    assert_eq!(stats.aggregate.total_score, 250);
}

#[tokio::test]
async fn test_unmatched_photo_is_accepted_but_records_nothing() {
    let t = TestPlatform::new();

    let outcomes = t
        .platform
        .submit_photo("alex", "an unremarkable parking lot", 30)
        .await
        .unwrap();
    assert!(outcomes.is_empty());
    assert!(t.platform.challenge_progress("alex").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_each_user_progresses_independently() {
    let t = TestPlatform::new();

    t.platform
        .submit_photo("alex", "Lake Superior", 80)
        .await
        .unwrap();
    t.platform
        .submit_photo("blake", "Lake Erie", 60)
        .await
        .unwrap();

    let alex = t.platform.challenge_progress("alex").await.unwrap();
    let blake = t.platform.challenge_progress("blake").await.unwrap();
    assert_eq!(
        alex["great-lakes-explorer"].completed_landmarks,
        vec!["Lake Superior".to_string()]
    );
    assert_eq!(
        blake["great-lakes-explorer"].completed_landmarks,
        vec!["Lake Erie".to_string()]
    );
}
