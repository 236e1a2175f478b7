mod common;

use chrono::Utc;
use common::{submission, TestPlatform};
use wayfarer::period::Period;
use wayfarer::store::keys::Keys;
use wayfarer::PlatformError;

#[tokio::test]
async fn test_trivia_submission_end_to_end() {
    let t = TestPlatform::new();

    let receipt = t
        .platform
        .submit_score(submission("alex", "trivia", 950))
        .await
        .unwrap();

    assert_eq!(receipt.clamped_score, 950);
    assert!(!receipt.flagged);
    assert!(receipt.ledger_recorded);
    assert_eq!(receipt.aggregate.total_score, 950);
    assert_eq!(receipt.aggregate.games_played, 1);
    let trivia = &receipt.aggregate.game_breakdown["trivia"];
    assert_eq!(trivia.plays, 1);
    assert_eq!(trivia.total_score, 950);
    assert_eq!(trivia.best_score, 950);

    // The entry lands in every period bucket.
    for period in Period::ALL {
        let board = t.platform.leaderboard("trivia", period, 10).await.unwrap();
        assert_eq!(board.len(), 1, "missing entry in {} bucket", period);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].entry.username, "alex");
        assert_eq!(board[0].entry.score, 950);
    }

    let stats = t.platform.user_stats("alex").await.unwrap();
    assert_eq!(stats.global_rank, Some(1));
}

#[tokio::test]
async fn test_implausible_photo_hunt_score_is_clamped_not_rejected() {
    let t = TestPlatform::new();

    let receipt = t
        .platform
        .submit_score(submission("alex", "photo-hunt", 500))
        .await
        .unwrap();

    assert_eq!(receipt.clamped_score, 120);
    assert!(receipt.flagged);

    // The clamped completion is still recorded everywhere.
    let board = t
        .platform
        .leaderboard("photo-hunt", Period::Daily, 10)
        .await
        .unwrap();
    assert_eq!(board[0].entry.score, 120);
    let stats = t.platform.user_stats("alex").await.unwrap();
    assert_eq!(stats.aggregate.total_score, 120);
}

#[tokio::test]
async fn test_invalid_submission_writes_nothing() {
    let t = TestPlatform::new();

    let result = t
        .platform
        .submit_score(submission("", "trivia", 100))
        .await;
    assert!(matches!(result, Err(PlatformError::Validation("username"))));

    let board = t
        .platform
        .leaderboard("trivia", Period::AllTime, 10)
        .await
        .unwrap();
    assert!(board.is_empty());
    assert!(t.platform.global_leaderboard(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sequential_submissions_accumulate() {
    use rand::Rng;

    let t = TestPlatform::new();
    let mut rng = rand::thread_rng();
    let scores: Vec<i64> = (0..20).map(|_| rng.gen_range(0..=1_000)).collect();

    for &score in &scores {
        t.platform
            .submit_score(submission("alex", "trivia", score))
            .await
            .unwrap();
    }

    let stats = t.platform.user_stats("alex").await.unwrap();
    assert_eq!(stats.aggregate.total_score, scores.iter().sum::<i64>());
    assert_eq!(stats.aggregate.games_played, scores.len() as u32);
    assert_eq!(
        stats.aggregate.game_breakdown["trivia"].best_score,
        scores.iter().copied().max().unwrap()
    );
}

#[tokio::test]
async fn test_global_ranking_keeps_one_entry_per_user() {
    let t = TestPlatform::new();

    // Alex climbs the board over three submissions; blake sits between.
    for score in [200, 400, 900] {
        t.platform
            .submit_score(submission("alex", "trivia", score))
            .await
            .unwrap();
    }
    t.platform
        .submit_score(submission("blake", "trivia", 1_000))
        .await
        .unwrap();

    let board = t.platform.global_leaderboard(10).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].username, "alex");
    assert_eq!(board[0].total_score, 1_500);
    assert_eq!(board[0].games_played, 3);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].username, "blake");
    assert_eq!(board[1].rank, 2);
}

#[tokio::test]
async fn test_daily_bucket_caps_at_one_hundred() {
    let t = TestPlatform::new();

    for i in 0..130 {
        t.platform
            .submit_score(submission(&format!("user{}", i), "geocache", i))
            .await
            .unwrap();
    }

    let board = t
        .platform
        .leaderboard("geocache", Period::Daily, 100)
        .await
        .unwrap();
    assert_eq!(board.len(), 100);
    // Only the 100 best survive the trim.
    assert!(board.iter().all(|r| r.entry.score >= 30));
    assert_eq!(board[0].entry.score, 129);
}

#[tokio::test]
async fn test_period_buckets_carry_ttls_but_alltime_never_expires() {
    let t = TestPlatform::new();
    t.platform
        .submit_score(submission("alex", "trivia", 100))
        .await
        .unwrap();

    let now = Utc::now();
    let daily = Keys::bucket(Period::Daily, &Period::Daily.key_for(now), "trivia");
    let weekly = Keys::bucket(Period::Weekly, &Period::Weekly.key_for(now), "trivia");
    let quarterly = Keys::bucket(Period::Quarterly, &Period::Quarterly.key_for(now), "trivia");
    let alltime = Keys::bucket(Period::AllTime, "alltime", "trivia");

    assert_eq!(t.store.ttl_of(&daily).await, Some(30 * 86_400));
    assert_eq!(t.store.ttl_of(&weekly).await, Some(90 * 86_400));
    assert_eq!(t.store.ttl_of(&quarterly).await, Some(365 * 86_400));
    assert_eq!(t.store.ttl_of(&alltime).await, None);
}

#[tokio::test]
async fn test_concurrent_submissions_for_one_user() {
    let t = TestPlatform::new();
    let platform = std::sync::Arc::new(t.platform);

    let mut handles = Vec::new();
    for _ in 0..25 {
        let platform = platform.clone();
        handles.push(tokio::spawn(async move {
            platform.submit_score(submission("alex", "trivia", 10)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = platform.user_stats("alex").await.unwrap();
    assert_eq!(stats.aggregate.total_score, 250);
    assert_eq!(stats.aggregate.games_played, 25);
}
