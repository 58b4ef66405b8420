//! Integration tests for the frontier
//!
//! These tests drive the full submit/next/finished cycle through the
//! public API, including checkpoint recovery against a real SQLite file.

use kumo_frontier::checkpoint::CheckpointJournal;
use kumo_frontier::config::{
    BudgetSettings, Config, FrontierSettings, PolitenessSettings, StorageSettings,
};
use kumo_frontier::storage::SqliteStorage;
use kumo_frontier::{
    DiscoverySource, FetchOutcome, Frontier, FrontierError, RetireReason, SubmitOutcome,
};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

/// Creates a test configuration with short politeness delays
fn create_test_config(min_delay_ms: u64, db_path: &str) -> Config {
    Config {
        frontier: FrontierSettings {
            max_concurrent_fetches: 4,
            queue_concurrency: 1,
            max_attempts: 3,
            checkpoint_every: 0,
            seeds: vec![],
        },
        politeness: PolitenessSettings {
            min_delay_ms,
            max_delay_ms: 300_000,
            delay_factor: 2.0,
        },
        budget: BudgetSettings::default(),
        storage: StorageSettings {
            database_path: db_path.to_string(),
            snapshots_to_keep: 3,
        },
    }
}

fn ok_fetch(bytes: u64) -> FetchOutcome {
    FetchOutcome::Success {
        status: 200,
        bytes,
        fetch_duration: Duration::from_millis(20),
        server_delay: None,
        content_digest: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_politeness_gap_is_enforced() {
    let frontier = Frontier::new(create_test_config(1000, ":memory:"));
    frontier.add_seed("https://a.test/1").unwrap();
    frontier.add_seed("https://a.test/2").unwrap();

    let first = frontier.next().await.unwrap();
    let finished_at = tokio::time::Instant::now();
    frontier.finished(first, ok_fetch(100));

    let second = frontier.next().await.unwrap();
    let gap = tokio::time::Instant::now() - finished_at;
    assert!(
        gap >= Duration::from_millis(1000),
        "gap {:?} shorter than the politeness delay",
        gap
    );
    assert_eq!(second.record.canonical.host_str(), Some("a.test"));
}

#[tokio::test]
async fn test_canonical_duplicates_are_filtered() {
    let frontier = Frontier::new(create_test_config(10, ":memory:"));

    assert_eq!(
        frontier
            .submit("https://a.test/page?b=2&a=1", 1, DiscoverySource::Seed)
            .unwrap(),
        SubmitOutcome::Admitted
    );

    // Same resource, different spelling
    for raw in [
        "HTTPS://A.TEST/page?a=1&b=2",
        "https://a.test/page?b=2&a=1#section",
        "https://a.test//page/?a=1&b=2",
    ] {
        assert_eq!(
            frontier
                .submit(raw, 1, DiscoverySource::Link {
                    parent: "https://a.test/".to_string(),
                    hop: 1,
                })
                .unwrap(),
            SubmitOutcome::Duplicate,
            "{} should be a duplicate",
            raw
        );
    }

    assert_eq!(frontier.status().queued_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_hosts_share_dispatches_fairly() {
    let frontier = Frontier::new(create_test_config(10, ":memory:"));
    for i in 0..5 {
        frontier
            .submit(&format!("https://a.test/{}", i), 1, DiscoverySource::Seed)
            .unwrap();
        frontier
            .submit(&format!("https://b.test/{}", i), 1, DiscoverySource::Seed)
            .unwrap();
    }

    let mut per_host: HashMap<String, u32> = HashMap::new();
    for _ in 0..10 {
        let dispatch = frontier.next().await.unwrap();
        *per_host
            .entry(dispatch.record.queue_key.clone())
            .or_default() += 1;
        frontier.finished(dispatch, ok_fetch(100));
    }

    assert_eq!(per_host.get("a.test"), Some(&5));
    assert_eq!(per_host.get("b.test"), Some(&5));
}

#[tokio::test(start_paused = true)]
async fn test_retry_ceiling_retires_without_redispatch() {
    let frontier = Frontier::new(create_test_config(10, ":memory:"));
    frontier.add_seed("https://a.test/flaky").unwrap();
    let mut events = frontier.subscribe_completed();

    for attempt in 1..=3 {
        let dispatch = frontier.next().await.unwrap();
        assert_eq!(dispatch.record.attempts, attempt - 1);
        frontier.finished(
            dispatch,
            FetchOutcome::Retryable {
                error: "connect timeout".to_string(),
                fetch_duration: Duration::from_millis(20),
                server_delay: None,
            },
        );
    }

    // Never offered again
    assert!(matches!(
        frontier.next().await,
        Err(FrontierError::Exhausted)
    ));

    let event = events.recv().await.unwrap();
    assert_eq!(event.reason, RetireReason::MaxRetriesExceeded);
    assert_eq!(event.attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_server_advised_delay_extends_gap() {
    let frontier = Frontier::new(create_test_config(100, ":memory:"));
    frontier.add_seed("https://a.test/1").unwrap();
    frontier.add_seed("https://a.test/2").unwrap();

    let first = frontier.next().await.unwrap();
    let finished_at = tokio::time::Instant::now();
    frontier.finished(
        first,
        FetchOutcome::Success {
            status: 200,
            bytes: 100,
            fetch_duration: Duration::from_millis(20),
            server_delay: Some(Duration::from_secs(5)),
            content_digest: None,
        },
    );

    frontier.next().await.unwrap();
    let gap = tokio::time::Instant::now() - finished_at;
    assert!(gap >= Duration::from_secs(5), "gap {:?} ignored Retry-After", gap);
}

#[tokio::test(start_paused = true)]
async fn test_byte_budget_stops_admission() {
    let mut config = create_test_config(10, ":memory:");
    config.budget.max_bytes = Some(1000);
    let frontier = Frontier::new(config);

    frontier.add_seed("https://a.test/big").unwrap();
    let dispatch = frontier.next().await.unwrap();
    frontier.finished(dispatch, ok_fetch(1500));

    assert_eq!(
        frontier.add_seed("https://b.test/late").unwrap(),
        SubmitOutcome::BudgetExhausted
    );
}

#[tokio::test(start_paused = true)]
async fn test_time_budget_stops_admission() {
    let mut config = create_test_config(10, ":memory:");
    config.budget.max_crawl_seconds = Some(60);
    let frontier = Frontier::new(config);

    assert_eq!(
        frontier.add_seed("https://a.test/early").unwrap(),
        SubmitOutcome::Admitted
    );

    tokio::time::advance(Duration::from_secs(61)).await;

    assert_eq!(
        frontier.add_seed("https://a.test/late").unwrap(),
        SubmitOutcome::BudgetExhausted
    );
}

#[tokio::test(start_paused = true)]
async fn test_checkpoint_recovery_resumes_pending_work() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("frontier.db");
    let db_str = db_path.to_str().unwrap().to_string();

    let config = create_test_config(10, &db_str);
    let frontier = Frontier::new(config.clone());
    frontier.add_seed("https://a.test/done").unwrap();
    frontier.add_seed("https://a.test/pending").unwrap();
    frontier.add_seed("https://b.test/in-flight").unwrap();

    // Complete one, leave one in flight, one pending
    let done = frontier.next().await.unwrap();
    let done_key = done.record.canonical.clone();
    frontier.finished(done, ok_fetch(100));
    let held = frontier.next().await.unwrap();

    let mut journal = CheckpointJournal::new(
        Box::new(SqliteStorage::new(&db_path).unwrap()),
        config.storage.snapshots_to_keep,
    );
    journal.checkpoint(&frontier, "test-hash").unwrap();
    drop(held);
    drop(frontier);

    // Recover in a fresh process
    let journal = CheckpointJournal::new(
        Box::new(SqliteStorage::new(&db_path).unwrap()),
        config.storage.snapshots_to_keep,
    );
    let recovered = journal
        .recover(config, "test-hash")
        .unwrap()
        .expect("snapshot present");

    // The in-flight record comes back as pending
    assert_eq!(recovered.status().queued_count, 2);

    let mut remaining = Vec::new();
    loop {
        match recovered.next().await {
            Ok(dispatch) => {
                remaining.push(dispatch.record.canonical.to_string());
                recovered.finished(dispatch, ok_fetch(100));
            }
            Err(FrontierError::Exhausted) => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().any(|u| u.ends_with("/pending")));
    assert!(remaining.iter().any(|u| u.ends_with("/in-flight")));

    // The completed record stays behind the uniqueness filter
    assert_eq!(
        recovered
            .submit(done_key.as_str(), 0, DiscoverySource::Seed)
            .unwrap(),
        SubmitOutcome::Duplicate
    );
}

#[tokio::test(start_paused = true)]
async fn test_recovery_refuses_changed_config() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("frontier.db");
    let db_str = db_path.to_str().unwrap().to_string();

    let config = create_test_config(10, &db_str);
    let frontier = Frontier::new(config.clone());
    frontier.add_seed("https://a.test/1").unwrap();

    let mut journal = CheckpointJournal::new(
        Box::new(SqliteStorage::new(&db_path).unwrap()),
        config.storage.snapshots_to_keep,
    );
    journal.checkpoint(&frontier, "hash-v1").unwrap();

    let result = journal.recover(config, "hash-v2");
    assert!(matches!(
        result,
        Err(FrontierError::ConfigMismatch { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_across_workers() {
    let frontier = std::sync::Arc::new(Frontier::new(create_test_config(10, ":memory:")));
    frontier.add_seed("https://a.test/1").unwrap();
    frontier.pause();
    assert!(frontier.status().paused);

    let worker = {
        let frontier = std::sync::Arc::clone(&frontier);
        tokio::spawn(async move { frontier.next().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!worker.is_finished());

    frontier.resume();
    let dispatch = worker.await.unwrap().unwrap();
    assert_eq!(dispatch.record.canonical.as_str(), "https://a.test/1");
}

#[tokio::test(start_paused = true)]
async fn test_completed_events_carry_outcomes() {
    let frontier = Frontier::new(create_test_config(10, ":memory:"));
    let mut events = frontier.subscribe_completed();

    frontier.add_seed("https://a.test/ok").unwrap();
    frontier.add_seed("https://b.test/broken").unwrap();

    for _ in 0..2 {
        let dispatch = frontier.next().await.unwrap();
        let outcome = if dispatch.record.canonical.host_str() == Some("a.test") {
            ok_fetch(2048)
        } else {
            FetchOutcome::Fatal {
                error: "unsupported content type".to_string(),
            }
        };
        frontier.finished(dispatch, outcome);
    }

    let mut by_reason: HashMap<RetireReason, u64> = HashMap::new();
    for _ in 0..2 {
        let event = events.recv().await.unwrap();
        *by_reason.entry(event.reason).or_default() += 1;
    }
    assert_eq!(by_reason.get(&RetireReason::Completed), Some(&1));
    assert_eq!(by_reason.get(&RetireReason::Fatal), Some(&1));
}
