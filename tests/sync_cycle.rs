// Sync cycle tests: full fetch -> reconcile -> format -> dispatch against
// in-memory SQLite and scripted fakes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use common::{mod_record, updated_record, FakeChat, FakeSource};
use nimbusfeed::db::sqlite::SqliteDatabase;
use nimbusfeed::db::{Database, SubscriptionStore};
use nimbusfeed::error::FeedError;
use nimbusfeed::nexus::models::FetchedMod;
use nimbusfeed::pipeline::sync::{CycleReport, GameOutcome, SyncOrchestrator, LAST_SYNC_KEY};

struct Harness {
    db: Arc<dyn Database>,
    source: Arc<FakeSource>,
    chat: Arc<FakeChat>,
    orchestrator: Arc<SyncOrchestrator>,
}

fn harness_with(source: FakeSource) -> Harness {
    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::in_memory().unwrap());
    let source = Arc::new(source);
    let chat = Arc::new(FakeChat::default());
    let orchestrator = Arc::new(SyncOrchestrator::new(
        db.clone(),
        source.clone(),
        chat.clone(),
        4,
    ));
    Harness {
        db,
        source,
        chat,
        orchestrator,
    }
}

fn harness() -> Harness {
    harness_with(FakeSource::default())
}

async fn run(h: &Harness) -> CycleReport {
    h.orchestrator
        .try_run_cycle()
        .await
        .expect("cycle should not be skipped")
        .expect("cycle should not abort")
}

fn outcome<'a>(report: &'a CycleReport, game: &str) -> &'a GameOutcome {
    &report
        .games
        .iter()
        .find(|g| g.game == game)
        .expect("game missing from report")
        .outcome
}

#[tokio::test]
async fn new_mods_reach_every_subscribed_channel() {
    let h = harness();
    h.db.add_subscription("skyrim", "C1").await.unwrap();
    h.db.add_subscription("skyrim", "C2").await.unwrap();
    h.source
        .set_mods("skyrim", (1..=7).map(mod_record).collect::<Vec<FetchedMod>>());

    let report = run(&h).await;

    match outcome(&report, "skyrim") {
        GameOutcome::Delivered(d) => {
            assert_eq!(d.new_mods, 7);
            assert_eq!(d.messages, 2);
            assert_eq!(d.channels_delivered, 2);
        }
        other => panic!("expected Delivered, got {other:?}"),
    }
    for channel in ["C1", "C2"] {
        let sent = h.chat.sent_to(channel);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].content.as_deref(), Some("New Mod Uploads:"));
        assert_eq!(sent[0].units.len(), 5);
        assert_eq!(sent[1].units.len(), 2);
    }
}

#[tokio::test]
async fn second_cycle_sends_nothing() {
    let h = harness();
    h.db.add_subscription("skyrim", "C1").await.unwrap();
    h.source.set_mods("skyrim", vec![mod_record(1), updated_record(2)]);

    run(&h).await;
    let sent_after_first = h.chat.total_sent();
    assert_eq!(sent_after_first, 1);

    let report = run(&h).await;
    assert!(matches!(outcome(&report, "skyrim"), GameOutcome::NoNewMods));
    assert_eq!(h.chat.total_sent(), sent_after_first);
}

#[tokio::test]
async fn new_version_is_announced_again() {
    let h = harness();
    h.db.add_subscription("skyrim", "C1").await.unwrap();
    h.source.set_mods("skyrim", vec![mod_record(1)]);
    run(&h).await;

    h.source.set_mods("skyrim", vec![updated_record(1)]);
    run(&h).await;

    let sent = h.chat.sent_to("C1");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].content.as_deref(), Some("New Mod Update:"));
}

#[tokio::test]
async fn failing_game_does_not_block_the_next() {
    let h = harness();
    h.db.add_subscription("alpha", "C1").await.unwrap();
    h.db.add_subscription("beta", "C2").await.unwrap();
    h.source.fail_game("alpha");
    h.source.set_mods("alpha", vec![mod_record(1)]);
    h.source.set_mods("beta", vec![mod_record(2)]);

    let report = run(&h).await;

    match outcome(&report, "alpha") {
        GameOutcome::Failed(FeedError::SourceUnavailable { game, reason }) => {
            assert_eq!(game, "alpha");
            assert!(reason.contains("500"));
        }
        other => panic!("expected SourceUnavailable, got {other:?}"),
    }
    assert!(matches!(outcome(&report, "beta"), GameOutcome::Delivered(_)));
    assert!(h.chat.sent_to("C1").is_empty());
    assert_eq!(h.chat.sent_to("C2").len(), 1);

    // Nothing was recorded for the failed game, so it is picked up once
    // the upstream recovers
    h.source.failing_games.lock().unwrap().clear();
    run(&h).await;
    assert_eq!(h.chat.sent_to("C1").len(), 1);
}

#[tokio::test]
async fn games_are_reported_in_order() {
    let h = harness();
    for game in ["delta", "alpha", "charlie", "bravo"] {
        h.db.add_subscription(game, &format!("C-{game}")).await.unwrap();
    }
    let report = run(&h).await;
    let games: Vec<&str> = report.games.iter().map(|g| g.game.as_str()).collect();
    assert_eq!(games, vec!["alpha", "bravo", "charlie", "delta"]);
}

#[tokio::test]
async fn unresolvable_channel_is_skipped() {
    let h = harness();
    h.db.add_subscription("skyrim", "GONE").await.unwrap();
    h.db.add_subscription("skyrim", "LIVE").await.unwrap();
    h.chat.mark_missing("GONE");
    h.source.set_mods("skyrim", vec![mod_record(1)]);

    let report = run(&h).await;

    match outcome(&report, "skyrim") {
        GameOutcome::Delivered(d) => {
            assert_eq!(d.channels_skipped, 1);
            assert_eq!(d.channels_delivered, 1);
            assert!(d.channel_failures.is_empty());
        }
        other => panic!("expected Delivered, got {other:?}"),
    }
    assert_eq!(h.chat.sent_to("LIVE").len(), 1);
}

#[tokio::test]
async fn failing_channel_does_not_block_the_next() {
    let h = harness();
    h.db.add_subscription("skyrim", "A-BROKEN").await.unwrap();
    h.db.add_subscription("skyrim", "B-OK").await.unwrap();
    h.chat.mark_failing("A-BROKEN");
    h.source.set_mods("skyrim", vec![mod_record(1)]);

    let report = run(&h).await;

    match outcome(&report, "skyrim") {
        GameOutcome::Delivered(d) => {
            assert_eq!(d.channels_delivered, 1);
            assert_eq!(d.channel_failures.len(), 1);
            assert!(matches!(
                &d.channel_failures[0],
                FeedError::DeliveryFailure { channel_id, .. } if channel_id == "A-BROKEN"
            ));
        }
        other => panic!("expected Delivered, got {other:?}"),
    }
    assert_eq!(h.chat.sent_to("B-OK").len(), 1);
    assert_eq!(report.channel_failure_count(), 1);
}

#[tokio::test]
async fn game_without_presentable_mods_sends_nothing() {
    let h = harness();
    h.db.add_subscription("skyrim", "C1").await.unwrap();
    h.source.set_mods(
        "skyrim",
        vec![FetchedMod {
            name: None,
            ..mod_record(1)
        }],
    );

    let report = run(&h).await;
    match outcome(&report, "skyrim") {
        GameOutcome::Delivered(d) => {
            assert_eq!(d.new_mods, 1);
            assert_eq!(d.discarded, 1);
            assert_eq!(d.messages, 0);
        }
        other => panic!("expected Delivered, got {other:?}"),
    }
    assert_eq!(h.chat.total_sent(), 0);
}

#[tokio::test]
async fn cycle_records_last_sync_time() {
    let h = harness();
    assert!(h.db.get_scan_state(LAST_SYNC_KEY).await.unwrap().is_none());

    let report = run(&h).await;

    let stored = h.db.get_scan_state(LAST_SYNC_KEY).await.unwrap();
    assert_eq!(stored.as_deref(), Some(report.finished_at.as_str()));
    assert!(chrono::DateTime::parse_from_rfc3339(&report.finished_at).is_ok());
}

#[tokio::test]
async fn overlapping_cycle_is_skipped() {
    let h = harness_with(FakeSource {
        gate: Some(Notify::new()),
        ..FakeSource::default()
    });
    h.db.add_subscription("skyrim", "C1").await.unwrap();
    h.source.set_mods("skyrim", vec![mod_record(1)]);

    let first = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move { orchestrator.try_run_cycle().await })
    };

    // Wait until the first cycle holds the flag
    while !h.orchestrator.is_running() {
        tokio::task::yield_now().await;
    }
    assert!(h.orchestrator.try_run_cycle().await.is_none());

    if let Some(gate) = &h.source.gate {
        gate.notify_one();
    }
    let report = first.await.unwrap().unwrap().unwrap();
    assert_eq!(report.new_mod_count(), 1);

    // Flag is released once the first cycle finishes
    assert!(!h.orchestrator.is_running());
    assert!(h.orchestrator.try_run_cycle().await.is_some());
}

#[tokio::test]
async fn scheduler_stops_on_shutdown() {
    let h = harness();
    h.db.add_subscription("skyrim", "C1").await.unwrap();
    h.source.set_mods("skyrim", vec![mod_record(1)]);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let scheduler = tokio::spawn(h.orchestrator.clone().run(Duration::from_secs(3600), async {
        let _ = rx.await;
    }));

    // The first tick fires immediately
    for _ in 0..200 {
        if h.chat.total_sent() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(h.chat.total_sent(), 1);

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), scheduler)
        .await
        .expect("scheduler should stop")
        .unwrap();
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_cycle() {
    let h = harness_with(FakeSource {
        gate: Some(Notify::new()),
        ..FakeSource::default()
    });
    h.db.add_subscription("skyrim", "C1").await.unwrap();
    h.source.set_mods("skyrim", vec![mod_record(1)]);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let mut scheduler = tokio::spawn(h.orchestrator.clone().run(Duration::from_secs(3600), async {
        let _ = rx.await;
    }));

    // First tick starts a cycle that blocks on the gate
    while !h.orchestrator.is_running() {
        tokio::task::yield_now().await;
    }
    tx.send(()).unwrap();

    // The scheduler must not return while the cycle is still open
    assert!(
        tokio::time::timeout(Duration::from_millis(50), &mut scheduler)
            .await
            .is_err(),
        "run() returned with a cycle still in flight"
    );
    assert!(h.orchestrator.is_running());
    assert_eq!(h.chat.total_sent(), 0);

    if let Some(gate) = &h.source.gate {
        gate.notify_one();
    }
    tokio::time::timeout(Duration::from_secs(5), scheduler)
        .await
        .expect("scheduler should stop once the cycle finishes")
        .unwrap();

    assert!(!h.orchestrator.is_running());
    assert_eq!(h.chat.total_sent(), 1);
    assert_eq!(h.chat.sent_to("C1")[0].units.len(), 1);
}
