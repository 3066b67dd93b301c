//! Countdown, forced transitions and announcements driven by the worker.

mod common;

use std::time::Duration;

use common::{Fixture, config, global, personal};
use market_core::{Announcement, CatalogEntry, MarketConfig, Phase, StockMode};
use runtime::{BroadcastKind, CloseEvent, Event, LifecycleEvent, OpenEvent, Topic};
use tokio::time::{sleep, timeout};

fn entries() -> Vec<CatalogEntry> {
    vec![global("crown", 3, 10.0), personal("apple", 5, 1.0)]
}

/// Ten-second phases ticking once per second.
fn short_cycle() -> MarketConfig {
    let mut config = config(&[10, 11], 1, StockMode::Global);
    config.schedule.open_duration = 10;
    config.schedule.close_duration = 10;
    config
}

fn announcement(seconds_before: u64, line: &str) -> Announcement {
    Announcement {
        seconds_before,
        lines: vec![line.to_string()],
    }
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_opens_the_market() {
    let fixture = Fixture::new();
    let runtime = fixture.start(short_cycle(), entries()).await;
    let handle = runtime.handle();
    let mut lifecycle = handle.subscribe(Topic::Lifecycle);
    let mut broadcasts = handle.subscribe(Topic::Broadcast);

    let event = timeout(Duration::from_secs(15), lifecycle.recv())
        .await
        .expect("open event before timeout")
        .expect("channel open");
    assert_eq!(
        event,
        Event::Lifecycle(LifecycleEvent::Opened(OpenEvent { forced: false }))
    );

    assert!(handle.is_open());
    assert_eq!(handle.time_remaining(), 10);

    let Event::Broadcast(broadcast) = broadcasts.recv().await.expect("opened broadcast") else {
        panic!("expected a broadcast event");
    };
    assert_eq!(broadcast.kind, BroadcastKind::Opened);
    assert_eq!(broadcast.lines, short_cycle().broadcasts.opened);

    runtime.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn forced_transitions_publish_forced_events() {
    let fixture = Fixture::new();
    let runtime = fixture.start(short_cycle(), entries()).await;
    let handle = runtime.handle();
    let mut lifecycle = handle.subscribe(Topic::Lifecycle);
    let mut broadcasts = handle.subscribe(Topic::Broadcast);

    let state = handle.force_open().await.expect("force open");
    assert_eq!(state.phase, Phase::Open);
    assert_eq!(state.seconds_remaining, 10);

    let state = handle.force_close().await.expect("force close");
    assert_eq!(state.phase, Phase::Closed);

    assert_eq!(
        lifecycle.recv().await.expect("opened"),
        Event::Lifecycle(LifecycleEvent::Opened(OpenEvent { forced: true }))
    );
    assert_eq!(
        lifecycle.recv().await.expect("closed"),
        Event::Lifecycle(LifecycleEvent::Closed(CloseEvent { forced: true }))
    );

    let kinds: Vec<BroadcastKind> = [
        broadcasts.recv().await.expect("first broadcast"),
        broadcasts.recv().await.expect("second broadcast"),
    ]
    .into_iter()
    .filter_map(|event| match event {
        Event::Broadcast(broadcast) => Some(broadcast.kind),
        _ => None,
    })
    .collect();
    assert_eq!(
        kinds,
        vec![BroadcastKind::ForceOpened, BroadcastKind::ForceClosed]
    );

    runtime.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn forcing_a_phase_restarts_the_countdown() {
    let fixture = Fixture::new();
    let runtime = fixture.start(short_cycle(), entries()).await;
    let handle = runtime.handle();

    sleep(Duration::from_millis(5_500)).await;
    assert!(!handle.is_open());
    assert_eq!(handle.time_remaining(), 5);

    handle.force_open().await.expect("force open");
    assert_eq!(handle.time_remaining(), 10);

    sleep(Duration::from_millis(9_500)).await;
    assert!(handle.is_open());
    assert_eq!(handle.time_remaining(), 1);

    sleep(Duration::from_secs(1)).await;
    assert!(!handle.is_open());
    assert_eq!(handle.time_remaining(), 10);

    runtime.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn announcements_follow_the_current_phase() {
    let mut config = short_cycle();
    config.announcements.before_open = vec![announcement(5, "opening soon")];
    config.announcements.before_close = vec![
        announcement(5, "closing soon"),
        announcement(3, "last call"),
    ];

    let fixture = Fixture::new();
    let runtime = fixture.start(config, entries()).await;
    let handle = runtime.handle();

    assert_eq!(handle.pending_announcements().await.expect("count"), 1);

    handle.force_open().await.expect("force open");
    assert_eq!(handle.pending_announcements().await.expect("count"), 2);

    handle.force_close().await.expect("force close");
    assert_eq!(handle.pending_announcements().await.expect("count"), 1);

    runtime.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn announcement_fires_ahead_of_the_transition() {
    let mut config = short_cycle();
    config.announcements.before_open = vec![
        announcement(3, "three seconds to open"),
        announcement(60, "longer than the countdown"),
    ];

    let fixture = Fixture::new();
    let runtime = fixture.start(config, entries()).await;
    let handle = runtime.handle();
    let mut broadcasts = handle.subscribe(Topic::Broadcast);

    assert_eq!(handle.pending_announcements().await.expect("count"), 1);

    let event = timeout(Duration::from_millis(7_500), broadcasts.recv())
        .await
        .expect("announcement before the market opens")
        .expect("channel open");
    let Event::Broadcast(broadcast) = event else {
        panic!("expected a broadcast event");
    };
    assert_eq!(broadcast.kind, BroadcastKind::Announcement);
    assert_eq!(broadcast.lines, vec!["three seconds to open".to_string()]);
    assert!(!handle.is_open());

    runtime.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn countdown_is_saved_periodically_and_on_shutdown() {
    let mut config = short_cycle();
    config.persist_interval_ticks = 2;

    let fixture = Fixture::new();
    let runtime = fixture.start(config, entries()).await;
    assert_eq!(fixture.repository.save_count(), 1);

    sleep(Duration::from_millis(4_500)).await;
    assert_eq!(runtime.handle().time_remaining(), 6);
    // Saved at 8 and 6 seconds remaining.
    assert_eq!(fixture.repository.save_count(), 3);

    sleep(Duration::from_secs(1)).await;
    runtime.shutdown().await.expect("clean shutdown");

    assert_eq!(fixture.repository.save_count(), 4);
    let stored = fixture
        .repository
        .current()
        .expect("repository readable")
        .expect("state saved");
    assert_eq!(stored.phase, Phase::Closed);
    assert_eq!(stored.seconds_remaining, 5);
}

#[tokio::test(start_paused = true)]
async fn handle_reports_closed_channel_after_shutdown() {
    let fixture = Fixture::new();
    let runtime = fixture.start(short_cycle(), entries()).await;
    let handle = runtime.handle();

    runtime.shutdown().await.expect("clean shutdown");

    assert!(handle.force_open().await.is_err());
    assert!(!handle.is_open(), "reads still work against the last state");
}
