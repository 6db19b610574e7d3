//! Two watchdogs talking over one loopback data channel

use callguard::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

struct Endpoint {
    watchdog: CameraWatchdog,
    gateway: Arc<MockCaptureGateway>,
    events: EventStream,
}

fn endpoint(origin: &str, channel: Arc<LoopbackDataChannel>, config: WatchdogConfig) -> Endpoint {
    let gateway = Arc::new(MockCaptureGateway::new());
    let watchdog = CameraWatchdog::builder(
        gateway.clone(),
        Arc::new(MockPeerConnection::connected()),
        channel,
    )
    .config(config)
    .origin_id(origin)
    .build()
    .unwrap();
    let events = watchdog.subscribe();
    Endpoint {
        watchdog,
        gateway,
        events,
    }
}

fn peer_statuses(events: Vec<WatchdogEvent>) -> Vec<(StatusKind, Subject)> {
    events
        .into_iter()
        .filter_map(|event| match event {
            WatchdogEvent::PeerStatus { envelope } => Some((envelope.kind, envelope.subject)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_remote_stall_report_makes_peer_recover() {
    let (a_end, b_end) = LoopbackDataChannel::pair();
    let mut a = endpoint("alice", a_end, WatchdogConfig::default());
    let mut b = endpoint("bob", b_end, WatchdogConfig::default());
    a.watchdog.start().unwrap();
    b.watchdog.start().unwrap();

    // everything flows except bob's video as seen by alice
    for _ in 0..4 {
        sleep(Duration::from_millis(4_000)).await;
        a.watchdog.on_activity(TrackSide::Local);
        b.watchdog.on_activity(TrackSide::Local);
        b.watchdog.on_activity(TrackSide::Remote);
    }
    sleep(Duration::from_millis(500)).await;

    assert_eq!(
        a.watchdog.status().remote_state,
        TrackHealthState::Frozen
    );
    assert_eq!(b.watchdog.status().phase, WatchdogPhase::Recovering);
    assert_eq!(
        peer_statuses(b.events.drain()),
        vec![(StatusKind::LocalProblem, Subject::Recipient)]
    );

    sleep(Duration::from_millis(1_000)).await;

    let status = b.watchdog.status();
    assert_eq!(status.local_state, TrackHealthState::Active);
    assert_eq!(status.retry_count, 0);
    assert_eq!(b.gateway.acquire_count(), 1);
    assert_eq!(a.gateway.acquire_count(), 0);
    assert_eq!(
        peer_statuses(a.events.drain()),
        vec![(StatusKind::LocalRecovered, Subject::Sender)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_peer_reports_can_be_disabled() {
    let (a_end, b_end) = LoopbackDataChannel::pair();
    let a = endpoint("alice", a_end, WatchdogConfig::default());
    let mut b = endpoint(
        "bob",
        b_end,
        WatchdogConfig {
            honor_peer_reports: false,
            ..WatchdogConfig::default()
        },
    );
    a.watchdog.start().unwrap();
    b.watchdog.start().unwrap();

    a.watchdog.on_track_error(TrackSide::Remote, "decoder stalled");

    assert_eq!(b.watchdog.status().phase, WatchdogPhase::Monitoring);
    assert_eq!(b.watchdog.status().local_state, TrackHealthState::Active);
    assert_eq!(
        peer_statuses(b.events.drain()),
        vec![(StatusKind::LocalProblem, Subject::Recipient)]
    );
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(b.gateway.acquire_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_self_reported_failure_is_informational() {
    let (a_end, b_end) = LoopbackDataChannel::pair();
    let mut a = endpoint("alice", a_end, WatchdogConfig::default());
    let b = endpoint("bob", b_end, WatchdogConfig::default());
    a.watchdog.start().unwrap();
    b.watchdog.start().unwrap();
    b.gateway.fail_next(1, "camera in use");

    b.watchdog.on_track_error(TrackSide::Local, "capture stopped");
    sleep(Duration::from_millis(1_500)).await;

    assert_eq!(b.watchdog.status().local_state, TrackHealthState::Erred);
    assert_eq!(
        peer_statuses(a.events.drain()),
        vec![(StatusKind::LocalProblem, Subject::Sender)]
    );
    assert_eq!(a.watchdog.status().phase, WatchdogPhase::Monitoring);
    assert_eq!(a.gateway.acquire_count(), 0);
}
