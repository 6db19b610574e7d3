//! Camera Watchdog Demo
//!
//! Two endpoints share an in-memory data channel. Alice's camera stalls and
//! is reacquired; then Bob's video stops reaching Alice and she tells him, so
//! Bob repairs his own camera. Timings are shortened so the demo runs in a few
//! seconds.
//!
//! Run with `RUST_LOG=callguard=debug` for the full trace.

use anyhow::Context;
use callguard::{
    CameraWatchdog, DebugLogger, LoopbackDataChannel, MockCaptureGateway, MockPeerConnection,
    TrackSide, WatchdogConfig, WatchdogEvent,
};
use std::sync::Arc;
use std::time::Duration;

fn demo_config() -> WatchdogConfig {
    WatchdogConfig {
        tick_interval: Duration::from_millis(100),
        local_freeze_threshold: Duration::from_millis(1_000),
        remote_freeze_threshold: Duration::from_millis(1_500),
        settle_delay: Duration::from_millis(100),
        retry_backoff: Duration::from_millis(200),
        ..WatchdogConfig::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    DebugLogger::init_logging().context("installing log subscriber")?;

    println!("🚀 Camera Watchdog Demo");
    println!("=======================");

    let (alice_end, bob_end) = LoopbackDataChannel::pair();
    let alice_camera = Arc::new(MockCaptureGateway::new());
    let bob_camera = Arc::new(MockCaptureGateway::new());

    let alice = CameraWatchdog::builder(
        alice_camera.clone(),
        Arc::new(MockPeerConnection::connected()),
        alice_end,
    )
    .config(demo_config())
    .origin_id("alice")
    .build()?;

    let bob = CameraWatchdog::builder(
        bob_camera.clone(),
        Arc::new(MockPeerConnection::connected()),
        bob_end,
    )
    .config(demo_config())
    .origin_id("bob")
    .build()?;

    let mut alice_events = alice.subscribe();
    tokio::spawn(async move {
        while let Some(event) = alice_events.next().await {
            match event {
                WatchdogEvent::StateChanged { side, from, to } => {
                    println!("   alice: {} {} -> {}", side, from, to)
                }
                WatchdogEvent::PeerStatus { envelope } => {
                    println!("   alice: peer says {:?}", envelope.kind)
                }
                other if other.is_recovery_event() => {
                    println!("   alice: 🔧 {}", other.event_type())
                }
                other => println!("   alice: {}", other.event_type()),
            }
        }
    });

    alice.start()?;
    bob.start()?;

    // ============================================================================
    // Part 1: Alice's camera stalls
    // ============================================================================
    println!("\n📋 Part 1: Alice's camera stops delivering frames");
    alice_camera.fail_next(1, "device still held by previous session");
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        alice.on_activity(TrackSide::Remote);
        bob.on_activity(TrackSide::Local);
        bob.on_activity(TrackSide::Remote);
    }
    println!("✅ Alice after recovery: {:?}", alice.status());
    println!("   acquisitions: {}", alice_camera.acquire_count());

    // ============================================================================
    // Part 2: Bob's video stops reaching Alice
    // ============================================================================
    println!("\n📋 Part 2: Alice stops receiving Bob's video");
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        alice.on_activity(TrackSide::Local);
        bob.on_activity(TrackSide::Local);
        bob.on_activity(TrackSide::Remote);
    }
    println!("✅ Bob after peer report: {:?}", bob.status());
    println!("   acquisitions: {}", bob_camera.acquire_count());

    println!("\n📜 Alice transition history:");
    for record in alice.history() {
        println!(
            "   {} {} {} -> {} ({})",
            record.at, record.side, record.from, record.to, record.reason
        );
    }

    alice.stop();
    bob.stop();
    println!("\n👋 Demo complete");
    Ok(())
}
