//! # CallGuard - Camera Watchdog for Peer-to-Peer Video Calls
//!
//! CallGuard watches both video tracks of a two-party call. When the local
//! camera stops producing frames it releases the device, opens it again and
//! hot-swaps the new track into the live connection without renegotiating.
//! When the peer's video stalls it tells the peer over the call's data channel.
//!
//! ## Key Features
//!
//! - **Freeze detection**: per-side idle thresholds checked on a fixed tick
//! - **Bounded recovery**: a few reacquisition attempts, then graceful give-up
//! - **Peer signaling**: small JSON status envelopes on an existing data channel
//! - **Transport agnostic**: the peer connection and capture device are traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use callguard::{
//!     CameraWatchdog, LoopbackDataChannel, MockCaptureGateway, MockPeerConnection, TrackSide,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (channel, _remote_end) = LoopbackDataChannel::pair();
//!     let watchdog = CameraWatchdog::builder(
//!         Arc::new(MockCaptureGateway::new()),
//!         Arc::new(MockPeerConnection::connected()),
//!         channel,
//!     )
//!     .build()?;
//!
//!     watchdog.start()?;
//!     watchdog.on_activity(TrackSide::Local);
//!
//!     let mut events = watchdog.subscribe();
//!     while let Some(event) = events.next().await {
//!         println!("Watchdog event: {:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use callguard_core::{
    CallGuardError, DataChannel, DataChannelState, LoopbackDataChannel, MessageHandler,
    MockPeerConnection, PeerConnection, PeerConnectionState, RecoveryError, TrackEvent,
    TrackHealthState, TrackSide, VideoTrack,
};

pub use callguard_media::{
    AcquireOutcome, CaptureConstraints, FacingMode, MediaCaptureGateway, MediaError,
    MockCaptureGateway, NullPreview, PreviewSink, VideoResolution,
};

pub use callguard_signaling::{
    PeerNotificationChannel, PeerReaction, SendOutcome, StatusEnvelope, StatusKind, Subject,
};

pub use callguard_diagnostics::{DebugLogger, TransitionLog, TransitionRecord};

// Public API modules
pub mod config;
pub mod event;
pub mod health;
pub mod recovery;
pub mod watchdog;

// Re-export main API types
pub use config::WatchdogConfig;
pub use event::{EventStream, WatchdogEvent};
pub use health::{HealthAction, HealthTracker, TickOutcome, TrackSignals, Transition};
pub use recovery::{LocalRecoveryController, RecoveryReason};
pub use watchdog::{CameraWatchdog, WatchdogBuilder, WatchdogPhase, WatchdogStatus};
