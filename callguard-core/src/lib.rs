//! # CallGuard Core
//!
//! Core types shared by every CallGuard crate: the error taxonomy, the video
//! track handle, per-side health states, and the interfaces consumed from the
//! call transport layer (peer connection and data channel).

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod health;
pub mod mock;
pub mod track;
pub mod transport;

// Re-export main types
pub use error::{CallGuardError, RecoveryError};
pub use health::{TrackHealthState, TrackSide};
pub use mock::{LoopbackDataChannel, MockPeerConnection};
pub use track::{TrackEvent, VideoTrack};
pub use transport::{
    DataChannel, DataChannelState, MessageHandler, PeerConnection, PeerConnectionState,
};
