//! Interfaces consumed from the call transport layer.
//!
//! The peer connection and data channel are established elsewhere (offer/answer,
//! ICE, signaling rendezvous). The watchdog only needs the narrow surface below.

use crate::error::CallGuardError;
use crate::track::VideoTrack;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Peer connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerConnectionState {
    /// Created, negotiation not started
    New,
    /// ICE/DTLS in progress
    Connecting,
    /// Media flowing
    Connected,
    /// Connectivity lost, may come back
    Disconnected,
    /// Connectivity checks failed
    Failed,
    /// Closed by either side
    Closed,
}

impl PeerConnectionState {
    /// Whether an outbound track may be replaced right now
    pub fn is_connected(&self) -> bool {
        matches!(self, PeerConnectionState::Connected)
    }
}

impl fmt::Display for PeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeerConnectionState::New => "new",
            PeerConnectionState::Connecting => "connecting",
            PeerConnectionState::Connected => "connected",
            PeerConnectionState::Disconnected => "disconnected",
            PeerConnectionState::Failed => "failed",
            PeerConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Data channel ready state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChannelState {
    /// Not yet usable
    Connecting,
    /// Ready to send
    Open,
    /// Shutting down
    Closing,
    /// Closed
    Closed,
}

impl DataChannelState {
    /// Whether `send` may be called
    pub fn is_open(&self) -> bool {
        matches!(self, DataChannelState::Open)
    }
}

impl fmt::Display for DataChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataChannelState::Connecting => "connecting",
            DataChannelState::Open => "open",
            DataChannelState::Closing => "closing",
            DataChannelState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Callback invoked for every inbound data channel message
pub type MessageHandler = Box<dyn Fn(Bytes) + Send + Sync + 'static>;

/// The live peer connection carrying the call's media
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Current connection state
    fn connection_state(&self) -> PeerConnectionState;

    /// Swap the media source of the outbound video sender without renegotiating.
    /// Only valid while [`PeerConnectionState::Connected`].
    async fn replace_outbound_video_track(&self, track: &VideoTrack)
        -> Result<(), CallGuardError>;
}

/// Bidirectional message channel shared with the remote peer
pub trait DataChannel: Send + Sync {
    /// Current ready state
    fn state(&self) -> DataChannelState;

    /// Transmit one message
    fn send(&self, payload: Bytes) -> Result<(), CallGuardError>;

    /// Install the inbound message handler, replacing any previous one
    fn on_message(&self, handler: MessageHandler);
}
