//! In-memory transport doubles for tests, demos and headless hosts

use crate::error::CallGuardError;
use crate::track::VideoTrack;
use crate::transport::{
    DataChannel, DataChannelState, MessageHandler, PeerConnection, PeerConnectionState,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Peer connection stand-in that records outbound track replacements
#[derive(Debug)]
pub struct MockPeerConnection {
    state: RwLock<PeerConnectionState>,
    replaced: Mutex<Vec<String>>,
    fail_replacements: AtomicBool,
}

impl MockPeerConnection {
    /// Create a mock connection in the given state
    pub fn new(state: PeerConnectionState) -> Self {
        Self {
            state: RwLock::new(state),
            replaced: Mutex::new(Vec::new()),
            fail_replacements: AtomicBool::new(false),
        }
    }

    /// Create a mock connection that is already connected
    pub fn connected() -> Self {
        Self::new(PeerConnectionState::Connected)
    }

    /// Change the reported connection state
    pub fn set_state(&self, state: PeerConnectionState) {
        *self.state.write() = state;
    }

    /// Make subsequent replacements fail
    pub fn fail_replacements(&self, fail: bool) {
        self.fail_replacements.store(fail, Ordering::Release);
    }

    /// Ids of the tracks installed so far, in order
    pub fn replaced_tracks(&self) -> Vec<String> {
        self.replaced.lock().clone()
    }

    /// Number of successful replacements
    pub fn replace_count(&self) -> usize {
        self.replaced.lock().len()
    }
}

#[async_trait]
impl PeerConnection for MockPeerConnection {
    fn connection_state(&self) -> PeerConnectionState {
        *self.state.read()
    }

    async fn replace_outbound_video_track(
        &self,
        track: &VideoTrack,
    ) -> Result<(), CallGuardError> {
        let state = self.connection_state();
        if !state.is_connected() {
            return Err(CallGuardError::InvalidState {
                expected: PeerConnectionState::Connected.to_string(),
                actual: state.to_string(),
            });
        }
        if self.fail_replacements.load(Ordering::Acquire) {
            return Err(CallGuardError::TrackReplaceFailed {
                track_id: track.id().to_string(),
                reason: "sender rejected track".to_string(),
            });
        }
        self.replaced.lock().push(track.id().to_string());
        Ok(())
    }
}

type SharedHandler = Arc<dyn Fn(Bytes) + Send + Sync + 'static>;

/// Data channel endpoint delivering messages synchronously to its paired endpoint
pub struct LoopbackDataChannel {
    state: RwLock<DataChannelState>,
    handler: RwLock<Option<SharedHandler>>,
    peer: RwLock<Weak<LoopbackDataChannel>>,
    sent: Mutex<Vec<Bytes>>,
}

impl LoopbackDataChannel {
    /// Create a single endpoint with no peer; sends are only recorded
    pub fn detached(state: DataChannelState) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(state),
            handler: RwLock::new(None),
            peer: RwLock::new(Weak::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Create two open endpoints wired to each other
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let a = Self::detached(DataChannelState::Open);
        let b = Self::detached(DataChannelState::Open);
        *a.peer.write() = Arc::downgrade(&b);
        *b.peer.write() = Arc::downgrade(&a);
        (a, b)
    }

    /// Change the reported ready state
    pub fn set_state(&self, state: DataChannelState) {
        *self.state.write() = state;
    }

    /// Messages transmitted from this endpoint
    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().clone()
    }

    /// Deliver a message to this endpoint's handler as if the peer had sent it
    pub fn inject(&self, payload: Bytes) {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => handler(payload),
            None => debug!("Loopback message dropped: no handler installed"),
        }
    }
}

impl std::fmt::Debug for LoopbackDataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackDataChannel")
            .field("state", &*self.state.read())
            .field("sent", &self.sent.lock().len())
            .finish()
    }
}

impl DataChannel for LoopbackDataChannel {
    fn state(&self) -> DataChannelState {
        *self.state.read()
    }

    fn send(&self, payload: Bytes) -> Result<(), CallGuardError> {
        let state = self.state();
        if !state.is_open() {
            return Err(CallGuardError::DataChannelNotOpen {
                state: state.to_string(),
            });
        }
        self.sent.lock().push(payload.clone());

        let peer = self.peer.read().upgrade();
        if let Some(peer) = peer {
            if peer.state().is_open() {
                peer.inject(payload);
            }
        }
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.handler.write() = Some(Arc::from(handler));
    }
}
