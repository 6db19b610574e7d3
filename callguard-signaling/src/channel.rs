//! Best-effort health notifications over the call's data channel

use crate::protocol::{StatusEnvelope, StatusKind, Subject};
use bytes::Bytes;
use callguard_core::{CallGuardError, DataChannel, DataChannelState};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// What happened to an outbound notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the data channel
    Sent,
    /// Not transmitted because the channel was not open
    Dropped {
        /// Channel state at the time of the attempt
        state: DataChannelState,
    },
}

/// How this endpoint should react to an inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum PeerReaction {
    /// Not a status envelope, or one we sent ourselves
    Ignored,
    /// Status worth surfacing, no local action
    Informational(StatusEnvelope),
    /// The peer says our outbound camera is broken
    RecoverLocal(StatusEnvelope),
}

/// Classifies inbound envelopes for one endpoint
#[derive(Debug, Clone)]
struct InboundRouter {
    origin_id: String,
    honor_peer_reports: bool,
}

impl InboundRouter {
    fn route(&self, payload: &[u8]) -> PeerReaction {
        match StatusEnvelope::from_slice(payload) {
            Ok(envelope) => self.classify(envelope),
            Err(e) => {
                debug!("Ignoring non-status data channel message: {}", e);
                PeerReaction::Ignored
            }
        }
    }

    fn classify(&self, envelope: StatusEnvelope) -> PeerReaction {
        if envelope.origin_id == self.origin_id {
            debug!("Ignoring status envelope echoed from our own origin");
            return PeerReaction::Ignored;
        }

        match (envelope.kind.is_fault(), envelope.subject) {
            (true, Subject::Recipient) if self.honor_peer_reports => {
                info!(
                    "📨 Peer {} reports our camera as {:?}",
                    envelope.origin_id, envelope.kind
                );
                PeerReaction::RecoverLocal(envelope)
            }
            _ => {
                info!(
                    "📨 Peer {} status: {:?} ({:?})",
                    envelope.origin_id, envelope.kind, envelope.subject
                );
                PeerReaction::Informational(envelope)
            }
        }
    }
}

/// Sends and receives [`StatusEnvelope`]s over an already-established data channel
#[derive(Clone)]
pub struct PeerNotificationChannel {
    channel: Arc<dyn DataChannel>,
    router: InboundRouter,
}

impl PeerNotificationChannel {
    /// Create a channel for the endpoint identified by `origin_id`
    pub fn new(channel: Arc<dyn DataChannel>, origin_id: impl Into<String>) -> Self {
        Self {
            channel,
            router: InboundRouter {
                origin_id: origin_id.into(),
                honor_peer_reports: true,
            },
        }
    }

    /// Whether peer reports about our camera may trigger local recovery
    pub fn with_peer_reports(mut self, honor: bool) -> Self {
        self.router.honor_peer_reports = honor;
        self
    }

    /// This endpoint's origin id
    pub fn origin_id(&self) -> &str {
        &self.router.origin_id
    }

    /// Current state of the underlying data channel
    pub fn channel_state(&self) -> DataChannelState {
        self.channel.state()
    }

    /// Build and transmit an envelope. A channel that is not open drops the
    /// notification without error.
    pub fn send(&self, kind: StatusKind, subject: Subject) -> Result<SendOutcome, CallGuardError> {
        let envelope = StatusEnvelope::new(kind, self.router.origin_id.clone(), subject);
        self.send_envelope(&envelope)
    }

    /// Transmit a prepared envelope
    pub fn send_envelope(&self, envelope: &StatusEnvelope) -> Result<SendOutcome, CallGuardError> {
        let state = self.channel.state();
        if !state.is_open() {
            debug!(
                "Dropping {:?} notification: data channel {}",
                envelope.kind, state
            );
            return Ok(SendOutcome::Dropped { state });
        }

        let payload = envelope.to_bytes()?;
        match self.channel.send(payload) {
            Ok(()) => {
                debug!("📤 Sent {:?} notification", envelope.kind);
                Ok(SendOutcome::Sent)
            }
            Err(CallGuardError::DataChannelNotOpen { .. }) => {
                let state = self.channel.state();
                debug!(
                    "Dropping {:?} notification: data channel closed mid-send",
                    envelope.kind
                );
                Ok(SendOutcome::Dropped { state })
            }
            Err(e) => Err(e),
        }
    }

    /// Classify one inbound payload. Malformed payloads are ignored.
    pub fn on_receive(&self, payload: &[u8]) -> PeerReaction {
        self.router.route(payload)
    }

    /// Route every inbound data channel message through `handler`.
    /// Payloads that classify as [`PeerReaction::Ignored`] are not forwarded.
    pub fn listen<F>(&self, handler: F)
    where
        F: Fn(PeerReaction) + Send + Sync + 'static,
    {
        let router = self.router.clone();
        self.channel.on_message(Box::new(move |payload: Bytes| {
            match router.route(&payload) {
                PeerReaction::Ignored => {}
                reaction => handler(reaction),
            }
        }));
    }
}

impl fmt::Debug for PeerNotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerNotificationChannel")
            .field("origin_id", &self.router.origin_id)
            .field("honor_peer_reports", &self.router.honor_peer_reports)
            .field("channel_state", &self.channel.state())
            .finish()
    }
}
