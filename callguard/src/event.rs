//! Event system for watchdog state changes

use callguard_core::{PeerConnectionState, RecoveryError, TrackHealthState, TrackSide};
use callguard_signaling::StatusEnvelope;
use tokio::sync::broadcast;

/// Events a call UI can subscribe to for status display
#[derive(Debug, Clone, PartialEq)]
pub enum WatchdogEvent {
    /// Monitoring began
    Started,
    /// Monitoring ended
    Stopped,
    /// Session re-seeded with fresh timestamps and retry budget
    Restarted,
    /// A track changed health state
    StateChanged {
        /// Track side
        side: TrackSide,
        /// Previous state
        from: TrackHealthState,
        /// New state
        to: TrackHealthState,
    },
    /// A local camera recovery attempt began
    RecoveryStarted {
        /// Attempt number (1-based)
        attempt: u32,
        /// Why recovery was triggered
        reason: String,
    },
    /// The local camera was reacquired
    RecoverySucceeded {
        /// Attempt number (1-based)
        attempt: u32,
        /// Id of the new local track
        track_id: String,
    },
    /// A recovery attempt did not succeed
    RecoveryFailed {
        /// Attempt number (1-based), 0 when rejected before starting
        attempt: u32,
        /// Failure detail
        error: RecoveryError,
    },
    /// The new track was not hot-swapped because the connection was not up
    TrackReplaceSkipped {
        /// Connection state at the time
        state: PeerConnectionState,
    },
    /// The peer sent a camera status envelope
    PeerStatus {
        /// Received envelope
        envelope: StatusEnvelope,
    },
}

impl WatchdogEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            WatchdogEvent::Started => "started",
            WatchdogEvent::Stopped => "stopped",
            WatchdogEvent::Restarted => "restarted",
            WatchdogEvent::StateChanged { .. } => "state_changed",
            WatchdogEvent::RecoveryStarted { .. } => "recovery_started",
            WatchdogEvent::RecoverySucceeded { .. } => "recovery_succeeded",
            WatchdogEvent::RecoveryFailed { .. } => "recovery_failed",
            WatchdogEvent::TrackReplaceSkipped { .. } => "track_replace_skipped",
            WatchdogEvent::PeerStatus { .. } => "peer_status",
        }
    }

    /// Check if this is a recovery-related event
    pub fn is_recovery_event(&self) -> bool {
        matches!(
            self,
            WatchdogEvent::RecoveryStarted { .. }
                | WatchdogEvent::RecoverySucceeded { .. }
                | WatchdogEvent::RecoveryFailed { .. }
                | WatchdogEvent::TrackReplaceSkipped { .. }
        )
    }
}

/// Stream of watchdog events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<WatchdogEvent>,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<WatchdogEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next event, skipping over any the subscriber lagged behind on
    pub async fn next(&mut self) -> Option<WatchdogEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Event stream lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Option<WatchdogEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Drain every event currently buffered
    pub fn drain(&mut self) -> Vec<WatchdogEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
