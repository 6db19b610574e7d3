//! Video track handle shared by the capture and transport layers

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

const TRACK_EVENT_CAPACITY: usize = 64;

/// Signals emitted by a track while it is live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    /// A frame (or playback progress) was observed
    Frame,
    /// The track ended and will produce no more frames
    Ended,
    /// The underlying source reported a failure
    Error {
        /// Failure description from the source
        cause: String,
    },
}

/// Cloneable handle to a single video track.
///
/// Clones share the ended flag and the event broadcast, so the capture layer,
/// the peer connection and the watchdog observers all see the same lifecycle.
#[derive(Clone)]
pub struct VideoTrack {
    inner: Arc<TrackInner>,
}

struct TrackInner {
    id: String,
    label: String,
    ended: AtomicBool,
    events: broadcast::Sender<TrackEvent>,
}

impl VideoTrack {
    /// Create a new live track with a random id
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), label)
    }

    /// Create a new live track with a fixed id
    pub fn with_id(id: impl Into<String>, label: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(TRACK_EVENT_CAPACITY);
        Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                label: label.into(),
                ended: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Get track ID
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Get device label
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Whether the track has ended
    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// Stop the track. Idempotent; `Ended` is broadcast once.
    pub fn stop(&self) {
        if !self.inner.ended.swap(true, Ordering::AcqRel) {
            debug!("⏹️ Video track {} ended", self.inner.id);
            let _ = self.inner.events.send(TrackEvent::Ended);
        }
    }

    /// Report a frame. Ignored once the track has ended.
    pub fn notify_frame(&self) {
        if !self.is_ended() {
            let _ = self.inner.events.send(TrackEvent::Frame);
        }
    }

    /// Report a source failure
    pub fn notify_error(&self, cause: impl Into<String>) {
        let _ = self.inner.events.send(TrackEvent::Error {
            cause: cause.into(),
        });
    }

    /// Subscribe to this track's events
    pub fn subscribe(&self) -> broadcast::Receiver<TrackEvent> {
        self.inner.events.subscribe()
    }

    /// Whether two handles refer to the same underlying track
    pub fn same_track(&self, other: &VideoTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for VideoTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoTrack")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("ended", &self.is_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_idempotent() {
        let track = VideoTrack::with_id("cam-1", "Front Camera");
        let mut events = track.subscribe();

        track.stop();
        track.stop();

        assert!(track.is_ended());
        assert_eq!(events.try_recv().unwrap(), TrackEvent::Ended);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_frames_after_end_are_dropped() {
        let track = VideoTrack::new("Front Camera");
        let mut events = track.subscribe();

        track.notify_frame();
        track.stop();
        track.notify_frame();

        assert_eq!(events.try_recv().unwrap(), TrackEvent::Frame);
        assert_eq!(events.try_recv().unwrap(), TrackEvent::Ended);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_clones_share_lifecycle() {
        let track = VideoTrack::new("Front Camera");
        let clone = track.clone();
        clone.stop();

        assert!(track.is_ended());
        assert!(track.same_track(&clone));
        assert!(!track.same_track(&VideoTrack::new("Front Camera")));
    }
}
