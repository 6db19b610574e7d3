//! Scripted capture backend for tests and devices without a camera

use super::{CaptureConstraints, MediaCaptureGateway};
use crate::error::{MediaError, MediaResult};
use async_trait::async_trait;
use callguard_core::VideoTrack;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

/// Result of one scripted acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Hand out a fresh live track
    Succeed,
    /// Hand out a track once `delay` has passed, like a slow device or a
    /// pending permission prompt
    SucceedAfter { delay: Duration },
    /// Fail with [`MediaError::DeviceUnavailable`]
    Fail { reason: String },
    /// Fail with [`MediaError::PermissionDenied`]
    Deny,
}

/// Capture gateway whose acquisitions follow a script.
///
/// Once the script is exhausted every acquisition succeeds.
#[derive(Debug)]
pub struct MockCaptureGateway {
    label: String,
    script: Mutex<VecDeque<AcquireOutcome>>,
    acquired: Mutex<Vec<VideoTrack>>,
    released: Mutex<Vec<String>>,
    calls: Mutex<usize>,
    last_constraints: Mutex<Option<CaptureConstraints>>,
}

impl MockCaptureGateway {
    pub fn new() -> Self {
        Self {
            label: "Mock Camera".to_string(),
            script: Mutex::new(VecDeque::new()),
            acquired: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
            last_constraints: Mutex::new(None),
        }
    }

    /// Queue an outcome for a future acquisition
    pub fn push_outcome(&self, outcome: AcquireOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Make the next `count` acquisitions fail
    pub fn fail_next(&self, count: usize, reason: &str) {
        let mut script = self.script.lock();
        for _ in 0..count {
            script.push_back(AcquireOutcome::Fail {
                reason: reason.to_string(),
            });
        }
    }

    /// Acquisition calls made so far, including ones still in flight
    pub fn acquire_count(&self) -> usize {
        *self.calls.lock()
    }

    /// Tracks handed out so far
    pub fn acquired_tracks(&self) -> Vec<VideoTrack> {
        self.acquired.lock().clone()
    }

    /// Ids of released tracks, without duplicates
    pub fn released_tracks(&self) -> Vec<String> {
        self.released.lock().clone()
    }

    /// Constraints seen by the most recent acquisition
    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.last_constraints.lock().clone()
    }

    fn hand_out(&self, constraints: &CaptureConstraints) -> VideoTrack {
        let track = VideoTrack::new(self.label.clone());
        info!(
            "📹 Mock camera acquired: {} ({}x{})",
            track.id(),
            constraints.ideal_resolution.width,
            constraints.ideal_resolution.height
        );
        self.acquired.lock().push(track.clone());
        track
    }
}

impl Default for MockCaptureGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaCaptureGateway for MockCaptureGateway {
    async fn acquire_local_video_track(
        &self,
        constraints: &CaptureConstraints,
    ) -> MediaResult<VideoTrack> {
        constraints.validate()?;
        *self.last_constraints.lock() = Some(constraints.clone());
        *self.calls.lock() += 1;

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(AcquireOutcome::Succeed);

        match outcome {
            AcquireOutcome::Succeed => Ok(self.hand_out(constraints)),
            AcquireOutcome::SucceedAfter { delay } => {
                debug!("Mock camera answering in {:?}", delay);
                tokio::time::sleep(delay).await;
                Ok(self.hand_out(constraints))
            }
            AcquireOutcome::Fail { reason } => {
                debug!("Mock camera acquisition failed: {}", reason);
                Err(MediaError::DeviceUnavailable { reason })
            }
            AcquireOutcome::Deny => {
                debug!("Mock camera access denied");
                Err(MediaError::PermissionDenied {
                    operation: "camera".to_string(),
                })
            }
        }
    }

    fn release_track(&self, track: &VideoTrack) {
        track.stop();
        let mut released = self.released.lock();
        if !released.iter().any(|id| id == track.id()) {
            released.push(track.id().to_string());
        }
    }
}
