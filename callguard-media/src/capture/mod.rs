//! Local camera acquisition interface

pub mod mock;

use crate::error::{MediaError, MediaResult};
use async_trait::async_trait;
use callguard_core::VideoTrack;
use serde::{Deserialize, Serialize};

/// Camera facing hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Front camera, facing the user
    User,
    /// Rear camera
    Environment,
}

/// Video resolution information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
}

impl VideoResolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const HD: Self = Self::new(1280, 720);
    pub const VGA: Self = Self::new(640, 480);
}

/// Constraints passed to the platform acquisition call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    /// Which camera to prefer
    pub facing: FacingMode,
    /// Resolution the device should try to deliver
    pub ideal_resolution: VideoResolution,
    /// Frame rate the device should try to deliver
    pub ideal_framerate: Option<f64>,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            ideal_resolution: VideoResolution::HD,
            ideal_framerate: None,
        }
    }
}

impl CaptureConstraints {
    /// Validate constraints
    pub fn validate(&self) -> MediaResult<()> {
        if self.ideal_resolution.width == 0 || self.ideal_resolution.height == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Invalid resolution".to_string(),
            });
        }

        if let Some(framerate) = self.ideal_framerate {
            if framerate <= 0.0 || framerate > 120.0 {
                return Err(MediaError::InvalidConfiguration {
                    message: "Invalid framerate".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Thin wrapper over the platform's capture-device acquisition call
#[async_trait]
pub trait MediaCaptureGateway: Send + Sync {
    /// Open the camera and return a live track
    async fn acquire_local_video_track(
        &self,
        constraints: &CaptureConstraints,
    ) -> MediaResult<VideoTrack>;

    /// Stop the track and give the device back. Must be idempotent.
    fn release_track(&self, track: &VideoTrack);
}

/// Surface that renders the local camera preview
pub trait PreviewSink: Send + Sync {
    fn attach(&self, track: &VideoTrack);
}

/// Preview sink for headless sessions
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPreview;

impl PreviewSink for NullPreview {
    fn attach(&self, track: &VideoTrack) {
        tracing::trace!("No preview surface for track {}", track.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints() {
        let constraints = CaptureConstraints::default();
        assert_eq!(constraints.facing, FacingMode::User);
        assert_eq!(constraints.ideal_resolution, VideoResolution::HD);
        assert!(constraints.validate().is_ok());
    }

    #[test]
    fn test_invalid_constraints() {
        let constraints = CaptureConstraints {
            ideal_resolution: VideoResolution::new(0, 720),
            ..CaptureConstraints::default()
        };
        assert!(constraints.validate().is_err());

        let constraints = CaptureConstraints {
            ideal_framerate: Some(240.0),
            ..CaptureConstraints::default()
        };
        assert!(constraints.validate().is_err());
    }
}
