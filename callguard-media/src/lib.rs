//! # CallGuard Media
//!
//! Capture-device acquisition for the local camera track. The platform's
//! acquisition call sits behind [`MediaCaptureGateway`] so the watchdog can
//! stop, reacquire and rebind the camera without knowing the backend.

#![warn(clippy::all)]

pub mod capture;
pub mod error;

// Re-export main types
pub use capture::mock::{AcquireOutcome, MockCaptureGateway};
pub use capture::{
    CaptureConstraints, FacingMode, MediaCaptureGateway, NullPreview, PreviewSink,
    VideoResolution,
};
pub use error::{ErrorCategory, MediaError, MediaResult};
