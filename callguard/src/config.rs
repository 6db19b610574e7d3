//! Configuration types and defaults

use callguard_core::CallGuardError;
use callguard_media::CaptureConstraints;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Watchdog timing, retry budget and capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Period of the health check
    pub tick_interval: Duration,
    /// Local idle time after which the camera counts as frozen
    pub local_freeze_threshold: Duration,
    /// Remote idle time after which the inbound feed counts as frozen
    pub remote_freeze_threshold: Duration,
    /// Reacquisition attempts before the local camera is given up
    pub max_retries: u32,
    /// Pause between releasing the old track and opening the device again
    pub settle_delay: Duration,
    /// Pause before retrying a failed reacquisition
    pub retry_backoff: Duration,
    /// Constraints used when reacquiring the camera
    pub capture: CaptureConstraints,
    /// Let the peer's "your camera froze" reports trigger local recovery
    pub honor_peer_reports: bool,
    /// Number of health transitions kept for diagnostics
    pub history_capacity: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1_000),
            local_freeze_threshold: Duration::from_millis(10_000),
            remote_freeze_threshold: Duration::from_millis(15_000),
            max_retries: 3,
            settle_delay: Duration::from_millis(1_000),
            retry_backoff: Duration::from_millis(2_000),
            capture: CaptureConstraints::default(),
            honor_peer_reports: true,
            history_capacity: 128,
        }
    }
}

impl WatchdogConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), CallGuardError> {
        if self.tick_interval.is_zero() {
            return Err(invalid("tick_interval", "must be greater than zero"));
        }

        if self.local_freeze_threshold < self.tick_interval {
            return Err(invalid(
                "local_freeze_threshold",
                "must be at least one tick interval",
            ));
        }

        if self.remote_freeze_threshold < self.tick_interval {
            return Err(invalid(
                "remote_freeze_threshold",
                "must be at least one tick interval",
            ));
        }

        if self.max_retries == 0 {
            return Err(invalid("max_retries", "must allow at least one attempt"));
        }

        self.capture
            .validate()
            .map_err(|e| invalid("capture", &e.to_string()))
    }
}

fn invalid(field: &str, reason: &str) -> CallGuardError {
    CallGuardError::InvalidConfiguration {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
