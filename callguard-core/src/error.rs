//! Error types for CallGuard

use thiserror::Error;

/// Main error type for CallGuard operations
#[derive(Error, Debug)]
pub enum CallGuardError {
    /// Configuration value rejected by validation
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration {
        /// Offending configuration field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Operation attempted in the wrong lifecycle phase
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Data channel is not ready for sending
    #[error("Data channel not open (state: {state})")]
    DataChannelNotOpen {
        /// Observed channel state
        state: String,
    },

    /// Outbound track replacement rejected by the peer connection
    #[error("Failed to replace outbound track {track_id}: {reason}")]
    TrackReplaceFailed {
        /// Track that could not be installed
        track_id: String,
        /// Reason for the failure
        reason: String,
    },

    /// Status envelope could not be encoded
    #[error("Serialization failed: {reason}")]
    Serialization {
        /// Reason for the failure
        reason: String,
    },

    /// Invalid message format
    #[error("Invalid message format: {message}, error: {source}")]
    InvalidMessage {
        /// Invalid message content
        message: String,
        /// Parsing error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No async runtime is available to drive timers
    #[error("No async runtime available: {reason}")]
    RuntimeUnavailable {
        /// Reason reported by the runtime lookup
        reason: String,
    },
}

impl CallGuardError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            CallGuardError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION".to_string(),
            CallGuardError::InvalidState { .. } => "INVALID_STATE".to_string(),
            CallGuardError::DataChannelNotOpen { .. } => "DATA_CHANNEL_NOT_OPEN".to_string(),
            CallGuardError::TrackReplaceFailed { .. } => "TRACK_REPLACE_FAILED".to_string(),
            CallGuardError::Serialization { .. } => "SERIALIZATION_FAILED".to_string(),
            CallGuardError::InvalidMessage { .. } => "INVALID_MESSAGE".to_string(),
            CallGuardError::RuntimeUnavailable { .. } => "RUNTIME_UNAVAILABLE".to_string(),
        }
    }

    /// Whether the error prevents the watchdog from operating
    pub fn is_call_fatal(&self) -> bool {
        matches!(self, CallGuardError::RuntimeUnavailable { .. })
    }
}

/// Outcome of a local camera recovery attempt that did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    /// A recovery sequence is already running for this session
    #[error("Recovery already in progress")]
    Busy,

    /// The watchdog is not in a phase that allows recovery
    #[error("Watchdog not monitoring (phase: {phase})")]
    NotMonitoring {
        /// Current watchdog phase
        phase: String,
    },

    /// Retry budget spent; local video stays off for the rest of the call
    #[error("Retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
    },

    /// Capture device could not be reacquired
    #[error("Camera acquisition failed on attempt {attempt}: {reason}")]
    Acquisition {
        /// Attempt number (1-based)
        attempt: u32,
        /// Reason reported by the capture gateway
        reason: String,
    },
}

impl RecoveryError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            RecoveryError::Busy => "RECOVERY_BUSY",
            RecoveryError::NotMonitoring { .. } => "NOT_MONITORING",
            RecoveryError::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            RecoveryError::Acquisition { .. } => "ACQUISITION_FAILED",
        }
    }

    /// Check if the local side can never recover in this session
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecoveryError::RetriesExhausted { .. })
    }
}
