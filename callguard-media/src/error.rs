//! Capture error types and handling

use thiserror::Error;

/// Main error type for capture operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Device not found error
    #[error("Device not found: {device_id}")]
    DeviceNotFound {
        /// Device identifier
        device_id: String,
    },

    /// Device exists but could not be opened (held by another process, still releasing)
    #[error("Device unavailable: {reason}")]
    DeviceUnavailable {
        /// Failure reason
        reason: String,
    },

    /// Permission denied error
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// Requested constraints cannot be satisfied by any device
    #[error("Constraints not satisfiable: {constraint}")]
    OverConstrained {
        /// Constraint that failed
        constraint: String,
    },

    /// Timeout error
    #[error("Operation timed out after {duration:?}")]
    Timeout {
        /// Duration after which timeout occurred
        duration: std::time::Duration,
    },

    /// Unsupported platform error
    #[error("Unsupported platform: {platform}")]
    UnsupportedPlatform {
        /// Platform name
        platform: String,
    },
}

/// Result type alias for capture operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Check if a later reacquisition attempt could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::Io { .. } => true,
            MediaError::DeviceUnavailable { .. } => true,
            MediaError::Timeout { .. } => true,
            MediaError::DeviceNotFound { .. } => true,
            MediaError::PermissionDenied { .. } => false,
            MediaError::OverConstrained { .. } => false,
            MediaError::InvalidConfiguration { .. } => false,
            MediaError::UnsupportedPlatform { .. } => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::Io { .. } => ErrorCategory::System,
            MediaError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            MediaError::DeviceNotFound { .. } => ErrorCategory::Device,
            MediaError::DeviceUnavailable { .. } => ErrorCategory::Device,
            MediaError::PermissionDenied { .. } => ErrorCategory::System,
            MediaError::OverConstrained { .. } => ErrorCategory::Configuration,
            MediaError::Timeout { .. } => ErrorCategory::System,
            MediaError::UnsupportedPlatform { .. } => ErrorCategory::Platform,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// System-level errors (I/O, permissions, etc.)
    System,
    /// Configuration and parameter errors
    Configuration,
    /// Platform compatibility errors
    Platform,
    /// Device and hardware errors
    Device,
}
