//! Structured debug logging system

use callguard_core::CallGuardError;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "callguard=info";

/// Debug logger for structured logging
#[derive(Debug, Default)]
pub struct DebugLogger;

impl DebugLogger {
    /// Initialize logging with `RUST_LOG`, falling back to [`DEFAULT_FILTER`]
    pub fn init_logging() -> Result<(), CallGuardError> {
        Self::init_with_filter(DEFAULT_FILTER)
    }

    /// Initialize logging with `RUST_LOG`, falling back to `fallback`
    pub fn init_with_filter(fallback: &str) -> Result<(), CallGuardError> {
        let filter = Self::build_filter(fallback)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .map_err(|e| CallGuardError::InvalidState {
                expected: "no global subscriber".to_string(),
                actual: e.to_string(),
            })
    }

    fn build_filter(fallback: &str) -> Result<EnvFilter, CallGuardError> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(fallback))
            .map_err(|e| CallGuardError::InvalidConfiguration {
                field: "log_filter".to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_filter_parses() {
        assert!(DebugLogger::build_filter("callguard=debug,callguard_core=trace").is_ok());
    }

    #[test]
    fn test_second_init_reports_error() {
        let _ = DebugLogger::init_logging();
        let second = DebugLogger::init_logging();
        assert!(matches!(second, Err(CallGuardError::InvalidState { .. })));
    }
}
