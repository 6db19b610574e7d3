//! # CallGuard Diagnostics
//!
//! Structured logging setup and a bounded history of track health transitions
//! for post-call inspection.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod debug_logger;
pub mod transition_log;

// Re-export main types
pub use debug_logger::DebugLogger;
pub use transition_log::{TransitionLog, TransitionRecord};
