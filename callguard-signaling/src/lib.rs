//! # CallGuard Signaling
//!
//! Camera health notifications exchanged between the two call endpoints over
//! the data channel the call already has open. Delivery is best effort: a
//! lost notification never affects call setup or media flow.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod protocol;

// Re-export main types
pub use channel::{PeerNotificationChannel, PeerReaction, SendOutcome};
pub use protocol::{StatusEnvelope, StatusKind, Subject};
