//! Per-side track health classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two call video tracks a signal refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSide {
    /// Track captured on this endpoint and sent to the peer
    Local,
    /// Track received from the remote peer
    Remote,
}

impl TrackSide {
    /// Both sides, local first
    pub const ALL: [TrackSide; 2] = [TrackSide::Local, TrackSide::Remote];
}

impl fmt::Display for TrackSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackSide::Local => write!(f, "local"),
            TrackSide::Remote => write!(f, "remote"),
        }
    }
}

/// Health classification of one video track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackHealthState {
    /// Frames are flowing
    Active,
    /// No activity observed within the side's freeze threshold
    Frozen,
    /// The track reported an error or ended
    Erred,
    /// Recovery budget exhausted; the side stays dark for the call
    Unavailable,
}

impl TrackHealthState {
    /// Whether the track is currently considered healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, TrackHealthState::Active)
    }

    /// Whether no further transitions will happen in this session
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackHealthState::Unavailable)
    }
}

impl fmt::Display for TrackHealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackHealthState::Active => "active",
            TrackHealthState::Frozen => "frozen",
            TrackHealthState::Erred => "erred",
            TrackHealthState::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&TrackHealthState::Unavailable).unwrap();
        assert_eq!(json, "\"unavailable\"");

        let side: TrackSide = serde_json::from_str("\"remote\"").unwrap();
        assert_eq!(side, TrackSide::Remote);
    }

    #[test]
    fn test_state_predicates() {
        assert!(TrackHealthState::Active.is_healthy());
        assert!(!TrackHealthState::Frozen.is_healthy());
        assert!(TrackHealthState::Unavailable.is_terminal());
        assert!(!TrackHealthState::Erred.is_terminal());
    }
}
