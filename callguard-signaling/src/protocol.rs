//! Status envelope wire protocol
//!
//! Envelopes travel as JSON text over the data channel the call already uses
//! for other traffic, so every message carries a `type` discriminator and
//! anything that is not a well-formed `camera_status` message is rejected.

use bytes::Bytes;
use callguard_core::CallGuardError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the sending endpoint is reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// A camera track is broken
    LocalProblem,
    /// A camera track stopped producing frames
    LocalFrozen,
    /// The sender's camera came back after a recovery
    LocalRecovered,
    /// The sender gave up on its camera for the rest of the call
    LocalUnavailable,
}

impl StatusKind {
    /// Whether this kind reports a fault (as opposed to a status update)
    pub fn is_fault(&self) -> bool {
        matches!(self, StatusKind::LocalProblem | StatusKind::LocalFrozen)
    }
}

/// Whose camera an envelope talks about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// The sender's own outbound camera
    #[default]
    Sender,
    /// The recipient's camera, as seen arriving at the sender
    Recipient,
}

/// One health-status message exchanged between the two call endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEnvelope {
    /// Reported condition
    pub kind: StatusKind,
    /// Opaque identifier of the sending endpoint
    pub origin_id: String,
    /// Wall-clock send time
    pub sent_at: DateTime<Utc>,
    /// Whose camera the report is about; absent means the sender's
    #[serde(default)]
    pub subject: Subject,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage {
    CameraStatus(StatusEnvelope),
}

impl StatusEnvelope {
    /// Create an envelope stamped with the current time
    pub fn new(kind: StatusKind, origin_id: impl Into<String>, subject: Subject) -> Self {
        Self {
            kind,
            origin_id: origin_id.into(),
            sent_at: Utc::now(),
            subject,
        }
    }

    /// Encode for transmission
    pub fn to_bytes(&self) -> Result<Bytes, CallGuardError> {
        serde_json::to_vec(&WireMessage::CameraStatus(self.clone()))
            .map(Bytes::from)
            .map_err(|e| CallGuardError::Serialization {
                reason: e.to_string(),
            })
    }

    /// Decode a received payload
    pub fn from_slice(payload: &[u8]) -> Result<Self, CallGuardError> {
        match serde_json::from_slice::<WireMessage>(payload) {
            Ok(WireMessage::CameraStatus(envelope)) => Ok(envelope),
            Err(e) => Err(CallGuardError::InvalidMessage {
                message: String::from_utf8_lossy(payload).into_owned(),
                source: Box::new(e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let envelope = StatusEnvelope::new(StatusKind::LocalFrozen, "peer-a", Subject::Sender);
        let bytes = envelope.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["type"], "camera_status");
        assert_eq!(value["kind"], "local_frozen");
        assert_eq!(value["originId"], "peer-a");
        assert_eq!(value["subject"], "sender");
        assert!(value["sentAt"].is_string());
    }

    #[test]
    fn test_missing_subject_defaults_to_sender() {
        let payload = br#"{"type":"camera_status","kind":"local_problem","originId":"peer-b","sentAt":"2024-05-01T10:00:00Z"}"#;
        let envelope = StatusEnvelope::from_slice(payload).unwrap();

        assert_eq!(envelope.kind, StatusKind::LocalProblem);
        assert_eq!(envelope.subject, Subject::Sender);
    }

    #[test]
    fn test_rejects_foreign_messages() {
        let translation = br#"{"type":"translation","text":"hola"}"#;
        assert!(StatusEnvelope::from_slice(translation).is_err());

        let unknown_kind = br#"{"type":"camera_status","kind":"local_exploded","originId":"x","sentAt":"2024-05-01T10:00:00Z"}"#;
        assert!(StatusEnvelope::from_slice(unknown_kind).is_err());

        assert!(StatusEnvelope::from_slice(b"not json").is_err());
    }
}
