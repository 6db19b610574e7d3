//! Tests for the transport interfaces and their in-memory doubles

use bytes::Bytes;
use callguard_core::*;
use parking_lot::Mutex;
use std::sync::Arc;

#[tokio::test]
async fn test_connection_state_serialization() {
    let state = PeerConnectionState::Disconnected;
    let serialized = serde_json::to_string(&state).unwrap();
    assert_eq!(serialized, "\"disconnected\"");
    let deserialized: PeerConnectionState = serde_json::from_str(&serialized).unwrap();
    assert_eq!(state, deserialized);
}

#[tokio::test]
async fn test_mock_peer_connection_records_replacements() {
    let peer = MockPeerConnection::connected();
    let track = VideoTrack::with_id("cam-2", "Front Camera");

    peer.replace_outbound_video_track(&track).await.unwrap();

    assert_eq!(peer.replaced_tracks(), vec!["cam-2".to_string()]);
}

#[tokio::test]
async fn test_mock_peer_connection_rejects_when_disconnected() {
    let peer = MockPeerConnection::new(PeerConnectionState::Disconnected);
    let track = VideoTrack::new("Front Camera");

    let result = peer.replace_outbound_video_track(&track).await;

    assert!(matches!(result, Err(CallGuardError::InvalidState { .. })));
    assert_eq!(peer.replace_count(), 0);
}

#[tokio::test]
async fn test_mock_peer_connection_forced_failure() {
    let peer = MockPeerConnection::connected();
    peer.fail_replacements(true);

    let result = peer
        .replace_outbound_video_track(&VideoTrack::new("Front Camera"))
        .await;

    assert_eq!(result.unwrap_err().error_code(), "TRACK_REPLACE_FAILED");
}

#[test]
fn test_loopback_pair_delivers_to_peer() {
    let (a, b) = LoopbackDataChannel::pair();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    b.on_message(Box::new(move |payload| sink.lock().push(payload)));

    a.send(Bytes::from_static(b"hello")).unwrap();

    assert_eq!(a.sent().len(), 1);
    assert_eq!(received.lock().as_slice(), &[Bytes::from_static(b"hello")]);
}

#[test]
fn test_loopback_send_on_closed_channel_fails() {
    let channel = LoopbackDataChannel::detached(DataChannelState::Closed);

    let result = channel.send(Bytes::from_static(b"hello"));

    assert!(matches!(
        result,
        Err(CallGuardError::DataChannelNotOpen { .. })
    ));
    assert!(channel.sent().is_empty());
}

#[test]
fn test_loopback_closed_peer_does_not_receive() {
    let (a, b) = LoopbackDataChannel::pair();
    let received = Arc::new(Mutex::new(0usize));
    let sink = received.clone();
    b.on_message(Box::new(move |_| *sink.lock() += 1));
    b.set_state(DataChannelState::Closing);

    a.send(Bytes::from_static(b"hello")).unwrap();

    assert_eq!(*received.lock(), 0);
}
