//! Tests for status notifications over a data channel

use bytes::Bytes;
use callguard_core::{DataChannelState, LoopbackDataChannel};
use callguard_signaling::*;
use parking_lot::Mutex;
use std::sync::Arc;

fn envelope_bytes(kind: StatusKind, origin: &str, subject: Subject) -> Bytes {
    StatusEnvelope::new(kind, origin, subject).to_bytes().unwrap()
}

#[test]
fn test_send_on_open_channel() {
    let channel = LoopbackDataChannel::detached(DataChannelState::Open);
    let notifier = PeerNotificationChannel::new(channel.clone(), "peer-a");

    let outcome = notifier
        .send(StatusKind::LocalRecovered, Subject::Sender)
        .unwrap();

    assert_eq!(outcome, SendOutcome::Sent);
    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    let envelope = StatusEnvelope::from_slice(&sent[0]).unwrap();
    assert_eq!(envelope.kind, StatusKind::LocalRecovered);
    assert_eq!(envelope.origin_id, "peer-a");
}

#[test]
fn test_send_on_closed_channel_is_silent() {
    for state in [
        DataChannelState::Connecting,
        DataChannelState::Closing,
        DataChannelState::Closed,
    ] {
        let channel = LoopbackDataChannel::detached(state);
        let notifier = PeerNotificationChannel::new(channel.clone(), "peer-a");

        let outcome = notifier.send(StatusKind::LocalProblem, Subject::Sender);

        assert_eq!(outcome.unwrap(), SendOutcome::Dropped { state });
        assert!(channel.sent().is_empty());
    }
}

#[test]
fn test_peer_fault_about_itself_is_informational() {
    let channel = LoopbackDataChannel::detached(DataChannelState::Open);
    let notifier = PeerNotificationChannel::new(channel, "peer-a");

    for kind in [StatusKind::LocalProblem, StatusKind::LocalFrozen] {
        let reaction = notifier.on_receive(&envelope_bytes(kind, "peer-b", Subject::Sender));
        assert!(matches!(reaction, PeerReaction::Informational(_)));
    }
}

#[test]
fn test_peer_fault_about_us_triggers_recovery() {
    let channel = LoopbackDataChannel::detached(DataChannelState::Open);
    let notifier = PeerNotificationChannel::new(channel, "peer-a");

    let reaction = notifier.on_receive(&envelope_bytes(
        StatusKind::LocalFrozen,
        "peer-b",
        Subject::Recipient,
    ));

    match reaction {
        PeerReaction::RecoverLocal(envelope) => assert_eq!(envelope.origin_id, "peer-b"),
        other => panic!("Expected RecoverLocal, got {:?}", other),
    }
}

#[test]
fn test_peer_reports_can_be_disabled() {
    let channel = LoopbackDataChannel::detached(DataChannelState::Open);
    let notifier = PeerNotificationChannel::new(channel, "peer-a").with_peer_reports(false);

    let reaction = notifier.on_receive(&envelope_bytes(
        StatusKind::LocalProblem,
        "peer-b",
        Subject::Recipient,
    ));

    assert!(matches!(reaction, PeerReaction::Informational(_)));
}

#[test]
fn test_status_updates_are_informational() {
    let channel = LoopbackDataChannel::detached(DataChannelState::Open);
    let notifier = PeerNotificationChannel::new(channel, "peer-a");

    for kind in [StatusKind::LocalRecovered, StatusKind::LocalUnavailable] {
        for subject in [Subject::Sender, Subject::Recipient] {
            let reaction = notifier.on_receive(&envelope_bytes(kind, "peer-b", subject));
            assert!(matches!(reaction, PeerReaction::Informational(_)));
        }
    }
}

#[test]
fn test_malformed_and_echoed_payloads_ignored() {
    let channel = LoopbackDataChannel::detached(DataChannelState::Open);
    let notifier = PeerNotificationChannel::new(channel, "peer-a");

    assert_eq!(notifier.on_receive(b"{not json"), PeerReaction::Ignored);
    assert_eq!(
        notifier.on_receive(br#"{"type":"chat","text":"hi"}"#),
        PeerReaction::Ignored
    );
    assert_eq!(
        notifier.on_receive(&envelope_bytes(
            StatusKind::LocalFrozen,
            "peer-a",
            Subject::Recipient
        )),
        PeerReaction::Ignored
    );
}

#[test]
fn test_listen_routes_between_peers() {
    let (a, b) = LoopbackDataChannel::pair();
    let sender = PeerNotificationChannel::new(a, "peer-a");
    let receiver = PeerNotificationChannel::new(b.clone(), "peer-b");

    let reactions = Arc::new(Mutex::new(Vec::new()));
    let sink = reactions.clone();
    receiver.listen(move |reaction| sink.lock().push(reaction));

    sender
        .send(StatusKind::LocalProblem, Subject::Recipient)
        .unwrap();
    b.inject(Bytes::from_static(b"garbage"));

    let reactions = reactions.lock();
    assert_eq!(reactions.len(), 1);
    assert!(matches!(reactions[0], PeerReaction::RecoverLocal(_)));
}
