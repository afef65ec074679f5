//! End-to-end scenarios for the Haven core session.
//!
//! These tests run complete flows (onboard, attest, join, send, delete)
//! against in-memory databases with a manual clock, so epoch boundaries
//! are exact.

use haven_core::{
    Category, DatabaseConfig, Error, ManualClock, RlnConfig, Session, SessionConfig,
    StaticRoomSecrets,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn open_session(clock: Arc<ManualClock>) -> Session {
    let config = SessionConfig {
        database: DatabaseConfig {
            path: String::new(),
            in_memory: true,
        },
        rln: RlnConfig::default(),
        message_cap: 100,
    };
    Session::open(config, clock, Arc::new(StaticRoomSecrets::new([9u8; 32])))
        .expect("open session")
}

/// The full onboarding and rate-limit scenario: create identity, attest
/// anxiety, join anxiety-support, send at t=0 (accepted), resend in the
/// same epoch (rate limited), send again at t=61s (accepted).
#[test]
fn test_onboarding_and_rate_limit_scenario() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock.clone());

    session.create_identity().expect("create identity");
    session.attest(Category::Anxiety).expect("attest");
    session.join_room("anxiety-support", 0).expect("join");

    let message = session
        .send_message("anxiety-support", "hello")
        .expect("first send accepted");

    let messages = session.get_messages("anxiety-support").expect("messages");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, message.id);
    assert_eq!(
        session.decrypt_message(&messages[0]).expect("decrypt"),
        "hello"
    );

    // Same epoch: rejected, log unchanged.
    let err = session.send_message("anxiety-support", "hello again");
    assert!(matches!(err, Err(Error::RateLimited)));
    assert_eq!(
        session.room_message_count("anxiety-support").expect("count"),
        1
    );

    // Next epoch: accepted.
    clock.set(61);
    session
        .send_message("anxiety-support", "hello once more")
        .expect("next-epoch send accepted");
    assert_eq!(
        session.room_message_count("anxiety-support").expect("count"),
        2
    );
}

#[test]
fn test_join_requires_attestation() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock);

    session.create_identity().expect("create identity");
    let err = session.join_room("anxiety-support", 0);
    assert!(matches!(err, Err(Error::NotAttested)));
}

#[test]
fn test_send_requires_membership() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock);

    session.create_identity().expect("create identity");
    session.attest(Category::Depression).expect("attest");

    let err = session.send_message("depression-support", "hi");
    assert!(matches!(err, Err(Error::NotMember)));
}

#[test]
fn test_second_identity_rejected() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock);

    session.create_identity().expect("create identity");
    let err = session.create_identity();
    assert!(matches!(err, Err(Error::AlreadyExists)));
}

#[test]
fn test_delete_identity_cascades_and_is_idempotent() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock.clone());

    let deleted = Arc::new(AtomicBool::new(false));
    {
        let deleted = Arc::clone(&deleted);
        session.on_identity_deleted(move || deleted.store(true, Ordering::SeqCst));
    }

    let identity = session.create_identity().expect("create identity");
    let identity_id = identity.id.clone();
    session.attest(Category::Trauma).expect("attest");
    session.join_room("general-support", 0).expect("join");
    session.join_room("crisis-support", 0).expect("join");
    session
        .send_message("general-support", "reaching out")
        .expect("send");

    session.delete_identity().expect("delete");

    assert!(session.current_identity().is_none());
    assert!(deleted.load(Ordering::SeqCst));

    // No orphans: attestations, memberships and cached messages are gone,
    // and member counts went back down.
    let db = session.database();
    assert_eq!(db.attestation_count(&identity_id).expect("count"), 0);
    assert_eq!(db.memberships_for_identity(&identity_id).expect("count"), 0);
    assert_eq!(session.room_message_count("general-support").expect("count"), 0);
    let rooms = session.list_rooms().expect("rooms");
    assert!(rooms.iter().all(|r| r.member_count == 0));

    // Second delete is a no-op, not an error.
    session.delete_identity().expect("idempotent delete");
}

#[test]
fn test_double_leave_returns_not_member() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock);

    session.create_identity().expect("create identity");
    session.attest(Category::Addiction).expect("attest");
    session.join_room("general-support", 0).expect("join");

    let count_after_join = session
        .room("general-support")
        .expect("room")
        .expect("exists")
        .member_count;
    assert_eq!(count_after_join, 1);

    session.leave_room("general-support").expect("leave");
    let err = session.leave_room("general-support");
    assert!(matches!(err, Err(Error::NotMember)));

    // Member count unchanged by the failed second leave.
    let count = session
        .room("general-support")
        .expect("room")
        .expect("exists")
        .member_count;
    assert_eq!(count, 0);
}

#[test]
fn test_rejoin_creates_new_audit_row() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock.clone());

    let identity = session.create_identity().expect("create identity");
    session.attest(Category::Other).expect("attest");

    session.join_room("general-support", 0).expect("join");
    session.leave_room("general-support").expect("leave");
    clock.advance(5);
    session.join_room("general-support", 0).expect("rejoin");

    assert_eq!(
        session
            .database()
            .membership_row_count(&identity.id, "general-support")
            .expect("count"),
        2
    );
    assert!(session
        .active_membership("general-support")
        .expect("lookup")
        .is_some());

    let err = session.join_room("general-support", 0);
    assert!(matches!(err, Err(Error::AlreadyMember)));
}

#[test]
fn test_new_attestation_supersedes_previous() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock.clone());

    let identity = session.create_identity().expect("create identity");
    session.attest(Category::Anxiety).expect("attest");
    clock.advance(10);
    let second = session.attest(Category::Depression).expect("re-attest");

    let active = session
        .active_attestation()
        .expect("lookup")
        .expect("present");
    assert_eq!(active.category, Category::Depression);
    assert_eq!(active.issued_at, second.issued_at);
    assert!(session
        .verify_attestation(&active, Category::Depression)
        .expect("verify"));
    assert!(!session
        .verify_attestation(&active, Category::Anxiety)
        .expect("verify"));

    // Superseded row is retained for audit.
    assert_eq!(
        session
            .database()
            .attestation_count(&identity.id)
            .expect("count"),
        2
    );
}

/// Sending the 101st message with cap 100 evicts exactly the oldest,
/// leaving the log at 100.
#[test]
fn test_retention_cap_evicts_oldest() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock.clone());

    session.create_identity().expect("create identity");
    session.attest(Category::Anxiety).expect("attest");
    session.join_room("general-support", 0).expect("join");

    let mut first_id = None;
    for i in 0..101 {
        let message = session
            .send_message("general-support", &format!("message {}", i))
            .expect("send");
        if i == 0 {
            first_id = Some(message.id);
        }
        clock.advance(61); // new epoch each send
    }

    let messages = session.get_messages("general-support").expect("messages");
    assert_eq!(messages.len(), 100);
    assert!(messages.iter().all(|m| Some(&m.id) != first_id.as_ref()));
    assert_eq!(
        session.decrypt_message(&messages[0]).expect("decrypt"),
        "message 1"
    );
}

#[test]
fn test_get_messages_is_repeatable() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock.clone());

    session.create_identity().expect("create identity");
    session.attest(Category::Anxiety).expect("attest");
    session.join_room("general-support", 0).expect("join");

    for i in 0..3 {
        session
            .send_message("general-support", &format!("m{}", i))
            .expect("send");
        clock.advance(61);
    }

    let first = session.get_messages("general-support").expect("read");
    let second = session.get_messages("general-support").expect("re-read");
    let ids: Vec<_> = first.iter().map(|m| m.id.clone()).collect();
    let ids_again: Vec<_> = second.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, ids_again);
}

#[test]
fn test_tampered_message_is_unreadable_not_fatal() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock);

    session.create_identity().expect("create identity");
    session.attest(Category::Anxiety).expect("attest");
    session.join_room("general-support", 0).expect("join");

    let mut message = session
        .send_message("general-support", "hello")
        .expect("send");
    let last = message.ciphertext.len() - 1;
    message.ciphertext[last] ^= 0xFF;

    let err = session.decrypt_message(&message);
    assert!(matches!(err, Err(Error::DecryptionFailed)));
}

#[test]
fn test_sessions_are_independent() {
    let clock = Arc::new(ManualClock::new(0));
    let mut a = open_session(clock.clone());
    let mut b = open_session(clock);

    let id_a = a.create_identity().expect("create a");
    let id_b = b.create_identity().expect("create b");
    assert_ne!(id_a.public_commitment, id_b.public_commitment);

    a.delete_identity().expect("delete a");
    assert!(a.current_identity().is_none());
    assert!(b.current_identity().is_some());
}

#[test]
fn test_join_unknown_room_fails() {
    let clock = Arc::new(ManualClock::new(0));
    let mut session = open_session(clock);

    session.create_identity().expect("create identity");
    session.attest(Category::Anxiety).expect("attest");

    let err = session.join_room("no-such-room", 0);
    assert!(matches!(err, Err(Error::NotFound(_))));
}

#[test]
fn test_default_room_catalog() {
    let clock = Arc::new(ManualClock::new(0));
    let session = open_session(clock);

    let rooms = session.list_rooms().expect("rooms");
    let ids: Vec<_> = rooms.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "general-support",
            "anxiety-support",
            "depression-support",
            "crisis-support"
        ]
    );
}

#[test]
fn test_report_abuse_returns_receipt() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut session = open_session(clock);

    session.create_identity().expect("create identity");
    let receipt = session
        .report_abuse("general-support", "harassment in room")
        .expect("report");

    assert_eq!(receipt.report_id.len(), 32); // 16 bytes, hex
    assert_eq!(receipt.created_at, 1_000);
}
