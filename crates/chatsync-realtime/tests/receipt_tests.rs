//! Integration tests for read receipt aggregation.

mod common;

use chatsync_core::error::ErrorKind;
use chatsync_core::types::id::{MessageId, UserId};
use chatsync_realtime::events::ServerEvent;
use common::TestEngine;

#[tokio::test]
async fn test_mark_read_is_idempotent() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let chat = app.create_chat(&[alice, bob]);

    let mut alice_client = app.connect(alice).await;
    let _bob_client = app.connect(bob).await;
    alice_client.drain();

    let message = app.engine.delivery.submit(chat, alice, "hi").await.unwrap();
    alice_client.drain();

    let newly = app
        .engine
        .receipts
        .mark_read(chat, bob, &[message.id])
        .await
        .unwrap();
    assert_eq!(newly, vec![message.id]);
    assert!(matches!(
        alice_client.recv().await,
        ServerEvent::MessagesRead { .. }
    ));

    // Overlapping repeat: nothing recorded, nothing broadcast.
    let again = app
        .engine
        .receipts
        .mark_read(chat, bob, &[message.id, message.id])
        .await
        .unwrap();
    assert!(again.is_empty());
    alice_client.assert_silent();

    assert_eq!(app.engine.receipts.reader_count(message.id), 1);
    assert_eq!(app.store.marker_count(message.id), 1);
}

#[tokio::test]
async fn test_aggregated_event_carries_only_new_ids() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let chat = app.create_chat(&[alice, bob]);

    let mut alice_client = app.connect(alice).await;
    let _bob_client = app.connect(bob).await;
    alice_client.drain();

    let first = app.engine.delivery.submit(chat, alice, "one").await.unwrap();
    let second = app.engine.delivery.submit(chat, alice, "two").await.unwrap();
    alice_client.drain();

    app.engine
        .receipts
        .mark_read(chat, bob, &[first.id])
        .await
        .unwrap();
    let newly = app
        .engine
        .receipts
        .mark_read(chat, bob, &[first.id, second.id])
        .await
        .unwrap();
    assert_eq!(newly, vec![second.id]);

    alice_client.recv().await; // first call's event
    match alice_client.recv().await {
        ServerEvent::MessagesRead {
            message_ids,
            reader_id,
        } => {
            assert_eq!(message_ids, vec![second.id]);
            assert_eq!(reader_id, bob);
        }
        other => panic!("expected messages-read, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reader_sessions_are_excluded_from_broadcast() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let chat = app.create_chat(&[alice, bob]);

    let _alice_client = app.connect(alice).await;
    let mut bob_phone = app.connect(bob).await;
    let mut bob_laptop = app.connect(bob).await;
    bob_phone.drain();
    bob_laptop.drain();

    let message = app.engine.delivery.submit(chat, alice, "hi").await.unwrap();
    bob_phone.drain();
    bob_laptop.drain();

    app.engine
        .receipts
        .mark_read(chat, bob, &[message.id])
        .await
        .unwrap();

    bob_phone.assert_silent();
    bob_laptop.assert_silent();
}

#[tokio::test]
async fn test_non_member_mark_read_is_rejected() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let mallory = UserId::new();
    let chat = app.create_chat(&[alice]);
    let _client = app.connect(alice).await;

    let message = app.engine.delivery.submit(chat, alice, "hi").await.unwrap();
    let err = app
        .engine
        .receipts
        .mark_read(chat, mallory, &[message.id])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotAMember);
    assert_eq!(app.engine.receipts.reader_count(message.id), 0);
}

#[tokio::test]
async fn test_readers_of_is_ordered_by_read_time() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let carol = UserId::new();
    let chat = app.create_chat(&[alice, bob, carol]);
    let _client = app.connect(alice).await;

    let message = app.engine.delivery.submit(chat, alice, "hi").await.unwrap();

    app.engine
        .receipts
        .mark_read(chat, bob, &[message.id])
        .await
        .unwrap();
    app.engine
        .receipts
        .mark_read(chat, carol, &[message.id])
        .await
        .unwrap();

    let readers = app.engine.receipts.readers_of(message.id);
    assert_eq!(readers.len(), 2);
    assert_eq!(readers[0].reader_id, bob);
    assert_eq!(readers[1].reader_id, carol);
    assert!(readers[0].read_at <= readers[1].read_at);

    assert!(app.engine.receipts.readers_of(MessageId::new()).is_empty());
}
