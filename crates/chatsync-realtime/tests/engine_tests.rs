//! End-to-end engine tests: dispatch, authentication, and the full
//! two-user synchronization scenario.

mod common;

use std::sync::Arc;

use chatsync_auth::{JwtIssuer, JwtVerifier};
use chatsync_core::config::auth::AuthConfig;
use chatsync_core::config::realtime::RealtimeConfig;
use chatsync_core::error::ErrorKind;
use chatsync_core::types::id::{MessageId, SessionId, UserId};
use chatsync_realtime::engine::SyncEngine;
use chatsync_realtime::events::{ClientEvent, ServerEvent};
use chatsync_storage::MemoryChatStore;
use common::TestEngine;

#[tokio::test]
async fn test_two_user_synchronization_scenario() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let chat = app.create_chat(&[alice, bob]);

    let mut alice_client = app.connect(alice).await;
    let mut bob_client = app.connect(bob).await;
    alice_client.drain();

    // Alice sends "hi"; Bob's session receives it with sequence 1.
    app.engine
        .handle_event(
            alice_client.handle.session_id,
            ClientEvent::SendMessage {
                chat_id: chat,
                content: "hi".to_string(),
            },
        )
        .await
        .expect("send");

    let message_id = match bob_client.recv().await {
        ServerEvent::NewMessage { message } => {
            assert_eq!(message.chat_id, chat);
            assert_eq!(message.sender_id, alice);
            assert_eq!(message.content, "hi");
            assert_eq!(message.sequence, 1);
            message.id
        }
        other => panic!("expected new-message, got {other:?}"),
    };
    alice_client.drain(); // her own echo

    // Bob marks it read; Alice's session sees the receipt once.
    app.engine
        .handle_event(
            bob_client.handle.session_id,
            ClientEvent::MarkAsRead {
                message_ids: vec![message_id],
            },
        )
        .await
        .expect("mark read");
    assert_eq!(
        alice_client.recv().await,
        ServerEvent::MessagesRead {
            message_ids: vec![message_id],
            reader_id: bob,
        }
    );

    // An identical second call produces no second event.
    app.engine
        .handle_event(
            bob_client.handle.session_id,
            ClientEvent::MarkAsRead {
                message_ids: vec![message_id],
            },
        )
        .await
        .expect("repeat mark read");
    alice_client.assert_silent();

    // Alice disconnects everywhere; Bob sees her go offline.
    app.engine
        .disconnect(alice_client.handle.session_id)
        .await
        .expect("disconnect");
    match bob_client.recv().await {
        ServerEvent::PresenceChanged {
            user_id,
            online,
            last_seen,
        } => {
            assert_eq!(user_id, alice);
            assert!(!online);
            assert!(last_seen.is_some());
        }
        other => panic!("expected presence-changed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dispatch_reports_failure_to_origin_session_only() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let mallory = UserId::new();
    let chat = app.create_chat(&[alice]);

    let mut alice_client = app.connect(alice).await;
    let mut mallory_client = app.connect(mallory).await;

    let err = app
        .engine
        .handle_event(
            mallory_client.handle.session_id,
            ClientEvent::SendMessage {
                chat_id: chat,
                content: "hi".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotAMember);

    match mallory_client.recv().await {
        ServerEvent::Error { code, .. } => assert_eq!(code, "NOT_A_MEMBER"),
        other => panic!("expected error event, got {other:?}"),
    }
    alice_client.assert_silent();
}

#[tokio::test]
async fn test_dispatch_from_unknown_session_fails() {
    let app = TestEngine::new();
    let err = app
        .engine
        .handle_event(
            SessionId::new(),
            ClientEvent::Typing {
                chat_id: app.create_chat(&[UserId::new()]),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownSession);
}

#[tokio::test]
async fn test_mark_as_read_groups_ids_by_chat_and_skips_unknown() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let chat_a = app.create_chat(&[alice, bob]);
    let chat_b = app.create_chat(&[alice, bob]);

    let mut alice_client = app.connect(alice).await;
    let mut bob_client = app.connect(bob).await;
    alice_client.drain();

    let in_a = app.engine.delivery.submit(chat_a, alice, "a").await.unwrap();
    let in_b = app.engine.delivery.submit(chat_b, alice, "b").await.unwrap();
    alice_client.drain();
    bob_client.drain();

    // One wire event spanning two chats plus an id the store never saw.
    app.engine
        .handle_event(
            bob_client.handle.session_id,
            ClientEvent::MarkAsRead {
                message_ids: vec![in_a.id, in_b.id, MessageId::new()],
            },
        )
        .await
        .expect("mark read");

    let mut read_ids: Vec<MessageId> = alice_client
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            ServerEvent::MessagesRead { message_ids, .. } => Some(message_ids),
            _ => None,
        })
        .flatten()
        .collect();
    read_ids.sort_by_key(|id| id.to_string());

    let mut expected = vec![in_a.id, in_b.id];
    expected.sort_by_key(|id| id.to_string());
    assert_eq!(read_ids, expected);
}

#[tokio::test]
async fn test_token_gated_connect() {
    let auth_config = AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        token_ttl_minutes: 5,
        leeway_seconds: 0,
    };
    let issuer = JwtIssuer::new(&auth_config);
    let verifier = Arc::new(JwtVerifier::new(&auth_config));

    let store = Arc::new(MemoryChatStore::new());
    let engine = SyncEngine::with_verifier(RealtimeConfig::default(), store, verifier);

    let alice = UserId::new();
    let (token, _) = issuer.issue(alice).expect("issue");
    let (handle, _rx) = engine.connect_with_token(&token).await.expect("connect");
    assert_eq!(handle.user_id, alice);
    assert!(engine.registry.is_user_connected(alice));

    // A bad credential creates no state.
    let err = engine.connect_with_token("garbage").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(engine.registry.connection_count(), 1);
}

#[tokio::test]
async fn test_connect_without_verifier_rejects_tokens() {
    let app = TestEngine::new();
    let err = app.engine.connect_with_token("anything").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_shutdown_closes_sessions_and_timers() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let chat = app.create_chat(&[alice, bob]);

    let alice_client = app.connect(alice).await;
    let mut bob_client = app.connect(bob).await;
    bob_client.drain();

    app.engine.typing.signal_typing(chat, alice).await.unwrap();
    bob_client.recv().await; // typing

    let mut shutdown_rx = app.engine.shutdown_receiver();
    app.engine.shutdown().await;

    assert!(shutdown_rx.try_recv().is_ok());
    assert_eq!(app.engine.registry.connection_count(), 0);
    assert!(!alice_client.handle.info().alive);
    assert!(!app.engine.typing.is_typing(chat, alice));
}

#[tokio::test]
async fn test_metrics_track_engine_activity() {
    let app = TestEngine::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let chat = app.create_chat(&[alice, bob]);

    let alice_client = app.connect(alice).await;
    let _bob_client = app.connect(bob).await;

    app.engine.delivery.submit(chat, alice, "hi").await.unwrap();
    app.engine
        .disconnect(alice_client.handle.session_id)
        .await
        .unwrap();

    let snapshot = app.engine.metrics.snapshot();
    assert_eq!(snapshot.sessions_total, 2);
    assert_eq!(snapshot.sessions_active, 1);
    assert_eq!(snapshot.messages_delivered, 1);
    assert!(snapshot.events_fanned_out >= 2);
    assert!(snapshot.presence_transitions >= 3);
}
