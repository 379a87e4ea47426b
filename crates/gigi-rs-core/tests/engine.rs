//! Send/retry integration tests for the session engine.

use gigi_rs_config::GigiConfig;
use gigi_rs_core::backend::BackendClient;
use gigi_rs_core::{GigiCoreError, SendOutcome, SessionEngine};
use gigi_rs_protocol::{EventPayload, MessageState, RejectReason, Role};
use gigi_rs_test_utils::{
    ChatScript, CollectingSink, FailingBackend, FixedBackend, GatedBackend, ScriptedBackend,
    StubAudioSink,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

struct Harness {
    engine: SessionEngine,
    events: Arc<CollectingSink>,
    sink: Arc<StubAudioSink>,
    _root: TempDir,
}

fn harness(backend: Arc<dyn BackendClient>, config: GigiConfig) -> Harness {
    let root = tempdir().expect("tempdir");
    let events = Arc::new(CollectingSink::new());
    let sink = Arc::new(StubAudioSink::new());
    let engine = SessionEngine::with_storage_root(
        config,
        backend,
        sink.clone(),
        events.clone(),
        root.path(),
    );
    Harness {
        engine,
        events,
        sink,
        _root: root,
    }
}

fn quiet_config() -> GigiConfig {
    let mut config = GigiConfig::default();
    config.voice.enabled_by_default = false;
    config
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

/// The happy path: "Hello" in, "Hi there!" back.
#[tokio::test]
async fn hello_round_trip_settles_both_messages() {
    let backend = Arc::new(FixedBackend::new("Hi **there**!"));
    let harness = harness(backend.clone(), quiet_config());

    let outcome = harness.engine.send_message("Hello").await.expect("send");
    let SendOutcome::Delivered { user_id, assistant_id } = outcome else {
        panic!("expected delivery, got {outcome:?}");
    };

    let messages = harness.engine.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, user_id);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].state, MessageState::Settled);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].id, assistant_id);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].state, MessageState::Settled);
    assert_eq!(messages[1].content, "<p>Hi <strong>there</strong>!</p>\n");
    assert_eq!(messages[1].plain_text, "Hi there!");

    assert_eq!(harness.engine.session().message_count, 1);
    assert_eq!(backend.chat_count(), 1);
    let request = backend.chat_requests.lock()[0].clone();
    assert_eq!(request.session_id, harness.engine.session_id());
    assert_eq!(request.message, "Hello");
}

/// The pending user message is observable while the request is in flight.
#[tokio::test]
async fn message_enters_ledger_pending_before_request_resolves() {
    let backend = Arc::new(GatedBackend::new("Hi there!"));
    let harness = harness(backend.clone(), quiet_config());

    let engine = harness.engine.clone();
    let task = tokio::spawn(async move { engine.send_message("Hello").await });

    backend.entered.notified().await;
    let messages = harness.engine.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].state, MessageState::Pending);
    assert_eq!(messages[0].role, Role::User);

    backend.release();
    let outcome = task.await.expect("join").expect("send");
    assert!(matches!(outcome, SendOutcome::Delivered { .. }));
    assert_eq!(harness.engine.messages()[0].state, MessageState::Settled);
}

/// Empty and over-long input is rejected locally, with no request issued.
#[tokio::test]
async fn invalid_input_is_rejected_without_a_request() {
    let backend = Arc::new(FixedBackend::new("unused"));
    let mut config = quiet_config();
    config.chat.max_message_length = 5;
    let harness = harness(backend.clone(), config);

    let outcome = harness.engine.send_message("   ").await.expect("send");
    assert_eq!(outcome, SendOutcome::Rejected(RejectReason::Empty));

    let outcome = harness.engine.send_message("too long").await.expect("send");
    assert_eq!(outcome, SendOutcome::Rejected(RejectReason::TooLong));

    assert_eq!(backend.chat_count(), 0);
    assert!(harness.engine.messages().is_empty());
    assert_eq!(harness.engine.session().message_count, 0);
    assert!(harness.events.contains(&EventPayload::InputRejected {
        reason: RejectReason::Empty
    }));
    assert!(harness.events.contains(&EventPayload::InputRejected {
        reason: RejectReason::TooLong
    }));
}

/// Only one chat request can be in flight per control activation.
#[tokio::test]
async fn concurrent_send_is_rejected_while_locked() {
    let backend = Arc::new(GatedBackend::new("Hi there!"));
    let harness = harness(backend.clone(), quiet_config());

    let engine = harness.engine.clone();
    let task = tokio::spawn(async move { engine.send_message("first").await });
    backend.entered.notified().await;

    let outcome = harness.engine.send_message("second").await.expect("send");
    assert_eq!(outcome, SendOutcome::Rejected(RejectReason::Busy));

    backend.release();
    task.await.expect("join").expect("send");
    assert_eq!(backend.chat_requests.lock().len(), 1);
    assert!(harness.events.contains(&EventPayload::SendLocked { locked: true }));
    assert!(harness.events.contains(&EventPayload::SendLocked { locked: false }));
}

/// A 2xx response carrying an error field settles as an apology, terminal.
#[tokio::test]
async fn server_acknowledged_error_renders_apology() {
    let backend = Arc::new(ScriptedBackend::new(vec![ChatScript::ServerError(
        "model overloaded".to_string(),
    )]));
    let harness = harness(backend, quiet_config());

    let outcome = harness.engine.send_message("Hello").await.expect("send");
    assert!(matches!(outcome, SendOutcome::Delivered { .. }));

    let messages = harness.engine.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].state, MessageState::Settled);
    assert_eq!(messages[1].state, MessageState::Settled);
    assert!(messages[1].plain_text.contains("something went wrong"));
}

/// Transport failure fails the original outbound message; nothing queues.
#[tokio::test]
async fn transport_failure_marks_message_failed() {
    let backend = Arc::new(FailingBackend::new());
    let harness = harness(backend, quiet_config());

    let outcome = harness.engine.send_message("Hello").await.expect("send");
    let SendOutcome::Failed { message_id } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };

    let messages = harness.engine.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, message_id);
    assert_eq!(messages[0].state, MessageState::Failed);
    // Attempts count, not successes.
    assert_eq!(harness.engine.session().message_count, 1);
    assert!(harness.events.contains(&EventPayload::MessageFailed {
        message_id: message_id.clone()
    }));
}

/// A malformed 2xx body is a transport failure, not a settled reply.
#[tokio::test]
async fn malformed_body_fails_the_message() {
    let backend = Arc::new(ScriptedBackend::new(vec![ChatScript::Malformed]));
    let harness = harness(backend, quiet_config());

    let outcome = harness.engine.send_message("Hello").await.expect("send");
    assert!(matches!(outcome, SendOutcome::Failed { .. }));
    assert_eq!(harness.engine.messages()[0].state, MessageState::Failed);
}

/// Retry success removes the failed entry and never duplicates it.
#[tokio::test]
async fn retry_success_replaces_the_failed_entry() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        ChatScript::Transport,
        ChatScript::Reply("Hi there!".to_string()),
    ]));
    let harness = harness(backend, quiet_config());

    let outcome = harness.engine.send_message("Hello").await.expect("send");
    let SendOutcome::Failed { message_id } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };

    let outcome = harness
        .engine
        .retry_message(&message_id)
        .await
        .expect("retry");
    assert!(matches!(outcome, SendOutcome::Delivered { .. }));

    let messages = harness.engine.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].state, MessageState::Settled);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].state, MessageState::Settled);
    assert!(messages.iter().all(|m| m.state != MessageState::Failed));
    assert!(harness.events.contains(&EventPayload::MessageRemoved {
        message_id: message_id.clone()
    }));
}

/// Renewed retry failure leaves exactly one failed entry.
#[tokio::test]
async fn retry_failure_keeps_a_single_failed_entry() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        ChatScript::Transport,
        ChatScript::Status(502),
    ]));
    let harness = harness(backend.clone(), quiet_config());

    let SendOutcome::Failed { message_id } =
        harness.engine.send_message("Hello").await.expect("send")
    else {
        panic!("expected failure");
    };
    let outcome = harness
        .engine
        .retry_message(&message_id)
        .await
        .expect("retry");
    assert_eq!(
        outcome,
        SendOutcome::Failed {
            message_id: message_id.clone()
        }
    );

    let failed: Vec<_> = harness
        .engine
        .messages()
        .into_iter()
        .filter(|m| m.state == MessageState::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, message_id);
    // Both attempts carried the identical payload.
    let requests = backend.chat_requests.lock();
    assert_eq!(requests[0].message, requests[1].message);
}

/// Retrying a settled message is an error, not a silent resend.
#[tokio::test]
async fn retry_of_settled_message_is_rejected() {
    let backend = Arc::new(FixedBackend::new("Hi there!"));
    let harness = harness(backend, quiet_config());

    let SendOutcome::Delivered { user_id, .. } =
        harness.engine.send_message("Hello").await.expect("send")
    else {
        panic!("expected delivery");
    };
    let err = harness
        .engine
        .retry_message(&user_id)
        .await
        .expect_err("must reject");
    assert!(matches!(err, GigiCoreError::NotRetryable(_)));
}

/// Voice on: a settled reply schedules fire-and-forget playback.
#[tokio::test]
async fn reply_triggers_autoplay_when_voice_enabled() {
    let backend = Arc::new(FixedBackend::new("Hi there!"));
    let mut config = GigiConfig::default();
    config.voice.enabled_by_default = true;
    let harness = harness(backend.clone(), config);
    assert!(harness.engine.voice_enabled());

    let SendOutcome::Delivered { assistant_id, .. } =
        harness.engine.send_message("Hello").await.expect("send")
    else {
        panic!("expected delivery");
    };

    let sink = harness.sink.clone();
    wait_until(move || sink.stats.starts() == 1).await;
    assert_eq!(backend.tts_count(), 1);
    assert!(harness.events.contains(&EventPayload::PlaybackStarted {
        message_id: assistant_id
    }));
}

/// Voice off: no synthesis request is issued for a reply.
#[tokio::test]
async fn reply_does_not_autoplay_when_voice_disabled() {
    let backend = Arc::new(FixedBackend::new("Hi there!"));
    let harness = harness(backend.clone(), quiet_config());

    harness.engine.send_message("Hello").await.expect("send");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.tts_count(), 0);
    assert_eq!(harness.sink.stats.starts(), 0);
}

/// Reset clears the ledger and rotates the session identity.
#[tokio::test]
async fn reset_clears_ledger_and_rotates_session() {
    let backend = Arc::new(FixedBackend::new("Hi there!"));
    let harness = harness(backend, quiet_config());

    harness.engine.send_message("Hello").await.expect("send");
    let old_session = harness.engine.session_id();

    harness.engine.reset();

    assert!(harness.engine.messages().is_empty());
    let session = harness.engine.session();
    assert_eq!(session.message_count, 0);
    assert!(session.session_id != old_session);
    assert!(harness.events.contains(&EventPayload::SessionReset {
        session_id: session.session_id
    }));
}
