use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::TimeDelta;
use palaver_model::{Credential, ErrorKind};
use palaver_test_model::{PresetResponse, TestModelProvider};
use tempfile::TempDir;

use crate::transcript::tests::StepClock;
use crate::{
    DEFAULT_GREETING, Error, Role, Session, SessionBuilder, TranscriptEvent,
};

fn builder(model_provider: &TestModelProvider) -> SessionBuilder {
    SessionBuilder::with_model_provider(model_provider.clone())
        .with_clock(Arc::new(StepClock::new(TimeDelta::milliseconds(1500))))
}

fn session(model_provider: &TestModelProvider) -> Session {
    builder(model_provider).with_credential("sk-test").build()
}

fn contents(transcript: &crate::Transcript) -> Vec<(Role, String)> {
    transcript
        .messages()
        .iter()
        .map(|msg| (msg.role(), msg.content().to_owned()))
        .collect()
}

#[tokio::test]
async fn test_simple_message() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("Hi, what can I do for you?");

    let session = session(&model_provider);
    let reply = session.send_message("Hello").await.unwrap();
    assert_eq!(reply.role(), Role::Assistant);
    assert_eq!(reply.content(), "Hi, what can I do for you?");

    let transcript = session.snapshot().await.unwrap();
    assert_eq!(
        contents(&transcript),
        vec![
            (Role::Assistant, DEFAULT_GREETING.to_owned()),
            (Role::User, "Hello".to_owned()),
            (Role::Assistant, "Hi, what can I do for you?".to_owned()),
        ]
    );

    // The request carries the user message, not the reply.
    let requests = model_provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].request.messages.len(), 2);
    assert_eq!(requests[0].credential.expose(), "sk-test");
}

#[tokio::test]
async fn test_missing_credential_keeps_user_message() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("unused");

    let session = builder(&model_provider).build();
    let err = session.send_message("Hello").await.unwrap_err();
    assert!(matches!(err, Error::MissingCredential));
    assert_eq!(model_provider.request_count(), 0);

    let transcript = session.snapshot().await.unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.last().unwrap().role(), Role::User);
    assert_eq!(transcript.last().unwrap().content(), "Hello");
}

#[tokio::test]
async fn test_set_credential() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("Welcome back.");

    let session = builder(&model_provider).build();
    session
        .set_credential(Some(Credential::new("sk-late")))
        .unwrap();
    session.send_message("Hello").await.unwrap();
    assert_eq!(model_provider.requests()[0].credential.expose(), "sk-late");

    session.set_credential(None).unwrap();
    let err = session.send_message("Again").await.unwrap_err();
    assert!(matches!(err, Error::MissingCredential));
    assert_eq!(model_provider.request_count(), 1);
}

#[tokio::test]
async fn test_upstream_failure_keeps_session_usable() {
    let mut model_provider = TestModelProvider::default();
    model_provider
        .add_response(PresetResponse::with_failure(Some(401), "bad key"));
    model_provider.add_text_response("Better now.");

    let session = session(&model_provider);
    let err = session.send_message("First").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Upstream {
            kind: ErrorKind::Unauthorized,
            status: Some(401),
            ..
        }
    ));

    let reply = session.send_message("Second").await.unwrap();
    assert_eq!(reply.content(), "Better now.");

    let transcript = session.snapshot().await.unwrap();
    assert_eq!(
        contents(&transcript),
        vec![
            (Role::Assistant, DEFAULT_GREETING.to_owned()),
            (Role::User, "First".to_owned()),
            (Role::User, "Second".to_owned()),
            (Role::Assistant, "Better now.".to_owned()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_turns_do_not_interleave() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("a1");
    model_provider.add_text_response("a2");
    model_provider.set_delay(Duration::from_secs(2));

    let session = session(&model_provider);
    let other = session.clone();
    let (first, second) =
        tokio::join!(session.send_message("u1"), other.send_message("u2"));
    assert_eq!(first.unwrap().content(), "a1");
    assert_eq!(second.unwrap().content(), "a2");

    let transcript = session.snapshot().await.unwrap();
    let order: Vec<_> = transcript
        .messages()
        .iter()
        .map(|msg| msg.content().to_owned())
        .collect();
    assert_eq!(order, [DEFAULT_GREETING, "u1", "a1", "u2", "a2"]);

    // The second turn saw the complete first one.
    let requests = model_provider.requests();
    assert_eq!(requests[1].request.messages.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_timeout() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("too late");
    model_provider.set_delay(Duration::from_secs(120));

    let session = session(&model_provider);
    let err = session.send_message("Hello").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Upstream {
            kind: ErrorKind::Timeout,
            status: None,
            ..
        }
    ));
    assert_eq!(session.snapshot().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_reset() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("Sure.");

    let session = builder(&model_provider)
        .with_credential("sk-test")
        .with_greeting("Welcome!")
        .build();
    session.send_message("Plan a trip").await.unwrap();
    let before = session.snapshot().await.unwrap();

    let greeting = session.reset().await.unwrap();
    assert_eq!(greeting.role(), Role::Assistant);
    assert_eq!(greeting.content(), "Welcome!");
    assert!(greeting.timestamp() >= before.last().unwrap().timestamp());

    let transcript = session.snapshot().await.unwrap();
    assert_eq!(transcript.messages(), [greeting]);
    assert_eq!(session.topic().await.unwrap(), "general");
}

#[tokio::test]
async fn test_topic() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("Sure.");

    let session = session(&model_provider);
    assert_eq!(session.topic().await.unwrap(), "general");
    session.send_message("  Rust lifetimes?").await.unwrap();
    assert_eq!(session.topic().await.unwrap(), "Rust");
}

#[tokio::test]
async fn test_save_export_and_load() {
    let dir = TempDir::new().unwrap();
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("Hi there!");

    let session = session(&model_provider);
    session.send_message("Hello world").await.unwrap();
    let saved = session.snapshot().await.unwrap();

    let path = session.save(dir.path().join("logs")).await.unwrap();
    assert_eq!(
        path,
        dir.path().join("logs").join("20240501_Hello_chat_log.json")
    );

    let export = session.export().await.unwrap();
    assert_eq!(export.filename, "20240501_Hello_chat_log.json");
    assert_eq!(export.bytes, std::fs::read(&path).unwrap());

    session.reset().await.unwrap();
    assert_eq!(session.load(&path).await.unwrap(), 3);
    assert_eq!(session.snapshot().await.unwrap(), saved);
}

#[tokio::test]
async fn test_failed_load_keeps_transcript() {
    let dir = TempDir::new().unwrap();
    let model_provider = TestModelProvider::default();

    let session = session(&model_provider);
    let before = session.snapshot().await.unwrap();
    let err = session
        .load(dir.path().join("missing.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(session.snapshot().await.unwrap(), before);
}

#[tokio::test]
async fn test_malformed_load_keeps_transcript() {
    let dir = TempDir::new().unwrap();
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("Hi there!");

    let session = session(&model_provider);
    session.send_message("Hello world").await.unwrap();
    let before = session.snapshot().await.unwrap();

    let path = dir.path().join("broken_chat_log.json");
    std::fs::write(
        &path,
        r#"[
            {"role": "assistant", "content": "Hi", "timestamp": "2024-05-01T09:00:00.000000"},
            {"content": "orphan", "timestamp": "2024-05-01T09:00:01.000000"}
        ]"#,
    )
    .unwrap();

    let err = session.load(&path).await.unwrap_err();
    assert!(matches!(err, Error::MalformedLog { index: Some(1), .. }));
    assert_eq!(session.snapshot().await.unwrap(), before);
}

#[tokio::test]
async fn test_failed_save_keeps_transcript() {
    let dir = TempDir::new().unwrap();
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("Hi there!");

    let session = session(&model_provider);
    session.send_message("Hello world").await.unwrap();
    let before = session.snapshot().await.unwrap();

    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"").unwrap();
    let err = session.save(&blocker).await.unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(session.snapshot().await.unwrap(), before);

    // The session still saves once given a usable directory.
    session.save(dir.path().join("logs")).await.unwrap();
}

#[tokio::test]
async fn test_transcript_events() {
    let dir = TempDir::new().unwrap();
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("Hi!");

    let events = Arc::new(Mutex::new(vec![]));
    let session = builder(&model_provider)
        .with_credential("sk-test")
        .on_transcript_changed({
            let events = Arc::clone(&events);
            move |event| events.lock().unwrap().push(event.clone())
        })
        .build();

    session.send_message("Hello").await.unwrap();
    let path = session.save(dir.path()).await.unwrap();
    let greeting = session.reset().await.unwrap();
    session.load(&path).await.unwrap();

    let events = events.lock().unwrap();
    let summary: Vec<_> = events
        .iter()
        .map(|event| match event {
            TranscriptEvent::Appended(msg) => {
                format!("appended {} {}", msg.role(), msg.content())
            }
            TranscriptEvent::Reset(msg) => format!("reset {}", msg.content()),
            TranscriptEvent::Restored { len } => format!("restored {len}"),
        })
        .collect();
    assert_eq!(
        summary,
        [
            format!("appended assistant {DEFAULT_GREETING}"),
            "appended user Hello".to_owned(),
            "appended assistant Hi!".to_owned(),
            format!("reset {DEFAULT_GREETING}"),
            "restored 3".to_owned(),
        ]
    );
    assert_eq!(events[3], TranscriptEvent::Reset(greeting));
}

#[tokio::test]
async fn test_closed_session() {
    let model_provider = TestModelProvider::default();

    let session = session(&model_provider);
    session.shutdown();
    let err = session.send_message("Hello").await.unwrap_err();
    assert!(matches!(err, Error::SessionClosed));
    assert!(matches!(
        session.snapshot().await.unwrap_err(),
        Error::SessionClosed
    ));
    assert_eq!(model_provider.request_count(), 0);
}
