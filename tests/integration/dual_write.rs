//! Integration tests for the dual-write send path.
//!
//! Every send goes through two independent backends with no shared
//! transaction. These tests cover the full partial-failure matrix and
//! the compose-field rule: only the structured write's success clears
//! the draft.

use std::sync::Arc;

use starchat::api::{InMemoryBackend, MessageApi};
use starchat::send::{Composer, MessageSender, WritePath};
use starchat_proto::message::{RoomId, ValidationError};

fn sender(backend: &Arc<InMemoryBackend>) -> MessageSender<InMemoryBackend, InMemoryBackend> {
    MessageSender::new(Arc::clone(backend), Arc::clone(backend))
}

#[tokio::test]
async fn both_succeed() {
    let backend = Arc::new(InMemoryBackend::new());
    let outcome = sender(&backend)
        .send(RoomId(1), "hi", "ada", "Ada L.")
        .await
        .unwrap();

    assert!(outcome.clears_compose());
    assert!(!outcome.partial_failure());
    assert!(outcome.failed_paths().is_empty());
    // Both paths stored their own projection of the message.
    assert_eq!(backend.fetch_messages(RoomId(1)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn rest_fails_insert_still_happens() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.fail_rest(true);
    let outcome = sender(&backend)
        .send(RoomId(1), "hi", "ada", "Ada L.")
        .await
        .unwrap();

    assert!(!outcome.clears_compose());
    assert!(outcome.partial_failure());
    assert_eq!(outcome.failed_paths(), vec![WritePath::Rest]);
    assert_eq!(backend.rest_posts(), 1);
    assert_eq!(backend.direct_inserts(), 1);
    assert_eq!(backend.fetch_messages(RoomId(1)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn insert_fails_rest_still_clears_compose() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.fail_insert(true);
    let outcome = sender(&backend)
        .send(RoomId(1), "hi", "ada", "Ada L.")
        .await
        .unwrap();

    assert!(outcome.clears_compose());
    assert!(outcome.partial_failure());
    assert_eq!(outcome.failed_paths(), vec![WritePath::DirectInsert]);
}

#[tokio::test]
async fn both_fail_draft_survives() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.fail_rest(true);
    backend.fail_insert(true);

    let mut composer = Composer::new();
    composer.set_text("important draft");
    let outcome = sender(&backend)
        .send(RoomId(1), composer.text(), "ada", "Ada L.")
        .await
        .unwrap();
    composer.apply_outcome(&outcome);

    assert!(!outcome.partial_failure());
    assert_eq!(
        outcome.failed_paths(),
        vec![WritePath::Rest, WritePath::DirectInsert]
    );
    assert_eq!(composer.text(), "important draft");
    // Both paths were attempted despite both failing.
    assert_eq!(backend.rest_posts(), 1);
    assert_eq!(backend.direct_inserts(), 1);
}

#[tokio::test]
async fn validation_failure_reaches_no_backend() {
    let backend = Arc::new(InMemoryBackend::new());
    let err = sender(&backend)
        .send(RoomId(1), "", "ada", "Ada L.")
        .await
        .unwrap_err();

    assert_eq!(err, ValidationError::Empty);
    assert_eq!(backend.rest_posts(), 0);
    assert_eq!(backend.direct_inserts(), 0);
}

#[tokio::test]
async fn retry_after_rest_failure_clears_the_draft() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.fail_rest(true);
    let sender = sender(&backend);

    let mut composer = Composer::new();
    composer.set_text("hi");
    let outcome = sender
        .send(RoomId(1), composer.text(), "ada", "Ada L.")
        .await
        .unwrap();
    composer.apply_outcome(&outcome);
    assert_eq!(composer.text(), "hi");

    backend.fail_rest(false);
    let outcome = sender
        .send(RoomId(1), composer.text(), "ada", "Ada L.")
        .await
        .unwrap();
    composer.apply_outcome(&outcome);
    assert_eq!(composer.text(), "");
}
