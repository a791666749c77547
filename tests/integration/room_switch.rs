//! Integration tests for atomic room switching.
//!
//! Verifies the switch contract end to end:
//! 1. At most one subscription channel is open at any time, and the
//!    previous channel closes before the next one opens.
//! 2. A late event for a previously active room never lands in the
//!    current timeline.
//! 3. A failed history fetch leaves the room empty and is reported.

use std::sync::Arc;

use chrono::DateTime;
use starchat::api::InMemoryBackend;
use starchat::realtime::LoopbackHub;
use starchat::room::{RoomEvent, RoomView};
use starchat_proto::message::{Message, RoomId};
use tokio::sync::mpsc;

fn message(id: i64, room: i64, user: &str, millis: i64) -> Message {
    Message {
        id: Some(id),
        chat_id: RoomId(room),
        user_name: user.to_string(),
        full_name: None,
        text: format!("m{id}"),
        timestamp: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
    }
}

fn new_view(
    backend: &Arc<InMemoryBackend>,
    hub: &Arc<LoopbackHub>,
) -> (
    RoomView<InMemoryBackend, LoopbackHub, InMemoryBackend>,
    mpsc::Receiver<RoomEvent>,
) {
    RoomView::new(Arc::clone(backend), Arc::clone(hub), Arc::clone(backend))
}

/// Drains events until the history outcome for the current switch
/// arrives.
async fn wait_history(rx: &mut mpsc::Receiver<RoomEvent>) -> RoomEvent {
    loop {
        match rx.recv().await {
            Some(event @ (RoomEvent::HistoryLoaded { .. } | RoomEvent::HistoryFailed { .. })) => {
                return event;
            }
            Some(_) => {}
            None => panic!("event channel closed before history outcome"),
        }
    }
}

#[tokio::test]
async fn stale_event_for_previous_room_is_discarded() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_message(message(1, 1, "ada", 100));
    backend.seed_message(message(2, 2, "bob", 100));
    let hub = Arc::new(LoopbackHub::new());
    let (view, mut rx) = new_view(&backend, &hub);

    view.switch_room(RoomId(1)).await;
    wait_history(&mut rx).await;
    view.switch_room(RoomId(2)).await;
    wait_history(&mut rx).await;

    // A producer that has not noticed the switch yet.
    hub.publish(message(99, 1, "ada", 300));
    hub.publish(message(100, 2, "bob", 400));

    // Only the room-2 event appends; the stale one is dropped silently.
    assert_eq!(rx.recv().await, Some(RoomEvent::Appended { room: RoomId(2) }));
    let ids: Vec<_> = view.messages().await.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![Some(2), Some(100)]);
}

#[tokio::test]
async fn at_most_one_channel_open_across_switches() {
    let backend = Arc::new(InMemoryBackend::new());
    let hub = Arc::new(LoopbackHub::new());
    let (view, mut rx) = new_view(&backend, &hub);

    for room in 1..=3 {
        view.switch_room(RoomId(room)).await;
        wait_history(&mut rx).await;
        assert_eq!(hub.open_channels(), 1);
    }

    view.close().await;
    assert_eq!(hub.open_channels(), 0);
}

#[tokio::test]
async fn switch_replaces_the_timeline_wholesale() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_message(message(1, 1, "ada", 100));
    let hub = Arc::new(LoopbackHub::new());
    let (view, mut rx) = new_view(&backend, &hub);

    view.switch_room(RoomId(1)).await;
    wait_history(&mut rx).await;
    assert_eq!(view.messages().await.len(), 1);

    view.switch_room(RoomId(5)).await;
    wait_history(&mut rx).await;
    assert!(view.messages().await.is_empty());
    assert_eq!(view.current_room().await, Some(RoomId(5)));
}

#[tokio::test]
async fn failed_history_leaves_the_room_empty() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_message(message(1, 1, "ada", 100));
    backend.fail_fetch(true);
    let hub = Arc::new(LoopbackHub::new());
    let (view, mut rx) = new_view(&backend, &hub);

    view.switch_room(RoomId(1)).await;
    let outcome = wait_history(&mut rx).await;
    assert!(matches!(outcome, RoomEvent::HistoryFailed { room, .. } if room == RoomId(1)));
    assert!(view.messages().await.is_empty());

    // Live sync still works while history is unavailable.
    hub.publish(message(2, 1, "bob", 200));
    assert_eq!(rx.recv().await, Some(RoomEvent::Appended { room: RoomId(1) }));
    assert_eq!(view.messages().await.len(), 1);
}
