//! Property tests for the dual-channel merge.
//!
//! Uses proptest to verify that any interleaving of history batches
//! and live events, with overlapping identity keys, yields each
//! distinct message of the active room exactly once.

use std::collections::HashSet;

use chrono::DateTime;
use proptest::prelude::*;
use starchat::store::MessageStore;
use starchat_proto::message::{Message, MessageKey, RoomId};

/// Messages drawn from a deliberately small space so ids, timestamps,
/// and senders collide often.
fn arb_message() -> impl Strategy<Value = Message> {
    (
        prop::option::of(0i64..16),
        1i64..=2,
        0i64..500,
        "[ab]",
    )
        .prop_map(|(id, room, millis, user)| Message {
            id,
            chat_id: RoomId(room),
            user_name: user,
            full_name: None,
            text: "x".to_string(),
            timestamp: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
        })
}

proptest! {
    #[test]
    fn merge_yields_each_message_exactly_once(
        messages in prop::collection::vec(arb_message(), 0..48),
        interleaving in any::<u64>(),
    ) {
        let mut store = MessageStore::new();
        store.reset(RoomId(1));

        let mut expected: HashSet<MessageKey> = HashSet::new();
        for (i, message) in messages.iter().enumerate() {
            if message.chat_id == RoomId(1) {
                expected.insert(message.key());
            }
            // One bit per message decides which channel delivers it.
            if (interleaving >> (i % 64)) & 1 == 0 {
                store.ingest_history(vec![message.clone()]);
            } else {
                store.ingest_live(message.clone());
            }
        }

        prop_assert_eq!(store.len(), expected.len());
        let seen: HashSet<MessageKey> = store.messages().iter().map(Message::key).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn reingesting_the_whole_timeline_changes_nothing(
        messages in prop::collection::vec(arb_message(), 0..48),
    ) {
        let mut store = MessageStore::new();
        store.reset(RoomId(1));
        store.ingest_history(messages.clone());
        let before: Vec<Message> = store.messages().to_vec();

        store.ingest_history(messages.clone());
        for message in messages {
            store.ingest_live(message);
        }

        prop_assert_eq!(store.messages(), before.as_slice());
    }

    #[test]
    fn foreign_room_messages_never_land(
        messages in prop::collection::vec(arb_message(), 0..48),
    ) {
        let mut store = MessageStore::new();
        store.reset(RoomId(2));
        store.ingest_history(messages);
        prop_assert!(store.messages().iter().all(|m| m.chat_id == RoomId(2)));
    }
}
