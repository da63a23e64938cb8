//! Local, deduplicated view of one conversation.

use crate::domain::foundation::{MessageId, Timestamp, UserId};
use crate::domain::messaging::Message;

/// Messages keyed by id, kept sorted by `created_at` descending.
///
/// Equal timestamps keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct MessageList {
    messages: Vec<Message>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites by id, then re-sorts.
    ///
    /// The incoming copy replaces the cached one, except that a read mark
    /// already known locally survives an incoming copy without one: the
    /// server never clears `read_at`, so such a copy is stale.
    pub fn merge<I>(&mut self, incoming: I)
    where
        I: IntoIterator<Item = Message>,
    {
        for message in incoming {
            match self.position(&message.id()) {
                Some(idx) => {
                    let known = self.messages[idx].read_at();
                    self.messages[idx] = message;
                    if let Some(at) = known {
                        self.messages[idx].mark_read(at);
                    }
                }
                None => self.messages.push(message),
            }
        }
        self.messages
            .sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    }

    /// Sets `read_at` to the server's value. Returns false for unknown ids.
    pub fn apply_read(&mut self, id: &MessageId, read_at: Timestamp) -> bool {
        let Some(message) = self.get_mut(id) else {
            return false;
        };
        if message.read_at() != Some(read_at) {
            message.revert_read();
            message.mark_read(read_at);
        }
        true
    }

    /// Clears `read_at` if it still holds `expected`.
    pub fn undo_read(&mut self, id: &MessageId, expected: Timestamp) -> bool {
        match self.get_mut(id) {
            Some(message) if message.read_at() == Some(expected) => {
                message.revert_read();
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.position(id).map(|idx| &self.messages[idx])
    }

    pub fn get_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.position(id).map(move |idx| &mut self.messages[idx])
    }

    pub fn newest(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn unread_count_for(&self, viewer: &UserId) -> usize {
        self.messages
            .iter()
            .filter(|m| m.is_unread_for(viewer))
            .count()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id() == *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::messaging::MessageContent;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn message_at(base: Timestamp, offset_ms: i64, read: bool) -> Message {
        let created_at = base.plus_millis(offset_ms);
        Message::reconstitute(
            MessageId::new(),
            UserId::new(),
            UserId::new(),
            MessageContent::new(format!("at {}", offset_ms)).unwrap(),
            created_at,
            read.then(|| created_at.plus_millis(1)),
        )
    }

    fn assert_invariants(list: &MessageList) {
        let ids: HashSet<_> = list.as_slice().iter().map(|m| m.id()).collect();
        assert_eq!(ids.len(), list.len(), "duplicate ids");
        for pair in list.as_slice().windows(2) {
            assert!(pair[0].created_at() >= pair[1].created_at(), "not newest first");
        }
    }

    #[test]
    fn duplicate_delivery_collapses() {
        let base = Timestamp::now();
        let m = message_at(base, 0, false);
        let mut list = MessageList::new();

        list.merge(vec![m.clone()]);
        list.merge(vec![m.clone(), m]);

        assert_eq!(list.len(), 1);
    }

    #[test]
    fn later_copy_with_read_mark_wins() {
        let base = Timestamp::now();
        let unread = message_at(base, 0, false);
        let mut read = unread.clone();
        read.mark_read(base.plus_millis(5));

        let mut list = MessageList::new();
        list.merge(vec![unread]);
        list.merge(vec![read.clone()]);

        assert_eq!(list.get(&read.id()).unwrap().read_at(), read.read_at());
    }

    #[test]
    fn stale_unread_copy_keeps_local_read_mark() {
        let base = Timestamp::now();
        let unread = message_at(base, 0, false);
        let mut list = MessageList::new();
        list.merge(vec![unread.clone()]);
        list.apply_read(&unread.id(), base.plus_millis(9));

        list.merge(vec![unread.clone()]);

        assert_eq!(
            list.get(&unread.id()).unwrap().read_at(),
            Some(base.plus_millis(9))
        );
    }

    #[test]
    fn read_receipt_for_unknown_message_is_ignored() {
        let mut list = MessageList::new();
        assert!(!list.apply_read(&MessageId::new(), Timestamp::now()));
        assert!(list.is_empty());
    }

    #[test]
    fn undo_read_only_clears_expected_value() {
        let base = Timestamp::now();
        let m = message_at(base, 0, false);
        let mut list = MessageList::new();
        list.merge(vec![m.clone()]);
        list.apply_read(&m.id(), base.plus_millis(3));

        assert!(!list.undo_read(&m.id(), base.plus_millis(4)));
        assert!(list.undo_read(&m.id(), base.plus_millis(3)));
        assert!(list.get(&m.id()).unwrap().read_at().is_none());
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let base = Timestamp::now();
        let first = message_at(base, 0, false);
        let second = message_at(base, 0, false);
        let mut list = MessageList::new();

        list.merge(vec![first.clone()]);
        list.merge(vec![second.clone()]);

        assert_eq!(list.as_slice()[0].id(), first.id());
        assert_eq!(list.as_slice()[1].id(), second.id());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Property tests
    // ════════════════════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn any_ingest_sequence_stays_deduplicated_and_sorted(
            offsets in prop::collection::vec((0i64..20, any::<bool>()), 1..30),
            batches in prop::collection::vec(prop::collection::vec(0usize..30, 0..10), 1..20),
        ) {
            let base = Timestamp::now();
            let pool: Vec<Message> = offsets
                .iter()
                .map(|(offset, read)| message_at(base, *offset, *read))
                .collect();

            let mut list = MessageList::new();
            let mut ingested = HashSet::new();

            for batch in batches {
                let messages: Vec<Message> = batch
                    .iter()
                    .map(|i| pool[i % pool.len()].clone())
                    .collect();
                ingested.extend(messages.iter().map(|m| m.id()));
                list.merge(messages);

                assert_invariants(&list);
                prop_assert_eq!(list.len(), ingested.len());
            }
        }

        #[test]
        fn unread_count_never_double_counts(
            repeats in 1usize..5,
            count in 1usize..10,
        ) {
            let base = Timestamp::now();
            let viewer = UserId::new();
            let incoming: Vec<Message> = (0..count)
                .map(|i| {
                    Message::new(
                        MessageId::new(),
                        UserId::new(),
                        viewer,
                        MessageContent::new("hi").unwrap(),
                        base.plus_millis(i as i64),
                    )
                    .unwrap()
                })
                .collect();

            let mut list = MessageList::new();
            for _ in 0..repeats {
                list.merge(incoming.clone());
            }

            prop_assert_eq!(list.unread_count_for(&viewer), count);
        }
    }
}
