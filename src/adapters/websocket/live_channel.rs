//! Per-connection live stream of messaging events.
//!
//! ```text
//! EventBus ──message-added──▶ QueueForwarder(filter: participant) ─┐
//!          ──message-read───▶ QueueForwarder(no filter) ───────────┤
//!                                                                  ▼
//!                                          bounded mpsc ──▶ LiveSubscriptionChannel::recv
//! ```
//!
//! Forwarders never await the consumer. When a queue is full the event is
//! dropped, the channel is flagged as lagged and the next `recv` reports
//! `ChannelError` so the client refetches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope, UserId};
use crate::domain::messaging::{
    MessageAdded, MessageRead, MessagingError, MESSAGE_ADDED, MESSAGE_READ,
};
use crate::ports::{EventHandler, EventSubscriber, SubscriptionToken};

/// Event relayed to one connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    MessageAdded(MessageAdded),
    MessageRead(MessageRead),
}

/// Bus handler that copies events into one connection's queue.
pub struct QueueForwarder {
    viewer: UserId,
    queue: mpsc::Sender<LiveEvent>,
    lagged: Arc<AtomicBool>,
}

impl QueueForwarder {
    fn decode(&self, event: &EventEnvelope) -> Result<Option<LiveEvent>, DomainError> {
        let undecodable = |e: serde_json::Error| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Undecodable {} payload: {}", event.event_type, e),
            )
        };

        match event.event_type.as_str() {
            MESSAGE_ADDED => {
                let added: MessageAdded = event.payload_as().map_err(undecodable)?;
                Ok(added
                    .is_visible_to(&self.viewer)
                    .then_some(LiveEvent::MessageAdded(added)))
            }
            // Read receipts go to everyone; clients match ids they know.
            MESSAGE_READ => Ok(Some(LiveEvent::MessageRead(
                event.payload_as().map_err(undecodable)?,
            ))),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl EventHandler for QueueForwarder {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let Some(live) = self.decode(&event)? else {
            return Ok(());
        };

        match self.queue.try_send(live) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.lagged.store(true, Ordering::SeqCst);
                Err(DomainError::new(
                    ErrorCode::ChannelError,
                    "Live subscriber queue full, event dropped",
                )
                .with_detail("viewer", self.viewer.to_string()))
            }
            // Consumer already gone; unsubscription is on its way.
            Err(TrySendError::Closed(_)) => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "QueueForwarder"
    }
}

/// One logical push stream for one connected viewer.
///
/// Holds two bus subscriptions for its whole life. `close` or drop releases
/// them.
pub struct LiveSubscriptionChannel {
    viewer: UserId,
    bus: Arc<dyn EventSubscriber>,
    tokens: Vec<SubscriptionToken>,
    queue: mpsc::Receiver<LiveEvent>,
    lagged: Arc<AtomicBool>,
    // Dequeued before an overflow was noticed; delivered after the error.
    pending: Option<LiveEvent>,
}

impl LiveSubscriptionChannel {
    /// Registers forwarders for `message-added` and `message-read`.
    pub fn open(bus: Arc<dyn EventSubscriber>, viewer: UserId, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let lagged = Arc::new(AtomicBool::new(false));

        let tokens = [MESSAGE_ADDED, MESSAGE_READ]
            .into_iter()
            .map(|topic| {
                let forwarder = Arc::new(QueueForwarder {
                    viewer,
                    queue: tx.clone(),
                    lagged: lagged.clone(),
                });
                bus.subscribe(topic, forwarder)
            })
            .collect();

        tracing::debug!(viewer = %viewer, capacity, "Live channel opened");

        Self {
            viewer,
            bus,
            tokens,
            queue: rx,
            lagged,
            pending: None,
        }
    }

    pub fn viewer(&self) -> UserId {
        self.viewer
    }

    pub fn is_open(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Next event in publish order.
    ///
    /// Returns `Some(Err(ChannelError))` once per overflow; the channel stays
    /// usable afterwards and no event that made it into the queue is lost.
    /// Returns `None` after `close`.
    pub async fn recv(&mut self) -> Option<Result<LiveEvent, MessagingError>> {
        if let Some(lag) = self.take_lag() {
            return Some(Err(lag));
        }
        if let Some(event) = self.pending.take() {
            return Some(Ok(event));
        }
        if !self.is_open() {
            return None;
        }
        let event = self.queue.recv().await?;
        if let Some(lag) = self.take_lag() {
            self.pending = Some(event);
            return Some(Err(lag));
        }
        Some(Ok(event))
    }

    /// Unregisters both forwarders. Idempotent.
    pub fn close(&mut self) {
        if self.tokens.is_empty() {
            return;
        }
        for token in self.tokens.drain(..) {
            self.bus.unsubscribe(&token);
        }
        self.queue.close();
        tracing::debug!(viewer = %self.viewer, "Live channel closed");
    }

    /// Adapts the channel into a `Stream`; dropping the stream closes it.
    pub fn into_stream(self) -> impl Stream<Item = Result<LiveEvent, MessagingError>> + Send {
        futures::stream::unfold(self, |mut channel| async move {
            let item = channel.recv().await?;
            Some((item, channel))
        })
    }

    fn take_lag(&self) -> Option<MessagingError> {
        self.lagged.swap(false, Ordering::SeqCst).then(|| {
            tracing::warn!(viewer = %self.viewer, "Live channel lagged, events were dropped");
            MessagingError::channel("live subscriber fell behind; events were dropped")
        })
    }
}

impl Drop for LiveSubscriptionChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::domain::foundation::{MessageId, Timestamp};
    use crate::domain::messaging::{Message, MessageContent};
    use crate::ports::EventPublisher;
    use futures::StreamExt;

    fn message(from: UserId, to: UserId) -> Message {
        Message::new(
            MessageId::new(),
            from,
            to,
            MessageContent::new("hi").unwrap(),
            Timestamp::now(),
        )
        .unwrap()
    }

    fn added(message: &Message) -> EventEnvelope {
        EventEnvelope::from_event(&MessageAdded::new(message.clone())).unwrap()
    }

    fn read(id: MessageId) -> EventEnvelope {
        EventEnvelope::from_event(&MessageRead {
            message_id: id,
            read_at: Timestamp::now(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn forwards_only_own_conversations_but_every_read_receipt() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (me, friend, stranger) = (UserId::new(), UserId::new(), UserId::new());
        let mut channel = LiveSubscriptionChannel::open(bus.clone(), me, 8);

        let mine = message(friend, me);
        let theirs = message(friend, stranger);
        bus.publish(added(&theirs)).await;
        bus.publish(added(&mine)).await;
        bus.publish(read(theirs.id())).await;

        match channel.recv().await {
            Some(Ok(LiveEvent::MessageAdded(event))) => assert_eq!(event.message, mine),
            other => panic!("unexpected {:?}", other),
        }
        match channel.recv().await {
            Some(Ok(LiveEvent::MessageRead(event))) => assert_eq!(event.message_id, theirs.id()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn preserves_publish_order() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (me, friend) = (UserId::new(), UserId::new());
        let mut channel = LiveSubscriptionChannel::open(bus.clone(), me, 16);

        let sent: Vec<Message> = (0..5).map(|_| message(friend, me)).collect();
        for m in &sent {
            bus.publish(added(m)).await;
        }

        for expected in &sent {
            match channel.recv().await {
                Some(Ok(LiveEvent::MessageAdded(event))) => {
                    assert_eq!(event.message.id(), expected.id())
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn close_unregisters_both_handlers() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut channel = LiveSubscriptionChannel::open(bus.clone(), UserId::new(), 4);
        assert_eq!(bus.subscriber_count(MESSAGE_ADDED), 1);
        assert_eq!(bus.subscriber_count(MESSAGE_READ), 1);

        channel.close();
        channel.close();

        assert_eq!(bus.subscriber_count(MESSAGE_ADDED), 0);
        assert_eq!(bus.subscriber_count(MESSAGE_READ), 0);
        assert!(channel.recv().await.is_none());
    }

    #[tokio::test]
    async fn drop_unregisters_handlers() {
        let bus = Arc::new(InMemoryEventBus::new());
        {
            let _channel = LiveSubscriptionChannel::open(bus.clone(), UserId::new(), 4);
            assert_eq!(bus.total_subscribers(), 2);
        }
        assert_eq!(bus.total_subscribers(), 0);
    }

    #[tokio::test]
    async fn overflow_reports_channel_error_then_keeps_delivering() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (me, friend) = (UserId::new(), UserId::new());
        let mut channel = LiveSubscriptionChannel::open(bus.clone(), me, 1);

        let first = message(friend, me);
        bus.publish(added(&first)).await;
        bus.publish(added(&message(friend, me))).await;

        assert!(matches!(
            channel.recv().await,
            Some(Err(MessagingError::ChannelError(_)))
        ));
        match channel.recv().await {
            Some(Ok(LiveEvent::MessageAdded(event))) => assert_eq!(event.message, first),
            other => panic!("unexpected {:?}", other),
        }

        let later = message(friend, me);
        bus.publish(added(&later)).await;
        match channel.recv().await {
            Some(Ok(LiveEvent::MessageAdded(event))) => assert_eq!(event.message, later),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn overflow_while_waiting_still_delivers_the_queued_event() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (me, friend) = (UserId::new(), UserId::new());
        let mut channel = LiveSubscriptionChannel::open(bus.clone(), me, 1);

        let receiver = tokio::spawn(async move {
            let first = channel.recv().await;
            let second =
                tokio::time::timeout(std::time::Duration::from_millis(200), channel.recv()).await;
            (first, second)
        });
        // Let the receiver park inside `recv` before anything is published.
        tokio::task::yield_now().await;

        let queued = message(friend, me);
        bus.publish(added(&queued)).await;
        bus.publish(added(&message(friend, me))).await;

        let (first, second) = receiver.await.unwrap();
        assert!(matches!(first, Some(Err(MessagingError::ChannelError(_)))));
        match second {
            Ok(Some(Ok(LiveEvent::MessageAdded(event)))) => assert_eq!(event.message, queued),
            other => panic!("queued event was not delivered: {:?}", other),
        }
    }

    #[tokio::test]
    async fn slow_channel_does_not_block_others() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (me, friend) = (UserId::new(), UserId::new());
        let _slow = LiveSubscriptionChannel::open(bus.clone(), me, 1);
        let mut fast = LiveSubscriptionChannel::open(bus.clone(), friend, 16);

        for _ in 0..5 {
            bus.publish(added(&message(friend, me))).await;
        }

        for _ in 0..5 {
            assert!(matches!(
                fast.recv().await,
                Some(Ok(LiveEvent::MessageAdded(_)))
            ));
        }
    }

    #[tokio::test]
    async fn stream_adapter_yields_events() {
        let bus = Arc::new(InMemoryEventBus::new());
        let me = UserId::new();
        let channel = LiveSubscriptionChannel::open(bus.clone(), me, 4);
        let id = MessageId::new();
        bus.publish(read(id)).await;

        let mut stream = Box::pin(channel.into_stream());
        match stream.next().await {
            Some(Ok(LiveEvent::MessageRead(event))) => assert_eq!(event.message_id, id),
            other => panic!("unexpected {:?}", other),
        }

        drop(stream);
        assert_eq!(bus.total_subscribers(), 0);
    }
}
