//! In-process event bus.
//!
//! The bus is an explicitly constructed dependency shared through `Arc`; the
//! notification service publishes into it and every live channel subscribes
//! to it. Nothing is persisted: a handler registered after a publish never
//! sees that event.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::EventEnvelope;
use crate::ports::{EventHandler, EventPublisher, EventSubscriber, SubscriptionToken};

struct Registration {
    id: u64,
    handler: Arc<dyn EventHandler>,
}

/// In-memory event bus.
///
/// Features:
/// - Handlers per topic, invoked in registration order
/// - Token-based unsubscribe
/// - Handler errors are logged and swallowed
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// let token = bus.subscribe(MESSAGE_ADDED, handler);
/// bus.publish(envelope).await;
/// bus.unsubscribe(&token);
/// ```
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl InMemoryEventBus {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Total handlers across all topics.
    pub fn total_subscribers(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) {
        // Clone handlers to release lock before await points
        let topic_handlers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self
                .handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            handlers
                .get(&event.event_type)
                .map(|regs| regs.iter().map(|r| Arc::clone(&r.handler)).collect())
                .unwrap_or_default()
        };

        tracing::trace!(
            event_type = %event.event_type,
            event_id = %event.event_id,
            handlers = topic_handlers.len(),
            "Publishing event"
        );

        for handler in topic_handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    event_id = %event.event_id,
                    error = %e,
                    "Event handler failed"
                );
            }
        }
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) -> SubscriptionToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        handlers
            .entry(topic.to_string())
            .or_default()
            .push(Registration { id, handler });
        SubscriptionToken::new(topic, id)
    }

    fn unsubscribe(&self, token: &SubscriptionToken) -> bool {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(regs) = handlers.get_mut(token.topic()) else {
            return false;
        };
        let before = regs.len();
        regs.retain(|r| r.id != token.id());
        let removed = regs.len() != before;
        if regs.is_empty() {
            handlers.remove(token.topic());
        }
        removed
    }

    fn subscriber_count(&self, topic: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainError, ErrorCode};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn test_envelope(event_type: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, "agg-1", json!({}))
    }

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    struct RecordingHandler {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            self.log.lock().unwrap().push(self.label);
            Ok(())
        }
        fn name(&self) -> &'static str {
            "RecordingHandler"
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::InternalError, "Handler failed"))
        }
        fn name(&self) -> &'static str {
            "FailingHandler"
        }
    }

    #[tokio::test]
    async fn handler_receives_published_event() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe("message-added", Arc::new(CountingHandler(counter.clone())));
        bus.publish(test_envelope("message-added")).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let bus = InMemoryEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            bus.subscribe(
                "message-read",
                Arc::new(RecordingHandler {
                    label,
                    log: log.clone(),
                }),
            );
        }
        bus.publish(test_envelope("message-read")).await;

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn other_topics_are_not_delivered() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe("message-added", Arc::new(CountingHandler(counter.clone())));
        bus.publish(test_envelope("message-read")).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_delivery() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe("message-added", Arc::new(FailingHandler));
        bus.subscribe("message-added", Arc::new(CountingHandler(counter.clone())));
        bus.publish(test_envelope("message-added")).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_that_handler() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = bus.subscribe("message-added", Arc::new(CountingHandler(counter.clone())));
        let _second = bus.subscribe("message-added", Arc::new(CountingHandler(counter.clone())));

        assert!(bus.unsubscribe(&first));
        assert!(!bus.unsubscribe(&first));
        assert_eq!(bus.subscriber_count("message-added"), 1);

        bus.publish(test_envelope("message-added")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn late_subscriber_does_not_see_earlier_events() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.publish(test_envelope("message-added")).await;
        bus.subscribe("message-added", Arc::new(CountingHandler(counter.clone())));

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_topics_are_dropped() {
        let bus = InMemoryEventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let token = bus.subscribe("message-read", Arc::new(CountingHandler(counter)));
        bus.unsubscribe(&token);

        assert_eq!(bus.total_subscribers(), 0);
    }
}
