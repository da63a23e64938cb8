//! EventSubscriber port - Interface for subscribing to domain events.
//!
//! This port defines how handlers register interest in domain events
//! without knowing about the underlying transport mechanism.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Handler for processing domain events.
///
/// Implementations should be:
/// - **Idempotent** - Safe to call multiple times with same event
/// - **Quick** - The bus awaits each handler in turn; slow work belongs in a queue
/// - **Isolated** - Errors are logged by the bus and affect no other handler
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Handle returned by `subscribe`, used to unregister exactly that handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    topic: String,
    id: u64,
}

impl SubscriptionToken {
    pub fn new(topic: impl Into<String>, id: u64) -> Self {
        Self {
            topic: topic.into(),
            id,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.topic, self.id)
    }
}

/// Port for subscribing to domain events.
///
/// Handlers for a topic are invoked in registration order.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to a topic.
    fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) -> SubscriptionToken;

    /// Remove a previously registered handler. Returns false if it was
    /// already gone.
    fn unsubscribe(&self, token: &SubscriptionToken) -> bool;

    /// Number of handlers currently registered on a topic.
    fn subscriber_count(&self, topic: &str) -> usize;
}

/// Combined trait for event bus implementations.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}
