//! EventPublisher port - Interface for publishing domain events.
//!
//! This port defines how the application publishes events without knowing
//! about the underlying transport mechanism.

use async_trait::async_trait;

use crate::domain::foundation::EventEnvelope;

/// Port for publishing domain events.
///
/// Publishing is fire-and-forget: implementations deliver to the handlers
/// registered at the moment of the call, contain handler failures, and never
/// report them back to the publisher. Nothing is persisted or replayed.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event to every current subscriber of its type.
    async fn publish(&self, event: EventEnvelope);
}
