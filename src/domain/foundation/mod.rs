//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, events and error types
//! that form the vocabulary of the messaging domain.

mod auth;
mod errors;
mod events;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{MessageId, UserId};
pub use timestamp::Timestamp;
