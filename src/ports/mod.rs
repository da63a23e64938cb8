//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `MessageStore` - Durable message record
//! - `UserDirectory` - Participant identity lookup
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Fire-and-forget publishing
//! - `EventSubscriber` - Token-based handler registration
//! - `EventHandler` - Handler that processes incoming events
//!
//! ## Auth Ports
//!
//! - `SessionValidator` - Session token to user

mod event_publisher;
mod event_subscriber;
mod message_store;
mod session_validator;
mod user_directory;

pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber, SubscriptionToken};
pub use message_store::{MessageQuery, MessageStore};
pub use session_validator::SessionValidator;
pub use user_directory::UserDirectory;
