//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session validation against the user directory
//! - `events` - In-process event bus
//! - `http` - REST endpoints, auth middleware and the app router
//! - `postgres` - PostgreSQL message store and user directory
//! - `storage` - In-memory message store
//! - `websocket` - Live subscription channel and the `/api/live` socket

pub mod auth;
pub mod events;
pub mod http;
pub mod postgres;
pub mod storage;
pub mod websocket;

pub use auth::DirectorySessionValidator;
pub use events::InMemoryEventBus;
pub use postgres::{PostgresMessageStore, PostgresUserDirectory};
pub use storage::InMemoryMessageStore;
