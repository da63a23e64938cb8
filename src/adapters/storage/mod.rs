//! Storage adapters.
//!
//! - `InMemoryMessageStore` - users and messages held in process memory

mod in_memory_message_store;

pub use in_memory_message_store::InMemoryMessageStore;
