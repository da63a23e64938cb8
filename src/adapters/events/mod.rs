//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process publish/subscribe hub

mod in_memory;

pub use in_memory::InMemoryEventBus;
