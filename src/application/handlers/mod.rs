//! Application handlers.

pub mod messaging;
