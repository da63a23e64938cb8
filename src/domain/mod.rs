//! Domain layer - pure types with no infrastructure dependencies.

pub mod foundation;
pub mod messaging;
