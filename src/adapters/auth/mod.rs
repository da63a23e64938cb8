//! Authentication adapters.

mod directory_session;

pub use directory_session::DirectorySessionValidator;
