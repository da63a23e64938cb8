//! HTTP middleware for axum.
//!
//! - `auth` - Session authentication middleware and extractors

pub mod auth;

pub use auth::{
    auth_middleware, AuthRejection, AuthState, RequireAuth, TransportContext, SESSION_COOKIE,
    TOKEN_QUERY_PARAM,
};
