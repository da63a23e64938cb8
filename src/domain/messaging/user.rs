//! Users and the ways a conversation partner can be referenced.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{UserId, ValidationError};

/// A registered user. Conversations are addressed by the partner's email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

impl User {
    /// Creates a user after normalizing the email.
    pub fn new(id: UserId, email: impl AsRef<str>) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            email: normalize_email(email.as_ref())?,
        })
    }
}

/// Reference to the other participant of a conversation.
///
/// Callers may name the partner by id or by email; the store resolves either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartnerRef {
    Id(UserId),
    Email(String),
}

impl PartnerRef {
    /// Interprets a raw path/body value: UUIDs are ids, anything else must be an email.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<UserId>() {
            return Ok(PartnerRef::Id(id));
        }
        Ok(PartnerRef::Email(normalize_email(raw)?))
    }
}

impl fmt::Display for PartnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartnerRef::Id(id) => write!(f, "{}", id),
            PartnerRef::Email(email) => write!(f, "{}", email),
        }
    }
}

/// Lowercases and trims an email, rejecting obviously malformed values.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::empty_field("email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ValidationError::invalid_format("email", "expected local@domain")),
    }
}
