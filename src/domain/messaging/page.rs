//! Backward-cursor pagination types.
//!
//! A page lists messages newest first. Its `prev_cursor` is the `created_at`
//! of the oldest message on the page and is used as the exclusive upper bound
//! (`created_at < cursor`) of the next, older page.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::foundation::{Timestamp, ValidationError};

use super::Message;

/// Pagination cursor: a message `created_at`, exclusive.
pub type Cursor = Timestamp;

/// Number of messages per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Take(u32);

impl Take {
    pub const DEFAULT: u32 = 15;
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 50;

    /// Strict constructor.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside `[1, 50]`.
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::out_of_range(
                "take",
                Self::MIN as i64,
                Self::MAX as i64,
                value as i64,
            ));
        }
        Ok(Self(value))
    }

    /// Lenient constructor for the API edge: missing means 15, anything
    /// else is clamped into `[1, 50]`.
    pub fn clamped(raw: Option<i64>) -> Self {
        match raw {
            None => Self::default(),
            Some(v) => Self(v.clamp(Self::MIN as i64, Self::MAX as i64) as u32),
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl Default for Take {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<u32> for Take {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Take> for u32 {
    fn from(take: Take) -> Self {
        take.0
    }
}

/// One page of history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Newest first.
    pub messages: Vec<Message>,
    /// `created_at` of the oldest message on this page, `None` when empty.
    pub prev_cursor: Option<Cursor>,
}

impl Page {
    /// Builds a page from messages already ordered newest first.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let prev_cursor = messages.last().map(Message::created_at);
        Self {
            messages,
            prev_cursor,
        }
    }

    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            prev_cursor: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// Store ordering: `created_at` descending, ties broken by id descending.
pub fn newest_first(a: &Message, b: &Message) -> Ordering {
    b.created_at()
        .cmp(&a.created_at())
        .then_with(|| b.id().cmp(&a.id()))
}
