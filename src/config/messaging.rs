//! Messaging configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::messaging::normalize_email;

/// Live push and development settings
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Events buffered per live connection before it is flagged as lagged
    #[serde(default = "default_subscriber_queue_capacity")]
    pub subscriber_queue_capacity: usize,

    /// Comma-separated emails registered at startup when running in memory
    pub seed_users: Option<String>,
}

impl MessagingConfig {
    pub fn seed_user_emails(&self) -> Vec<String> {
        self.seed_users
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subscriber_queue_capacity == 0 || self.subscriber_queue_capacity > 65_536 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        for email in self.seed_user_emails() {
            normalize_email(&email).map_err(|_| ValidationError::InvalidSeedUser(email.clone()))?;
        }
        Ok(())
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: default_subscriber_queue_capacity(),
            seed_users: None,
        }
    }
}

fn default_subscriber_queue_capacity() -> usize {
    256
}
