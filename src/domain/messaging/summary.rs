//! Conversation listing.
//!
//! A summary is recomputed on every fetch: per distinct partner, the newest
//! message plus the number of messages addressed to the viewer that are
//! still unread.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::UserId;

use super::Message;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub partner_id: UserId,
    pub partner_email: String,
    pub last_message: Message,
    pub unread_count: u32,
}

/// Groups `messages` by partner from `viewer`'s perspective.
///
/// Messages not involving `viewer` are ignored. Partners that `email_of`
/// cannot resolve are skipped. Result is ordered by latest message, newest
/// first.
pub fn summarize_conversations<'a, I, F>(
    viewer: &UserId,
    messages: I,
    email_of: F,
) -> Vec<ConversationSummary>
where
    I: IntoIterator<Item = &'a Message>,
    F: Fn(&UserId) -> Option<String>,
{
    let mut latest: HashMap<UserId, &Message> = HashMap::new();
    let mut unread: HashMap<UserId, u32> = HashMap::new();

    for message in messages {
        if !message.involves(viewer) {
            continue;
        }
        let partner = message.partner_of(viewer);

        latest
            .entry(partner)
            .and_modify(|current| {
                if (message.created_at(), message.id()) > (current.created_at(), current.id()) {
                    *current = message;
                }
            })
            .or_insert(message);

        if message.is_unread_for(viewer) {
            *unread.entry(partner).or_default() += 1;
        }
    }

    let mut summaries: Vec<ConversationSummary> = latest
        .into_iter()
        .filter_map(|(partner, message)| {
            email_of(&partner).map(|email| ConversationSummary {
                partner_id: partner,
                partner_email: email,
                last_message: message.clone(),
                unread_count: unread.get(&partner).copied().unwrap_or(0),
            })
        })
        .collect();

    summaries.sort_by(|a, b| {
        super::newest_first(&a.last_message, &b.last_message)
    });
    summaries
}
