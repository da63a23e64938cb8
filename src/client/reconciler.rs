//! Client-side reconciliation of history pages and pushed events.
//!
//! Three sources feed one view: the first page, backfill pages and the live
//! channel. Every source merges by message id, so duplicates and races
//! collapse. The live channel is not replayed after an outage; an error
//! signal triggers a refetch from the newest page until it overlaps what
//! was known before.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;

use crate::adapters::websocket::{LiveEvent, ServerMessage};
use crate::domain::foundation::{MessageId, Timestamp, UserId};
use crate::domain::messaging::{
    Cursor, Message, MessageAdded, MessageRead, MessagingError, Page, PartnerRef, Take,
};

use super::api::ConversationApi;
use super::message_list::MessageList;

/// State transitions reported by the live channel transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    /// (Re)connected. A bare reconnect needs no action.
    Started,
    /// Events may have been lost.
    Error(MessagingError),
    Data(LiveEvent),
}

impl ChannelSignal {
    /// Interprets one frame received over the WebSocket.
    pub fn from_server_message(message: ServerMessage) -> Option<Self> {
        match message {
            ServerMessage::Connected(_) => Some(ChannelSignal::Started),
            ServerMessage::MessageAdded(added) => {
                Some(ChannelSignal::Data(LiveEvent::MessageAdded(MessageAdded {
                    message: added.message,
                    participant_ids: added.participant_ids,
                })))
            }
            ServerMessage::MessageRead(read) => {
                Some(ChannelSignal::Data(LiveEvent::MessageRead(MessageRead {
                    message_id: read.message_id,
                    read_at: read.read_at,
                })))
            }
            ServerMessage::Error(err) => Some(ChannelSignal::Error(MessagingError::channel(
                format!("{}: {}", err.code, err.message),
            ))),
            ServerMessage::Pong(_) => None,
        }
    }
}

impl From<Result<LiveEvent, MessagingError>> for ChannelSignal {
    fn from(result: Result<LiveEvent, MessagingError>) -> Self {
        match result {
            Ok(event) => ChannelSignal::Data(event),
            Err(err) => ChannelSignal::Error(err),
        }
    }
}

/// Outcome of one `mark_visible` pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MarkReport {
    /// Server accepted the read mark.
    pub confirmed: Vec<MessageId>,
    /// Server rejected it; the optimistic mark was undone.
    pub reverted: Vec<(MessageId, MessagingError)>,
}

impl MarkReport {
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.reverted.is_empty()
    }
}

#[derive(Debug, Default)]
struct ReconcilerState {
    messages: MessageList,
    /// Exclusive upper bound for the next backfill page.
    next_cursor: Option<Cursor>,
    has_more: bool,
    load_in_flight: bool,
    /// Optimistic read marks awaiting the server, with the local timestamp.
    pending_reads: HashMap<MessageId, Timestamp>,
}

impl ReconcilerState {
    /// Tracks the backfill position after a page older than everything seen.
    fn advance(&mut self, page: &Page, take: Take) {
        self.has_more = page.len() == take.as_usize();
        if let Some(cursor) = page.prev_cursor {
            self.next_cursor = Some(match self.next_cursor {
                Some(current) if current < cursor => current,
                _ => cursor,
            });
        }
    }
}

/// Owns the local view of the conversation between `viewer` and `partner`.
///
/// Methods take `&self`; the reconciler can be shared behind an `Arc`
/// between the UI task and the live channel task.
pub struct ConversationReconciler {
    api: Arc<dyn ConversationApi>,
    viewer: UserId,
    partner: UserId,
    take: Take,
    state: Mutex<ReconcilerState>,
}

impl ConversationReconciler {
    pub fn new(api: Arc<dyn ConversationApi>, viewer: UserId, partner: UserId) -> Self {
        Self::with_take(api, viewer, partner, Take::default())
    }

    pub fn with_take(
        api: Arc<dyn ConversationApi>,
        viewer: UserId,
        partner: UserId,
        take: Take,
    ) -> Self {
        Self {
            api,
            viewer,
            partner,
            take,
            state: Mutex::new(ReconcilerState::default()),
        }
    }

    pub fn viewer(&self) -> UserId {
        self.viewer
    }

    pub fn partner(&self) -> UserId {
        self.partner
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Loading
    // ════════════════════════════════════════════════════════════════════════════

    /// Fetches the newest page. Returns false if a load was already running.
    pub async fn load_initial(&self) -> Result<bool, MessagingError> {
        self.load_from(None).await
    }

    /// Fetches the next older page.
    ///
    /// No-op (returns false) while another load is in flight or when the
    /// previous page was the last one.
    pub async fn load_more(&self) -> Result<bool, MessagingError> {
        let cursor = {
            let state = self.state.lock().await;
            if !state.has_more || state.next_cursor.is_none() {
                return Ok(false);
            }
            state.next_cursor
        };
        self.load_from(cursor).await
    }

    async fn load_from(&self, cursor: Option<Cursor>) -> Result<bool, MessagingError> {
        {
            let mut state = self.state.lock().await;
            if state.load_in_flight {
                return Ok(false);
            }
            state.load_in_flight = true;
        }

        let result = self
            .api
            .get_page(&PartnerRef::Id(self.partner), cursor, self.take)
            .await;

        let mut state = self.state.lock().await;
        state.load_in_flight = false;
        let page = result?;

        tracing::debug!(
            partner = %self.partner,
            fetched = page.len(),
            "Merged history page"
        );
        state.advance(&page, self.take);
        state.messages.merge(page.messages);
        Ok(true)
    }

    /// Merges a page obtained elsewhere. Does not move the backfill cursor.
    pub async fn ingest_page(&self, page: Page) {
        self.state.lock().await.messages.merge(page.messages);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Live channel
    // ════════════════════════════════════════════════════════════════════════════

    /// Merges a pushed message. Messages from other conversations are
    /// ignored and return false.
    pub async fn ingest_pushed_message(&self, message: Message) -> bool {
        if !message.is_between(&self.viewer, &self.partner) {
            return false;
        }
        self.state.lock().await.messages.merge(std::iter::once(message));
        true
    }

    /// Applies a read receipt. Unknown ids are ignored; they may belong to a
    /// page not loaded yet.
    pub async fn ingest_read_receipt(&self, message_id: MessageId, read_at: Timestamp) -> bool {
        self.state
            .lock()
            .await
            .messages
            .apply_read(&message_id, read_at)
    }

    pub async fn on_channel_signal(&self, signal: ChannelSignal) -> Result<(), MessagingError> {
        match signal {
            ChannelSignal::Started => Ok(()),
            ChannelSignal::Error(err) => {
                tracing::warn!(error = %err, "Live channel error, refetching");
                self.reconcile_on_channel_error().await.map(|_| ())
            }
            ChannelSignal::Data(LiveEvent::MessageAdded(added)) => {
                self.ingest_pushed_message(added.message).await;
                Ok(())
            }
            ChannelSignal::Data(LiveEvent::MessageRead(read)) => {
                self.ingest_read_receipt(read.message_id, read.read_at).await;
                Ok(())
            }
        }
    }

    /// Refetches from the newest page backwards until the fetched history
    /// reaches the newest message known before the outage, or history ends.
    ///
    /// Returns the number of pages fetched.
    pub async fn reconcile_on_channel_error(&self) -> Result<usize, MessagingError> {
        let anchor = {
            let state = self.state.lock().await;
            state
                .messages
                .newest()
                .map(|m| (m.id(), m.created_at()))
        };

        let partner = PartnerRef::Id(self.partner);
        let mut cursor = None;
        let mut pages = 0;

        loop {
            let page = self.api.get_page(&partner, cursor, self.take).await?;
            pages += 1;

            let full = page.len() == self.take.as_usize();
            let overlaps = match anchor {
                None => true,
                Some((id, created_at)) => {
                    page.messages.iter().any(|m| m.id() == id)
                        || page.prev_cursor.map_or(true, |c| c < created_at)
                }
            };
            let next = page.prev_cursor;

            {
                let mut state = self.state.lock().await;
                if state.next_cursor.is_none() {
                    state.advance(&page, self.take);
                }
                state.messages.merge(page.messages);
            }

            if overlaps || !full {
                break;
            }
            cursor = next;
        }

        tracing::info!(partner = %self.partner, pages, "Reconciled after channel error");
        Ok(pages)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Read marks
    // ════════════════════════════════════════════════════════════════════════════

    /// Marks the visible, unread, incoming messages as read.
    ///
    /// Local `read_at` is set before the server answers; a rejected call
    /// undoes it. Messages already pending are skipped.
    pub async fn mark_visible(&self, visible: &[MessageId]) -> MarkReport {
        let now = Timestamp::now();
        let to_mark: Vec<MessageId> = {
            let mut state = self.state.lock().await;
            let mut selected = Vec::new();
            for id in visible {
                if state.pending_reads.contains_key(id) {
                    continue;
                }
                let Some(message) = state.messages.get_mut(id) else {
                    continue;
                };
                if message.sender_id() == self.viewer || message.is_read() {
                    continue;
                }
                message.mark_read(now);
                selected.push(*id);
            }
            for id in &selected {
                state.pending_reads.insert(*id, now);
            }
            selected
        };

        if to_mark.is_empty() {
            return MarkReport::default();
        }

        let results = join_all(
            to_mark
                .iter()
                .map(|id| async move { (*id, self.api.mark_as_read(*id).await) }),
        )
        .await;

        let mut report = MarkReport::default();
        let mut state = self.state.lock().await;
        for (id, result) in results {
            let optimistic = state.pending_reads.remove(&id);
            match result {
                Ok(confirmed) => {
                    state.messages.merge(std::iter::once(confirmed));
                    report.confirmed.push(id);
                }
                Err(err) => {
                    tracing::warn!(message_id = %id, error = %err, "Read mark rejected");
                    if let Some(at) = optimistic {
                        state.messages.undo_read(&id, at);
                    }
                    report.reverted.push((id, err));
                }
            }
        }
        report
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Views
    // ════════════════════════════════════════════════════════════════════════════

    /// Newest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.as_slice().to_vec()
    }

    pub async fn unread_count(&self) -> usize {
        self.state
            .lock()
            .await
            .messages
            .unread_count_for(&self.viewer)
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more
    }

    pub async fn next_cursor(&self) -> Option<Cursor> {
        self.state.lock().await.next_cursor
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.load_in_flight
    }
}
