//! WebSocket upgrade handler for the live channel.
//!
//! Connection lifecycle:
//! 1. `auth_middleware` resolves the viewer from the WebSocket transport context
//! 2. Upgrade, open a `LiveSubscriptionChannel` for the viewer
//! 3. Relay channel events and answer pings until either side ends
//! 4. Close the channel, releasing its bus subscriptions

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        FromRef, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};

use crate::adapters::http::middleware::RequireAuth;
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::EventSubscriber;

use super::live_channel::LiveSubscriptionChannel;
use super::messages::{ClientMessage, ServerMessage};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct LiveState {
    pub subscriber: Arc<dyn EventSubscriber>,
    pub queue_capacity: usize,
}

impl LiveState {
    pub fn new(subscriber: Arc<dyn EventSubscriber>, queue_capacity: usize) -> Self {
        Self {
            subscriber,
            queue_capacity,
        }
    }
}

/// Route: `GET /api/live`
///
/// Authentication is checked before the upgrade headers.
pub async fn live_handler(
    State(state): State<LiveState>,
    RequireAuth(user): RequireAuth,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, user, state))
}

async fn handle_socket(socket: WebSocket, user: AuthenticatedUser, state: LiveState) {
    let (mut sender, mut receiver) = socket.split();
    let mut channel =
        LiveSubscriptionChannel::open(state.subscriber.clone(), user.id, state.queue_capacity);

    tracing::info!(user_id = %user.id, "Live connection opened");

    if let Err(e) = send_message(&mut sender, &ServerMessage::connected(user.id)).await {
        tracing::debug!(user_id = %user.id, "Failed to send connected message: {}", e);
        return;
    }

    loop {
        tokio::select! {
            event = channel.recv() => {
                let outgoing = match event {
                    Some(Ok(event)) => ServerMessage::from(event),
                    Some(Err(err)) => ServerMessage::error(&err),
                    None => break,
                };
                if let Err(e) = send_message(&mut sender, &outgoing).await {
                    tracing::debug!(user_id = %user.id, "Send error, closing connection: {}", e);
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Ping) => {
                        if send_message(&mut sender, &ServerMessage::pong()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(user_id = %user.id, "Failed to parse client message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(user_id = %user.id, "Client closed connection");
                    break;
                }
                // Protocol pings are answered by axum
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(user_id = %user.id, "WebSocket error: {}", e);
                    break;
                }
            },
        }
    }

    channel.close();
    tracing::info!(user_id = %user.id, "Live connection closed");
}

async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Router for the live endpoint, mountable under any state that can
/// provide a `LiveState`.
pub fn websocket_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    LiveState: FromRef<S>,
{
    Router::new().route("/live", get(live_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;

    #[test]
    fn live_state_shares_subscriber() {
        let bus = Arc::new(InMemoryEventBus::new());
        let subscriber: Arc<dyn EventSubscriber> = bus.clone();
        let state = LiveState::new(subscriber.clone(), 64);

        assert!(Arc::ptr_eq(&state.subscriber, &subscriber));
        assert_eq!(state.queue_capacity, 64);
    }

    #[test]
    fn websocket_router_creates_route() {
        let bus = Arc::new(InMemoryEventBus::new());
        let _: Router<()> = websocket_router().with_state(LiveState::new(bus, 8));
    }
}
