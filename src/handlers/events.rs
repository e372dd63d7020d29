//! `SUBSCRIBE auction events` (spec.md §6): a long-lived WebSocket stream of
//! this auction's broadcast topic, framed with a keep-alive so idle
//! connections don't look dead to a proxy in between.

use std::time::Duration;

use axum::{
    extract::{
        ws::{
            Message,
            WebSocket,
            WebSocketUpgrade,
        },
        Path,
        State,
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::state::AppState;
use crate::metrics;

/// At most one keep-alive ping per this interval of idle time (spec.md §6:
/// "at most every 30s of idle").
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, auction_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, auction_id: Uuid) {
    let mut subscription = state.broadcaster.subscribe(auction_id);
    let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
    keepalive.tick().await; // first tick fires immediately, skip it

    loop {
        tokio::select! {
            event = subscription.receiver.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(payload) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                        if matches!(event, crate::models::event::AuctionEvent::ServerClosing) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => {
                        metrics::record_broadcast_lag();
                        if socket
                            .send(Message::Text(r#"{"type":"lagged"}"#.to_string()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = keepalive.tick() => {
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.broadcaster.unsubscribe(subscription.subscriber_id);
}
