//! Inkroom WebSocket Relay Server
//!
//! Relays whiteboard events between clients in the same room.
//!
//! ## Protocol
//!
//! Clients connect to `/ws?userId=<id>&username=<name>` and exchange JSON text
//! frames of the form:
//! ```json
//! { "event": "join-room", "data": { "roomId": "room-id" } }
//! { "event": "add-element", "data": { "roomId": "room-id", "element": { ... } } }
//! ```
//! Room-scoped events are forwarded to the other members of the sender's
//! room. The server adds `room-users`, `user-connected`, `user-disconnected`
//! and `error` events of its own.

mod state;

use axum::{
    Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use inkroom_core::sync::{RoomUser, SyncMessage};
use serde::Deserialize;
use state::{AppState, Broadcast, Outcome, Peer};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Connection identity from the query string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectParams {
    user_id: Option<String>,
    username: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkroom_server=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = bind_addr();
    info!("Inkroom relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// Bind address from `INKROOM_ADDR`, falling back to the default.
fn bind_addr() -> SocketAddr {
    let fallback = SocketAddr::from(([0, 0, 0, 0], 3030));
    match std::env::var("INKROOM_ADDR") {
        Ok(value) => value.parse().unwrap_or_else(|e| {
            warn!("Invalid INKROOM_ADDR {:?} ({}), using {}", value, e, fallback);
            fallback
        }),
        Err(_) => fallback,
    }
}

/// Index page
async fn index() -> &'static str {
    "Inkroom Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = params.user_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let username = params.username.unwrap_or_else(|| "Anonymous".to_string());
    ws.on_upgrade(move |socket| handle_socket(socket, state, RoomUser::new(user_id, username)))
}

fn encode(message: &SyncMessage) -> Option<Message> {
    match message.to_json() {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode {}: {}", message.event_name(), e);
            None
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: RoomUser) {
    let mut peer = Peer::new(Uuid::new_v4().to_string(), user);
    info!("New connection: {} ({})", peer.id, peer.user.username);

    let (mut sender, mut receiver) = socket.split();
    let mut room_rx: Option<broadcast::Receiver<Broadcast>> = None;

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match SyncMessage::from_json(text.as_str()) {
                            Ok(message) => match state.dispatch(&mut peer, message) {
                                Outcome::Joined(rx) => {
                                    room_rx = Some(rx);
                                    None
                                }
                                Outcome::Left => {
                                    room_rx = None;
                                    None
                                }
                                Outcome::Done => None,
                                Outcome::Reply(reply) => Some(reply),
                            },
                            Err(e) => {
                                warn!("Invalid message from {}: {}", peer.id, e);
                                Some(SyncMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                })
                            }
                        };
                        if let Some(frame) = reply.as_ref().and_then(encode) {
                            if sender.send(frame).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary frame from {}", peer.id);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer.id, e);
                        break;
                    }
                }
            }

            // Handle broadcast messages from room
            msg = async {
                match &mut room_rx {
                    Some(rx) => Some(rx.recv().await),
                    None => {
                        // No room joined, just wait forever
                        std::future::pending::<Option<Result<Broadcast, broadcast::error::RecvError>>>().await
                    }
                }
            } => {
                match msg {
                    Some(Ok(incoming)) if incoming.is_for(&peer.id) => {
                        if let Some(frame) = encode(&incoming.message) {
                            if sender.send(frame).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        warn!("{} lagged behind, {} messages dropped", peer.id, skipped);
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) => {
                        room_rx = None;
                    }
                    _ => {}
                }
            }
        }
    }

    // Cleanup on disconnect
    if let Some(room) = peer.room.take() {
        state.leave_room(&room, &peer);
    }
    info!("Connection closed: {}", peer.id);
}
