use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use gatehouse_application::ConnectionHandle;
use gatehouse_core::{ConnectionId, UserId};
use gatehouse_domain::StaffRole;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::AppState;

// Frames queued per connection before the sender sees backpressure.
const OUTBOUND_BUFFER: usize = 64;

/// Connection parameters. Staff identity is established upstream; the
/// socket carries the already-authenticated user id and role.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user_id: UserId,
    pub role: StaffRole,
    #[serde(default)]
    pub rooms: Option<String>,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| serve_connection(state, query, socket))
}

async fn serve_connection(state: AppState, query: WsQuery, mut socket: WebSocket) {
    let connection_id = ConnectionId::new();
    let (sender, mut outbound) = mpsc::channel(OUTBOUND_BUFFER);

    let extra_rooms: Vec<String> = query
        .rooms
        .as_deref()
        .map(|rooms| {
            rooms
                .split(',')
                .map(str::trim)
                .filter(|room| !room.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    let registered = state
        .notification_router
        .connect(ConnectionHandle {
            connection_id,
            user_id: query.user_id,
            role: query.role,
            extra_rooms,
            sender,
        })
        .await;
    if let Err(error) = registered {
        warn!(%error, "failed to register websocket connection");
        return;
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    break;
                };
                let Ok(text) = serde_json::to_string(&frame) else {
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // The socket is push-only; client-originated events ride
                    // the REST surface. Unexpected payloads get an explicit
                    // acknowledgement instead of silence.
                    Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {
                        let ack = serde_json::json!({
                            "type": "error",
                            "message": "unsupported client frame; use the REST API",
                        });
                        if socket.send(Message::Text(ack.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    // Pings and pongs are answered by axum.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    if let Err(error) = state.notification_router.disconnect(connection_id).await {
        warn!(%error, "failed to unregister websocket connection");
    }
    debug!(connection_id = %connection_id, "websocket closed");
}
