//! WebSocket transport.
//!
//! Each connection is upgraded, then split: a writer task drains the
//! client's outbox channel into the socket while the read half parses
//! frames and forwards them to the owning room's command queue. The room
//! task never touches the socket.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::RoomRegistry;
use crate::room::{JoinRequest, RoomCommand};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use pit_core::ParticipantId;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    pub username: Option<String>,
    pub spectator: Option<bool>,
    #[serde(rename = "prevSessionData")]
    pub prev_session_data: Option<String>,
}

pub async fn ws_handler(
    Path(room_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(registry): State<Arc<RoomRegistry>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, query, registry))
}

/// Recover the participant id from a `prevSessionData` token of the form
/// `<roomId>-<participantId>`, or mint a fresh id.
fn resolve_client_id(room_id: &str, prev_session_data: Option<&str>) -> ParticipantId {
    if let Some(token) = prev_session_data {
        if let Some(participant) = token.strip_prefix(&format!("{room_id}-")) {
            if !participant.is_empty() {
                return ParticipantId::new(participant);
            }
        }
    }
    ParticipantId::new(Uuid::new_v4().simple().to_string())
}

async fn handle_socket(
    socket: WebSocket,
    room_id: String,
    query: WsQuery,
    registry: Arc<RoomRegistry>,
) {
    let (mut sink, mut stream) = socket.split();
    let spectator = query.spectator.unwrap_or(false);

    // Spectating a room that does not exist is an error, not a creation.
    if spectator && registry.get(&room_id).is_none() {
        let error = ServerMessage::Error {
            message: format!("room {room_id} not found"),
        };
        let _ = sink.send(Message::Text(error.encode().into())).await;
        let _ = sink.close().await;
        return;
    }

    let handle = registry.get_or_create(&room_id);
    let client_id = resolve_client_id(&room_id, query.prev_session_data.as_deref());
    let username = query
        .username
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("trader-{}", &client_id.as_str()[..8.min(client_id.as_str().len())]));

    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<String>();
    handle.send(RoomCommand::Join(JoinRequest {
        client_id: client_id.clone(),
        username,
        spectator,
        outbox: outbox_tx,
    }));

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbox_rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                // Malformed frames and unknown tags are dropped here.
                if let Some(parsed) = ClientMessage::parse(text.as_str()) {
                    handle.send(RoomCommand::Message {
                        client_id: client_id.clone(),
                        message: parsed,
                    });
                } else {
                    tracing::debug!(room = room_id, "dropped unparseable frame");
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle.send(RoomCommand::Disconnected { client_id });
    writer.abort();
}
