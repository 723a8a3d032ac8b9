//! WebSocket upgrade handler and per-connection session

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::TickInput;
use crate::room::{client_channel, RoomCmd, RoomHandle};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{ClientMsg, RoomPhase, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (tx, rx) = client_channel();

    // Writer task: per-connection queue -> WebSocket
    let writer = tokio::spawn(write_outbound(ws_sink, rx, player_id));

    let _ = tx.send(ServerMsg::Welcome { player_id }).await;
    let _ = tx
        .send(ServerMsg::RoomList {
            rooms: state.rooms.open_rooms(),
        })
        .await;

    let current_room = run_session(player_id, ws_stream, &tx, &state).await;

    // Unregister from the current room before the connection unwinds
    if let Some(room) = current_room {
        let _ = room.cmd_tx.send(RoomCmd::Leave { player_id }).await;
    }

    writer.abort();
    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> registry / current room. Returns the room the
/// player was in when the connection ended, if any.
async fn run_session(
    player_id: Uuid,
    mut ws_stream: SplitStream<WebSocket>,
    tx: &mpsc::Sender<ServerMsg>,
    state: &AppState,
) -> Option<RoomHandle> {
    let rate_limiter = PlayerRateLimiter::new();
    let mut current_room: Option<RoomHandle> = None;

    while let Some(result) = ws_stream.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                debug!(player_id = %player_id, "Client initiated close");
                break;
            }
            // Binary frames and ping/pong are not part of the protocol
            Ok(_) => continue,
            Err(e) => {
                debug!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        };

        let msg = match serde_json::from_str::<ClientMsg>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(player_id = %player_id, error = %e, "Ignoring malformed message");
                continue;
            }
        };

        match msg {
            ClientMsg::ListRooms => {
                let _ = tx
                    .send(ServerMsg::RoomList {
                        rooms: state.rooms.open_rooms(),
                    })
                    .await;
            }

            ClientMsg::CreateRoom { name } => {
                if current_room.is_some() {
                    continue;
                }
                let handle = state.rooms.create_room();
                let join = RoomCmd::Join {
                    player_id,
                    name: display_name(name),
                    tx: tx.clone(),
                };
                if handle.cmd_tx.send(join).await.is_ok() {
                    info!(player_id = %player_id, room = %handle.code, "Room created");
                    current_room = Some(handle);
                }
            }

            ClientMsg::JoinRoom { room_id, name } => {
                if current_room.is_some() {
                    continue;
                }
                match state.rooms.lookup(&room_id) {
                    Some(handle) if handle.phase() == RoomPhase::Lobby => {
                        let join = RoomCmd::Join {
                            player_id,
                            name: display_name(name),
                            tx: tx.clone(),
                        };
                        // The room re-checks its phase; a lost race comes
                        // back as an error message, not a dropped player.
                        if handle.cmd_tx.send(join).await.is_ok() {
                            current_room = Some(handle);
                        }
                    }
                    _ => {
                        let _ = tx
                            .send(ServerMsg::Error {
                                message: "Room not found or game already started".to_string(),
                            })
                            .await;
                    }
                }
            }

            ClientMsg::SelectCorner { slot } => {
                forward(&mut current_room, RoomCmd::SelectSlot { player_id, slot }).await;
            }

            ClientMsg::StartGame => {
                forward(&mut current_room, RoomCmd::Start { player_id }).await;
            }

            ClientMsg::Input {
                forward: fwd,
                rotate,
                shoot,
            } => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }
                let input = TickInput {
                    forward: fwd,
                    rotate,
                    shoot,
                };
                forward(&mut current_room, RoomCmd::Input { player_id, input }).await;
            }

            ClientMsg::Airstrike => {
                forward(&mut current_room, RoomCmd::Airstrike { player_id }).await;
            }

            ClientMsg::Laser => {
                forward(&mut current_room, RoomCmd::Laser { player_id }).await;
            }

            ClientMsg::Restart => {
                forward(&mut current_room, RoomCmd::Restart { player_id }).await;
            }
        }
    }

    current_room
}

/// Forward a room-scoped command; clears the handle when the room is gone
async fn forward(current_room: &mut Option<RoomHandle>, cmd: RoomCmd) {
    if let Some(room) = current_room {
        if room.cmd_tx.send(cmd).await.is_err() {
            *current_room = None;
        }
    }
}

/// Writer task: drain the outbound queue into the socket
async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<ServerMsg>,
    player_id: Uuid,
) {
    while let Some(msg) = rx.recv().await {
        match serde_json::to_string(&msg) {
            Ok(json) => {
                if sink.send(Message::Text(json)).await.is_err() {
                    debug!(player_id = %player_id, "WebSocket send failed");
                    break;
                }
            }
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Failed to encode message");
            }
        }
    }
}

fn display_name(name: Option<String>) -> String {
    name.filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Player".to_string())
}
