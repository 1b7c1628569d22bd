//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::PlayerInput;
use crate::http::routes::AppError;
use crate::matchmaking::LobbyError;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, Outgoing, ProtocolError, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Display name shown to other players
    #[serde(default)]
    pub name: String,
    /// Join this session instead of any with room
    pub session: Option<Uuid>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    if let Some(session_id) = query.session {
        if state.session_registry.get(&session_id).is_none() {
            return AppError::NotFound(LobbyError::UnknownSession(session_id).to_string())
                .into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, query: WsQuery, state: AppState) {
    let user_id = Uuid::new_v4();
    info!(user_id = %user_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Seat only once the upgrade is done so every seat has a connection to release it
    let session = match state.lobby.assign(user_id, query.session) {
        Ok(session) => session,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Could not seat player");
            let refusal = ServerMsg::Error {
                code: lobby_error_code(&e).to_string(),
                message: e.to_string(),
            };
            let _ = send_msg(&mut ws_sink, &refusal).await;
            return;
        }
    };

    let welcome = ServerMsg::Welcome {
        user_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(user_id = %user_id, error = %e, "Failed to send welcome");
        state.lobby.release(user_id);
        return;
    }

    // Subscribe before joining so the join reply is not missed
    let events_rx = session.subscribe();
    let join = PlayerInput {
        user_id,
        msg: ClientMsg::JoinSession {
            display_name: query.name,
        },
        received_at: unix_millis(),
    };

    if session.input_tx.send(join).await.is_ok() {
        run_connection(user_id, ws_sink, ws_stream, session.input_tx.clone(), events_rx).await;
    } else {
        warn!(user_id = %user_id, session_id = %session.id, "Session closed before join");
    }

    // Cleanup on disconnect
    state.lobby.release(user_id);

    info!(user_id = %user_id, "WebSocket connection closed");
}

fn lobby_error_code(e: &LobbyError) -> &'static str {
    match e {
        LobbyError::AlreadySeated(_) => "already_seated",
        LobbyError::UnknownSession(_) => "unknown_session",
        LobbyError::SessionFull(_) => "session_full",
    }
}

/// Run the WebSocket connection with read/write split
async fn run_connection(
    user_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<PlayerInput>,
    mut events_rx: broadcast::Receiver<Outgoing>,
) {
    let rate_limiter = PlayerRateLimiter::new();

    // Spawn writer task: session broadcast -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(out) => {
                    if !out.is_for(user_id) {
                        continue;
                    }
                    if let Err(e) = send_msg(&mut ws_sink, &out.msg).await {
                        debug!(user_id = %user_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(user_id = %user_id, lagged_count = n, "Client lagged, skipping messages");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(user_id = %user_id, "Session channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session loop
    while let Some(result) = ws_stream.next().await {
        let msg = match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(user_id = %user_id, "Rate limited input message");
                    continue;
                }
                ClientMsg::parse(&text)
            }
            Ok(Message::Binary(_)) => Err(ProtocolError::Binary),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(user_id = %user_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "WebSocket error");
                break;
            }
        };

        match msg {
            Ok(ClientMsg::JoinSession { .. }) => {
                debug!(user_id = %user_id, "Already joined, ignoring join");
            }
            Ok(ClientMsg::LeaveSession) => break,
            Ok(client_msg) => {
                let input = PlayerInput {
                    user_id,
                    msg: client_msg,
                    received_at: unix_millis(),
                };

                if input_tx.send(input).await.is_err() {
                    debug!(user_id = %user_id, "Input channel closed");
                    break;
                }
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to parse client message");
            }
        }
    }

    // Signal disconnect to session loop
    let _ = input_tx
        .send(PlayerInput {
            user_id,
            msg: ClientMsg::LeaveSession,
            received_at: unix_millis(),
        })
        .await;

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
