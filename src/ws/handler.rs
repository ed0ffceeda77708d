//! WebSocket upgrade handler and per-connection pumps
//!
//! One reader loop per connection feeds control frames into the world;
//! one writer task drains the snapshot and announce broadcasts back to
//! the socket. Neither pump touches world state directly.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::store::PlayerProfile;
use crate::util::rate_limit::InputLimiter;
use crate::ws::protocol;

/// Query parameters for the WebSocket endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// The access key issued to a registered player.
    pub access_key: Uuid,
}

/// Upgrade handler. Unknown or already-claimed access keys are refused
/// before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    match state.registry.checkout(&query.access_key) {
        Some(profile) => {
            info!(uid = profile.uid, name = %profile.name, "websocket upgrade for registered player");
            ws.on_upgrade(move |socket| handle_socket(socket, profile, state))
        }
        None => {
            warn!(access_key = %query.access_key, "websocket refused, unknown or claimed access key");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Drive one player session from upgrade to cleanup.
async fn handle_socket(socket: WebSocket, profile: PlayerProfile, state: AppState) {
    let uid = profile.uid;

    // Claim a plane before anything reaches the client.
    if let Err(e) = state.world.join(uid, profile.plane_model.clone()).await {
        warn!(uid, error = %e, "world refused join");
        state.registry.putback(profile);
        return;
    }

    let (mut ws_sink, ws_stream) = socket.split();

    // The roster goes only to the new client, before it is announced.
    let roster = protocol::roster(uid, &state.registry.roster());
    if let Err(e) = send_frame(&mut ws_sink, roster).await {
        error!(uid, error = %e, "failed to send roster");
        state.world.leave(uid).await;
        state.registry.putback(profile);
        return;
    }

    state.registry.connect(profile);
    let _ = state.announce_tx.send(protocol::connect_announce(uid));

    let writer_handle = spawn_writer(uid, ws_sink, state.world.subscribe(), state.announce_tx.subscribe());

    read_loop(uid, ws_stream, &state).await;

    // Cleanup runs for every exit path of the reader.
    state.world.leave(uid).await;
    state.registry.disconnect(uid);
    let _ = state.announce_tx.send(protocol::disconnect_announce(uid));
    writer_handle.abort();

    info!(uid, "websocket connection closed");
}

/// Writer task: snapshot and announce broadcasts -> socket.
fn spawn_writer(
    uid: u8,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut snapshot_rx: broadcast::Receiver<Bytes>,
    mut announce_rx: broadcast::Receiver<Bytes>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                frame = snapshot_rx.recv() => frame,
                frame = announce_rx.recv() => frame,
            };

            match frame {
                Ok(frame) => {
                    if let Err(e) = send_frame(&mut ws_sink, frame).await {
                        debug!(uid, error = %e, "websocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // A slow client just skips frames, it is not dropped.
                    warn!(uid, lagged_count = n, "client lagged, skipping {} frames", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(uid, "broadcast channel closed");
                    break;
                }
            }
        }
    })
}

/// Reader loop: socket -> world input channel.
async fn read_loop(uid: u8, mut ws_stream: SplitStream<WebSocket>, state: &AppState) {
    let rate_limiter = InputLimiter::new();

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Binary(data)) => {
                if !rate_limiter.allow() {
                    warn!(uid, "rate limited input message");
                    continue;
                }

                match data.first() {
                    Some(&protocol::OP_STATE) => {
                        state.world.apply_input(uid, Bytes::from(data)).await;
                    }
                    _ => debug!(uid, "unknown opcode, frame dropped"),
                }
            }
            Ok(Message::Text(_)) => {
                warn!(uid, "received text message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                debug!(uid, "received keepalive");
            }
            Ok(Message::Close(_)) => {
                info!(uid, "client initiated close");
                break;
            }
            Err(e) => {
                error!(uid, error = %e, "websocket error");
                break;
            }
        }
    }
}

/// Send one binary frame.
async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: Bytes,
) -> Result<(), axum::Error> {
    sink.send(Message::Binary(frame.to_vec())).await
}
