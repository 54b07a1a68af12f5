//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::components::NetworkId;
use crate::game::{Addressed, MatchHandle, SimInput};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

type WsSink = futures::stream::SplitSink<WebSocket, Message>;
type WsStream = futures::stream::SplitStream<WebSocket>;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    let handle = state
        .match_registry
        .find_open_or_create(&state.sim_config, state.config.match_seed);

    let (network_id, events_rx) = match handle.connect().await {
        Ok(connected) => connected,
        Err(e) => {
            error!(match_id = %handle.id, error = %e, "Failed to join match");
            let _ = send_msg(&mut ws_sink, &ServerMsg::error("match_unavailable", e.to_string())).await;
            return;
        }
    };

    info!(match_id = %handle.id, network_id = %network_id, "New WebSocket connection");

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        network_id,
        match_id: handle.id,
        tick_rate: handle.tick_rate,
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(network_id = %network_id, error = %e, "Failed to send welcome");
        let _ = handle.disconnect(network_id).await;
        return;
    }

    run_session(network_id, &handle, ws_sink, ws_stream, events_rx).await;

    // Cleanup on disconnect
    if let Err(e) = handle.disconnect(network_id).await {
        debug!(network_id = %network_id, error = %e, "Match already gone at disconnect");
    }

    info!(match_id = %handle.id, network_id = %network_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    network_id: NetworkId,
    handle: &MatchHandle,
    ws_sink: WsSink,
    mut ws_stream: WsStream,
    events_rx: broadcast::Receiver<Addressed>,
) {
    let rate_limiter = PlayerRateLimiter::new();
    let (direct_tx, direct_rx) = tokio::sync::mpsc::channel::<ServerMsg>(16);

    // Writer task: match events addressed to us -> WebSocket
    let writer_handle = tokio::spawn(write_loop(network_id, ws_sink, events_rx, direct_rx));

    // Reader loop: WebSocket -> match loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(network_id = %network_id, "Rate limited input message");
                    continue;
                }

                match ClientMsg::decode(&text) {
                    Ok(client_msg) => {
                        if let Some(input) = to_sim_input(network_id, &client_msg) {
                            if handle.send(input).await.is_err() {
                                debug!(network_id = %network_id, "Match input channel closed");
                                break;
                            }
                        } else if let ClientMsg::Ping { t } = client_msg {
                            let _ = direct_tx.send(ServerMsg::Pong { t }).await;
                        }
                    }
                    Err(e) => {
                        warn!(network_id = %network_id, error = %e, "Failed to parse client message");
                        let reply = ServerMsg::error("invalid_message", e.to_string());
                        let _ = direct_tx.send(reply).await;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(network_id = %network_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(network_id = %network_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(network_id = %network_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

async fn write_loop(
    network_id: NetworkId,
    mut ws_sink: WsSink,
    mut events_rx: broadcast::Receiver<Addressed>,
    mut direct_rx: tokio::sync::mpsc::Receiver<ServerMsg>,
) {
    loop {
        let msg = tokio::select! {
            event = events_rx.recv() => match event {
                Ok(addressed) if addressed.recipient.includes(network_id) => addressed.msg,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(network_id = %network_id, lagged_count = n, "Client lagged, skipping messages");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(network_id = %network_id, "Match event channel closed");
                    break;
                }
            },
            Some(reply) = direct_rx.recv() => reply,
        };

        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(network_id = %network_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Map a decoded client message onto the simulation's input
pub fn to_sim_input(network_id: NetworkId, msg: &ClientMsg) -> Option<SimInput> {
    match msg {
        ClientMsg::RequestGameEntry => Some(SimInput::RequestGameEntry(network_id)),
        ClientMsg::Input { .. } => msg.player_input().map(|(tick, input)| SimInput::Input {
            network_id,
            tick,
            input,
        }),
        ClientMsg::Ping { .. } => None,
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), WsSendError> {
    let json = msg.encode()?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum WsSendError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("WebSocket send failed: {0}")]
    Socket(#[from] axum::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tick::Tick;

    #[test]
    fn pings_stay_out_of_the_simulation() {
        assert_eq!(to_sim_input(NetworkId(1), &ClientMsg::Ping { t: 5 }), None);
        assert_eq!(
            to_sim_input(NetworkId(1), &ClientMsg::RequestGameEntry),
            Some(SimInput::RequestGameEntry(NetworkId(1)))
        );
    }

    #[test]
    fn inputs_carry_their_tick() {
        let msg = ClientMsg::Input {
            tick: Tick::new(40),
            move_x: 0.0,
            move_y: -1.0,
            sprint: false,
        };
        let Some(SimInput::Input { network_id, tick, .. }) = to_sim_input(NetworkId(2), &msg) else {
            panic!("expected input");
        };
        assert_eq!(network_id, NetworkId(2));
        assert_eq!(tick, Tick::new(40));
    }
}
