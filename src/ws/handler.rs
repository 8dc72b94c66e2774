//! WebSocket handler for client connections

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::WALLET_TIMEOUT;
use crate::protocol::ClientMessage;
use crate::session::{outbound, spawn_session};
use crate::state::AppState;
use crate::wallet::RemoteWallet;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Run one game session over a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();

    // Wallet requests share the session's message queue
    let (outbound_tx, mut outbound_rx) = outbound::channel();
    let wallet = Arc::new(RemoteWallet::new(outbound_tx.messages(), WALLET_TIMEOUT));

    let (handle, session_task) = spawn_session(session_id, state.session_deps(wallet.clone()), outbound_tx);
    state.sessions.insert(session_id, handle.clone());
    info!("Player connected (session {}, {} active)", session_id, state.session_count());

    let (mut sender, mut receiver) = socket.split();

    // Task to forward session output to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if sender.send(Message::Text(msg.to_json().into())).await.is_err() {
                break;
            }
        }
    });

    // Task to receive messages from this client
    let mut recv_task = {
        let wallet = wallet.clone();

        tokio::spawn(async move {
            while let Some(result) = receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        let Some(msg) = ClientMessage::parse(&text) else {
                            debug!("Session {} sent an unknown frame", session_id);
                            continue;
                        };

                        match msg.command() {
                            Some(command) => {
                                if !handle.send(command).await {
                                    break;
                                }
                            }
                            None => match msg.into_wallet_reply() {
                                Some((id, reply)) => {
                                    wallet.resolve(id, reply);
                                }
                                None => debug!("Ping from session {}", session_id),
                            },
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Session {} sent close frame", session_id);
                        break;
                    }
                    Ok(_) => {
                        // Ignore binary, ping, pong frames
                    }
                    Err(e) => {
                        error!("WebSocket error for session {}: {}", session_id, e);
                        break;
                    }
                }
            }
        })
    };

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut recv_task => {}
    }
    send_task.abort();
    recv_task.abort();

    // Dropping the last handle stops the session; outstanding wallet
    // requests fail instead of waiting for the timeout
    state.sessions.remove(&session_id);
    wallet.close();
    let _ = session_task.await;

    info!("Player disconnected (session {})", session_id);
}
