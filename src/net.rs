// ==============================================================================
// net.rs — WEBSOCKET BRIDGE (REMOTE CONTACTS IN, FRICTION REPORTS OUT)
// ------------------------------------------------------------------------------
// Client -> server:
//   {"type":"ping"}
//   {"type":"contacts","topic":"~/tire::wheel::tread/contacts","batch":{...}}
// Server -> client:
//   {"type":"welcome","client_id":"..."}
//   {"type":"pong"}
//   {"type":"friction","tick":42,"mu":1.05}
//
// Contact batches are published on the in-process transport exactly like the
// physics loop's own batches, so a remote engine can drive the estimator.
// ==============================================================================

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::Message;
use uuid::Uuid;

use crate::slip_friction::ContactBatch;
use crate::transport::ContactTransport;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Ping,
    Contacts { topic: String, batch: ContactBatch },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Welcome { client_id: String },
    Pong,
    Friction { tick: u64, mu: f32 },
}

impl ServerMessage {
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

/// Bind `addr` and serve clients until the listener fails.
pub async fn start_websocket_server(
    addr: String,
    transport: Arc<ContactTransport>,
    reports: broadcast::Sender<ServerMessage>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("websocket listening on ws://{addr}");

    loop {
        let (raw, peer) = listener.accept().await?;
        debug!(%peer, "tcp connection");
        tokio::spawn(handle_client(raw, Arc::clone(&transport), reports.subscribe()));
    }
}

async fn handle_client(
    raw: TcpStream,
    transport: Arc<ContactTransport>,
    mut reports: broadcast::Receiver<ServerMessage>,
) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("websocket handshake failed: {e}");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let send_loop = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                direct = rx.recv() => match direct {
                    Some(m) => m,
                    None => break,
                },
                report = reports.recv() => match report {
                    Ok(m) => m,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "client lagging behind friction reports");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            let Some(text) = msg.to_json() else { continue };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Welcome
    // -------------------------------
    let client_id = Uuid::new_v4().to_string();
    info!(%client_id, "client connected");
    let _ = tx.send(ServerMessage::Welcome { client_id: client_id.clone() });

    // -------------------------------
    // 3) Main receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };

        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else { continue };

        let parsed: ClientMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                debug!(%client_id, "ignoring malformed message: {e}");
                continue;
            }
        };

        match parsed {
            ClientMessage::Ping => {
                let _ = tx.send(ServerMessage::Pong);
            }
            ClientMessage::Contacts { topic, batch } => {
                if let Err(e) = transport.publish(&topic, batch) {
                    debug!(%client_id, "{e}");
                }
            }
        }
    }

    info!(%client_id, "client disconnected");
    drop(tx);
    send_loop.abort();
}
