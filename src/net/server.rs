// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! WebSocket server session.
//!
//! Accepts duplex connections and serves one peer per task. Per inbound text
//! message the handler parses the JSON request, runs it through the backend
//! engine and the codec, and writes exactly one binary reply before reading
//! the next message — no pipelining within a connection. Malformed requests
//! and per-request codec failures produce an error-shaped JSON text reply and
//! leave the connection open.
//!
//! The engine is shared across peer tasks behind an async mutex: a slow load
//! for one peer stalls dispatch for the others, a deliberate
//! simplicity-over-isolation trade-off. The only other shared state is the
//! connected-peer set, mutated by insert/remove alone.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::codec::encode_response;
use crate::core::{FrameRequest, Result, SensorError};
use crate::engine::BackendEngine;

/// Handle for stopping a running server from another task.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Signal the accept loop and all peer tasks to stop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// WebSocket server bound to one address, serving one backend engine.
pub struct ServerSession {
    listener: TcpListener,
    local_addr: SocketAddr,
    engine: Arc<Mutex<BackendEngine>>,
    peers: Arc<StdMutex<HashSet<SocketAddr>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl ServerSession {
    /// Bind to `addr` and take ownership of the engine.
    pub async fn bind(addr: &str, engine: BackendEngine) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SensorError::connection(format!("failed to bind {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| SensorError::connection(format!("failed to resolve bind address: {e}")))?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            listener,
            local_addr,
            engine: Arc::new(Mutex::new(engine)),
            peers: Arc::new(StdMutex::new(HashSet::new())),
            shutdown_tx,
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.peers.lock().expect("peer set lock poisoned").len()
    }

    /// Handle for stopping the server.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Accept connections until shut down, spawning one task per peer.
    pub async fn run(self) -> Result<()> {
        info!(addr = %self.local_addr, "server listening");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer_addr) = accepted.map_err(|e| {
                        SensorError::connection(format!("accept failed: {e}"))
                    })?;
                    let engine = Arc::clone(&self.engine);
                    let peers = Arc::clone(&self.peers);
                    let peer_shutdown = self.shutdown_tx.subscribe();
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_peer(stream, peer_addr, engine, peers, peer_shutdown).await
                        {
                            warn!(peer = %peer_addr, error = %e, "peer task ended with error");
                        }
                    });
                }
                _ = shutdown_rx.changed() => {
                    info!("server shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Serve one peer connection until it closes or the server shuts down.
async fn handle_peer(
    stream: TcpStream,
    peer_addr: SocketAddr,
    engine: Arc<Mutex<BackendEngine>>,
    peers: Arc<StdMutex<HashSet<SocketAddr>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let mut ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| SensorError::connection(format!("websocket handshake failed: {e}")))?;

    peers
        .lock()
        .expect("peer set lock poisoned")
        .insert(peer_addr);
    info!(peer = %peer_addr, "peer connected");

    let result = loop {
        tokio::select! {
            message = ws.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        // one reply per request, in request order
                        let reply = match serve_request(&engine, &text).await {
                            Ok(bytes) => Message::Binary(bytes),
                            Err(e) => {
                                debug!(peer = %peer_addr, error = %e, "request failed");
                                error_reply(&e)
                            }
                        };
                        if let Err(e) = ws.send(reply).await {
                            break Err(SensorError::connection(format!("send failed: {e}")));
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let err = SensorError::malformed_request("expected a JSON text frame");
                        if let Err(e) = ws.send(error_reply(&err)).await {
                            break Err(SensorError::connection(format!("send failed: {e}")));
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => {} // ping/pong handled by tungstenite
                    Some(Err(e)) => {
                        break Err(SensorError::connection(format!("receive failed: {e}")));
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                let _ = ws.close(None).await;
                break Ok(());
            }
        }
    };

    peers
        .lock()
        .expect("peer set lock poisoned")
        .remove(&peer_addr);
    info!(peer = %peer_addr, "peer disconnected");
    result
}

/// Parse one request and produce its binary reply.
async fn serve_request(engine: &Mutex<BackendEngine>, text: &str) -> Result<Vec<u8>> {
    let request: FrameRequest = serde_json::from_str(text)
        .map_err(|e| SensorError::malformed_request(format!("invalid request JSON: {e}")))?;
    let modality = request.modality()?;

    debug!(
        modality = %modality,
        seq_id = request.seq_id,
        frame_id = request.frame_id,
        "processing request"
    );
    let payload = engine.lock().await.process(request.seq_id, request.frame_id)?;
    encode_response(modality, &payload)
}

/// Error-shaped JSON text reply; the connection stays open.
fn error_reply(err: &SensorError) -> Message {
    let body = serde_json::json!({ "error": err.to_string() });
    Message::Text(body.to_string())
}
