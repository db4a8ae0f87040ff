// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! WebSocket client session.
//!
//! Owns at most one connection and serializes requests through a single
//! in-flight slot: the connection lives inside an async mutex, so a second
//! caller suspends until the first request/response exchange completes. The
//! wire protocol carries no correlation id — two requests in flight would
//! make responses unattributable — so the gate is a correctness mechanism,
//! not only a throughput control.
//!
//! Transport failures surface as connection errors and transition the session
//! to disconnected; reconnecting is explicit.

use futures_util::{SinkExt, StreamExt};
use glam::DVec3;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::codec::{
    decode_camera, decode_lidar, decode_trajectory, decode_voxel, DecodedLidar, DecodedVoxel,
};
use crate::core::{CameraImage, FrameRequest, Modality, Result, SensorError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client side of the sensor stream protocol.
pub struct ClientSession {
    // single-slot request gate; also guards connect/disconnect
    conn: tokio::sync::Mutex<Option<WsStream>>,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSession {
    /// Create a disconnected session.
    pub fn new() -> Self {
        Self {
            conn: tokio::sync::Mutex::new(None),
        }
    }

    /// Connect to a server at `host:port`, replacing any prior connection.
    pub async fn connect(&self, addr: &str) -> Result<()> {
        let url = format!("ws://{addr}");
        let (ws, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| SensorError::connection(format!("failed to connect to {url}: {e}")))?;
        info!(%url, "client connected");
        *self.conn.lock().await = Some(ws);
        Ok(())
    }

    /// Close the connection, if any.
    pub async fn disconnect(&self) -> Result<()> {
        let mut conn = self.conn.lock().await;
        if let Some(mut ws) = conn.take() {
            let _ = ws.close(None).await;
            info!("client disconnected");
        }
        Ok(())
    }

    /// True while a connection is held.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Send one request and wait for its binary reply.
    ///
    /// Holds the in-flight gate for the full request/response exchange.
    pub async fn request_raw(
        &self,
        modality: Modality,
        seq_id: i64,
        frame_id: i64,
    ) -> Result<Vec<u8>> {
        let mut conn = self.conn.lock().await;
        let ws = conn
            .as_mut()
            .ok_or_else(|| SensorError::connection("client is not connected"))?;

        let request = FrameRequest::new(modality, seq_id, frame_id);
        let text = serde_json::to_string(&request)
            .map_err(|e| SensorError::malformed_request(format!("request serialization: {e}")))?;
        debug!(%modality, seq_id, frame_id, "sending request");

        if let Err(e) = ws.send(Message::Text(text)).await {
            *conn = None;
            return Err(SensorError::connection(format!("send failed: {e}")));
        }

        loop {
            match ws.next().await {
                Some(Ok(Message::Binary(bytes))) => return Ok(bytes),
                Some(Ok(Message::Text(text))) => {
                    // error-shaped reply; the connection stays usable
                    return Err(server_error(&text));
                }
                Some(Ok(Message::Close(_))) | None => {
                    *conn = None;
                    return Err(SensorError::connection("connection closed by server"));
                }
                Some(Ok(_)) => {} // ping/pong
                Some(Err(e)) => {
                    *conn = None;
                    return Err(SensorError::connection(format!("receive failed: {e}")));
                }
            }
        }
    }

    /// Fetch and decode the left camera frame.
    pub async fn fetch_camera_left(&self, seq_id: i64, frame_id: i64) -> Result<CameraImage> {
        let raw = self.request_raw(Modality::CameraLeft, seq_id, frame_id).await?;
        decode_camera(&raw)
    }

    /// Fetch and decode the right camera frame.
    pub async fn fetch_camera_right(&self, seq_id: i64, frame_id: i64) -> Result<CameraImage> {
        let raw = self.request_raw(Modality::CameraRight, seq_id, frame_id).await?;
        decode_camera(&raw)
    }

    /// Fetch and decode the lidar point cloud and labels.
    pub async fn fetch_lidar(&self, seq_id: i64, frame_id: i64) -> Result<DecodedLidar> {
        let raw = self.request_raw(Modality::Lidar, seq_id, frame_id).await?;
        decode_lidar(&raw)
    }

    /// Fetch and decode the voxel grid, fov mask, and extrinsic.
    pub async fn fetch_voxel(&self, seq_id: i64, frame_id: i64) -> Result<DecodedVoxel> {
        let raw = self.request_raw(Modality::Voxel, seq_id, frame_id).await?;
        decode_voxel(&raw)
    }

    /// Fetch and decode the ego position.
    pub async fn fetch_trajectory(&self, seq_id: i64, frame_id: i64) -> Result<DVec3> {
        let raw = self.request_raw(Modality::Trajectory, seq_id, frame_id).await?;
        decode_trajectory(&raw)
    }
}

/// Map an error-shaped text reply to a client-side error.
fn server_error(text: &str) -> SensorError {
    #[derive(serde::Deserialize)]
    struct ErrorReply {
        error: String,
    }
    match serde_json::from_str::<ErrorReply>(text) {
        Ok(reply) => SensorError::Other(format!("server rejected request: {}", reply.error)),
        Err(_) => SensorError::Other(format!("unexpected text reply: {text}")),
    }
}
