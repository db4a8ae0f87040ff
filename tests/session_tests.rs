// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! End-to-end server/client session tests over loopback WebSocket.
//!
//! Each test binds an ephemeral port over a miniature dataset fixture, runs
//! the server in a background task, and drives it through the client (or raw
//! frames for protocol-violation cases).

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use kittistream::core::{SensorError, VOXEL_COUNT, CAMERA_HEIGHT, CAMERA_WIDTH};
use kittistream::engine::BackendEngine;
use kittistream::net::{ClientSession, ServerSession, ShutdownHandle};

mod common;
use common::*;

async fn start_server(root: &std::path::Path) -> (SocketAddr, ShutdownHandle) {
    let engine = BackendEngine::new(root, test_remap());
    let server = ServerSession::bind("127.0.0.1:0", engine)
        .await
        .expect("bind server");
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    tokio::spawn(server.run());
    (addr, shutdown)
}

// ============================================================================
// Typed fetches
// ============================================================================

#[tokio::test]
async fn test_fetch_trajectory() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let (addr, shutdown) = start_server(&root).await;

    let client = ClientSession::new();
    client.connect(&addr.to_string()).await.unwrap();

    let xyz = client.fetch_trajectory(0, 0).await.unwrap();
    assert_eq!(xyz, glam::DVec3::new(1.0, 2.0, 3.0));
    let xyz = client.fetch_trajectory(0, 2).await.unwrap();
    assert_eq!(xyz, glam::DVec3::new(7.0, 8.0, 9.0));

    client.disconnect().await.unwrap();
    shutdown.shutdown();
}

#[tokio::test]
async fn test_fetch_lidar() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let (addr, shutdown) = start_server(&root).await;

    let client = ClientSession::new();
    client.connect(&addr.to_string()).await.unwrap();

    let lidar = client.fetch_lidar(0, 0).await.unwrap();
    assert_eq!(lidar.points.points, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    assert_eq!(lidar.labels, vec![10.0, 40.0]);

    client.disconnect().await.unwrap();
    shutdown.shutdown();
}

#[tokio::test]
async fn test_fetch_camera() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let (addr, shutdown) = start_server(&root).await;

    let client = ClientSession::new();
    client.connect(&addr.to_string()).await.unwrap();

    let image = client.fetch_camera_left(0, 0).await.unwrap();
    assert_eq!(image.width, CAMERA_WIDTH);
    assert_eq!(image.height, CAMERA_HEIGHT);
    // the 8x6 fixture lands in the top-left corner, zero-padded elsewhere
    assert_eq!(&image.data[..3], &[10, 20, 30]);
    assert_eq!(&image.data[8 * 3..8 * 3 + 3], &[0, 0, 0]);

    client.disconnect().await.unwrap();
    shutdown.shutdown();
}

#[tokio::test]
async fn test_fetch_voxel() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let (addr, shutdown) = start_server(&root).await;

    let client = ClientSession::new();
    client.connect(&addr.to_string()).await.unwrap();

    let voxel = client.fetch_voxel(0, 0).await.unwrap();
    assert_eq!(voxel.grid.voxels.len(), VOXEL_COUNT);
    assert!(voxel.grid.voxels.iter().all(|&v| v == 1));
    assert_eq!(voxel.fov_mask.len(), VOXEL_COUNT);
    assert_eq!(voxel.extrinsic, glam::DMat4::IDENTITY);

    client.disconnect().await.unwrap();
    shutdown.shutdown();
}

// ============================================================================
// Error replies keep the connection open
// ============================================================================

#[tokio::test]
async fn test_voxel_on_non_stride_frame_is_rejected_politely() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let (addr, shutdown) = start_server(&root).await;

    let client = ClientSession::new();
    client.connect(&addr.to_string()).await.unwrap();

    let err = client.fetch_voxel(0, 2).await.unwrap_err();
    assert!(matches!(err, SensorError::Other(ref msg) if msg.contains("server rejected")));

    // the connection survives the rejection
    assert!(client.is_connected().await);
    let xyz = client.fetch_trajectory(0, 0).await.unwrap();
    assert_eq!(xyz, glam::DVec3::new(1.0, 2.0, 3.0));

    client.disconnect().await.unwrap();
    shutdown.shutdown();
}

#[tokio::test]
async fn test_malformed_request_gets_error_reply() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let (addr, shutdown) = start_server(&root).await;

    let url = format!("ws://{addr}");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

    // not JSON at all
    ws.send(Message::Text("not json".into())).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    match reply {
        Message::Text(text) => assert!(text.contains("\"error\"")),
        other => panic!("expected text error reply, got {other:?}"),
    }

    // binary inbound frames are a protocol violation
    ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert!(matches!(reply, Message::Text(ref t) if t.contains("\"error\"")));

    // a valid request on the same connection still gets a binary reply
    let request =
        serde_json::json!({ "sensor_type": "trajectory", "seq_id": 0, "frame_id": 0 });
    ws.send(Message::Text(request.to_string())).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert!(matches!(reply, Message::Binary(ref b) if b.len() == 24));

    ws.close(None).await.unwrap();
    shutdown.shutdown();
}

#[tokio::test]
async fn test_unknown_sequence_gets_error_reply() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let (addr, shutdown) = start_server(&root).await;

    let client = ClientSession::new();
    client.connect(&addr.to_string()).await.unwrap();

    let err = client.fetch_trajectory(42, 0).await.unwrap_err();
    assert!(matches!(err, SensorError::Other(ref msg) if msg.contains("server rejected")));
    assert!(client.is_connected().await);

    client.disconnect().await.unwrap();
    shutdown.shutdown();
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_request_without_connection_fails() {
    let client = ClientSession::new();
    let err = client.fetch_trajectory(0, 0).await.unwrap_err();
    assert!(matches!(err, SensorError::ConnectionError { .. }));
    assert!(!client.is_connected().await);
}

#[tokio::test]
async fn test_shutdown_closes_peers() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let (addr, shutdown) = start_server(&root).await;

    let client = ClientSession::new();
    client.connect(&addr.to_string()).await.unwrap();
    client.fetch_trajectory(0, 0).await.unwrap();

    shutdown.shutdown();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    // the server closes the websocket; the next request observes it
    let result = client.fetch_trajectory(0, 0).await;
    assert!(result.is_err());
    assert!(!client.is_connected().await);
}
