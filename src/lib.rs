// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Kittistream
//!
//! Sensor-data serving pipeline for autonomous-driving log replay over
//! SemanticKITTI-style datasets.
//!
//! A server loads per-frame multi-modal sensor data (stereo images, lidar
//! point cloud + semantic labels, semantic voxel grid, ego trajectory) from
//! an on-disk sequence/frame tree, encodes the requested modality into a
//! compact binary representation, and ships it over a persistent WebSocket
//! connection to a client, which decodes it into typed arrays for rendering.
//!
//! ## Architecture
//!
//! The library is organized into pipeline stages:
//! - `dataset/` - stateless per-format file readers
//! - `engine/` - per-frame load/cache/fallback orchestration
//! - `codec/` - per-modality binary framing and compression
//! - `net/` - WebSocket server and client sessions
//! - `config` - TOML configuration
//!
//! ## Example: serving a dataset
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use kittistream::dataset::RemapTable;
//! use kittistream::engine::BackendEngine;
//! use kittistream::net::ServerSession;
//!
//! let remap = RemapTable::from_file("configs/remap.txt")?;
//! let engine = BackendEngine::new("/data/semantic_kitti/dataset", remap);
//! let server = ServerSession::bind("127.0.0.1:8765", engine).await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: fetching one frame
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use kittistream::net::ClientSession;
//!
//! let client = ClientSession::new();
//! client.connect("127.0.0.1:8765").await?;
//! let lidar = client.fetch_lidar(0, 40).await?;
//! println!("points: {}", lidar.points.len());
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{
    CameraImage, FrameRequest, LabelSet, Modality, PointCloud, Result, SensorError, SensorPayload,
    VoxelGrid,
};

// Dataset file readers
pub mod dataset;

// Per-frame load/cache/fallback pipeline
pub mod engine;

pub use engine::{BackendEngine, EngineStats, ProblemFlags, StaticSequenceData};

// Per-modality wire codec
pub mod codec;

pub use codec::{DecodedLidar, DecodedVoxel};

// Transport sessions
pub mod net;

pub use net::{ClientSession, ServerSession};

// Configuration
pub mod config;

pub use config::Config;
