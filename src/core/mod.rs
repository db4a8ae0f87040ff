// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout kittistream.
//!
//! This module provides the foundational types for the library:
//! - [`SensorError`] - Comprehensive error handling
//! - [`Modality`] - Sensor data kind identifier
//! - [`FrameRequest`] / [`SensorPayload`] - Wire request and per-frame payload
//! - Dataset geometry constants

pub mod error;
pub mod types;

pub use error::{Result, SensorError};
pub use types::{
    CameraImage, FrameRequest, LabelSet, Modality, PointCloud, SensorPayload, VoxelGrid,
    CAMERA_HEIGHT, CAMERA_WIDTH, PROJECTION_IMAGE_SIZE, SAMPLING_FREQUENCY_HZ, SCENE_EXTENT,
    VOXEL_COUNT, VOXEL_FRAME_STRIDE, VOXEL_GRID_DIMS, VOXEL_INVALID_LABEL, VOXEL_ORIGIN,
    VOXEL_SIZE,
};
