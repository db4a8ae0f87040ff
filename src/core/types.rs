// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core data types shared across the pipeline.
//!
//! Defines the modality taxonomy, the wire request, the typed sensor arrays,
//! and the per-frame payload assembled by the backend engine.

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

use crate::core::{Result, SensorError};

// =============================================================================
// Dataset geometry constants (SemanticKITTI)
// =============================================================================

/// Lidar sampling frequency in Hz. Frame timestamps are `frame_id / frequency`.
pub const SAMPLING_FREQUENCY_HZ: f64 = 10.0;

/// Negotiated camera resolution on the wire (width, height).
///
/// KITTI camera frames vary by a few pixels across sequences; both sides agree
/// on this fixed crop so image replies decode without a size header.
pub const CAMERA_WIDTH: usize = 1226;
/// Negotiated camera height on the wire.
pub const CAMERA_HEIGHT: usize = 370;

/// Voxel grid dimensions (x, y, z) at 0.2 m resolution.
pub const VOXEL_GRID_DIMS: [usize; 3] = [256, 256, 32];

/// Total voxel count of one semantic scene completion grid.
pub const VOXEL_COUNT: usize = VOXEL_GRID_DIMS[0] * VOXEL_GRID_DIMS[1] * VOXEL_GRID_DIMS[2];

/// Voxel grid origin in the lidar frame, meters.
pub const VOXEL_ORIGIN: DVec3 = DVec3::new(0.0, -25.6, -2.0);

/// Edge length of one voxel, meters.
pub const VOXEL_SIZE: f64 = 0.2;

/// Metric scene extent covered by the voxel grid (x, y, z), meters.
pub const SCENE_EXTENT: [f64; 3] = [51.2, 51.2, 6.4];

/// Image resolution used for the voxel field-of-view projection (width, height).
pub const PROJECTION_IMAGE_SIZE: (usize, usize) = (1220, 370);

/// Voxel label value marking unknown / invalid voxels after remapping.
pub const VOXEL_INVALID_LABEL: u8 = 255;

/// Voxel ground truth exists only on every `VOXEL_FRAME_STRIDE`-th frame.
pub const VOXEL_FRAME_STRIDE: u64 = 5;

// =============================================================================
// Modality and wire request
// =============================================================================

/// One sensor data kind servable over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    /// Left color camera (`image_2/`)
    CameraLeft,
    /// Right color camera (`image_3/`)
    CameraRight,
    /// Lidar point cloud plus per-point semantic labels
    Lidar,
    /// Semantic voxel grid plus fov mask and extrinsic
    Voxel,
    /// Ego position for the frame
    Trajectory,
}

impl Modality {
    /// Wire name of the modality, as carried in `sensor_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::CameraLeft => "camera-left",
            Modality::CameraRight => "camera-right",
            Modality::Lidar => "lidar",
            Modality::Voxel => "voxel",
            Modality::Trajectory => "trajectory",
        }
    }

    /// Parse a wire name. Unknown names are a malformed request.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "camera-left" => Ok(Modality::CameraLeft),
            "camera-right" => Ok(Modality::CameraRight),
            "lidar" => Ok(Modality::Lidar),
            "voxel" => Ok(Modality::Voxel),
            "trajectory" => Ok(Modality::Trajectory),
            other => Err(SensorError::malformed_request(format!(
                "unknown sensor type: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound request as carried on the wire (JSON text frame).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRequest {
    /// Modality wire name
    pub sensor_type: String,
    /// Sequence id (normalized to 2 digits by the engine)
    pub seq_id: i64,
    /// Frame id (normalized to 6 digits by the engine)
    pub frame_id: i64,
}

impl FrameRequest {
    /// Build a request for one modality of one frame.
    pub fn new(modality: Modality, seq_id: i64, frame_id: i64) -> Self {
        Self {
            sensor_type: modality.as_str().to_string(),
            seq_id,
            frame_id,
        }
    }

    /// Parse and validate the modality field.
    pub fn modality(&self) -> Result<Modality> {
        Modality::parse(&self.sensor_type)
    }
}

// =============================================================================
// Typed sensor arrays
// =============================================================================

/// Raw RGB8 camera frame, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraImage {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// Row-major RGB8 pixel data, `width * height * 3` bytes
    pub data: Vec<u8>,
}

impl CameraImage {
    /// Single black pixel, the zero-valued buffer-memory default.
    pub fn zeroed() -> Self {
        Self {
            width: 1,
            height: 1,
            data: vec![0; 3],
        }
    }
}

/// Lidar point cloud, xyz only (intensity dropped at load time).
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    /// (N, 3) points, meters in the lidar frame
    pub points: Vec<[f32; 3]>,
}

impl PointCloud {
    /// Single zero point, the zero-valued buffer-memory default.
    pub fn zeroed() -> Self {
        Self {
            points: vec![[0.0; 3]],
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the cloud holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-point semantic labels with their display colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    /// Raw semantic class ids, one per point
    pub ids: Vec<u32>,
    /// (N, 3) BGR colors from the fixed class color table
    pub colors: Vec<[u8; 3]>,
}

impl LabelSet {
    /// Single zero label, the zero-valued buffer-memory default.
    pub fn zeroed() -> Self {
        Self {
            ids: vec![0],
            colors: vec![[0; 3]],
        }
    }
}

/// Semantic scene completion voxel grid, 256x256x32 in C order (x-major).
///
/// Values are remapped class ids in `{0..=19}` plus [`VOXEL_INVALID_LABEL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    /// Flat voxel labels, [`VOXEL_COUNT`] entries
    pub voxels: Vec<u8>,
}

impl VoxelGrid {
    /// All-empty grid, the zero-valued buffer-memory default.
    pub fn zeroed() -> Self {
        Self {
            voxels: vec![0; VOXEL_COUNT],
        }
    }

    /// Grid dimensions (x, y, z).
    pub fn dims(&self) -> [usize; 3] {
        VOXEL_GRID_DIMS
    }
}

// =============================================================================
// Per-request payload
// =============================================================================

/// Everything loaded for one (sequence, frame), pre-encode.
///
/// Voxel entries are `None` on frames that carry no voxel ground truth
/// (frame id not a multiple of [`VOXEL_FRAME_STRIDE`]) — a legitimate "off"
/// state, not a failure.
#[derive(Debug, Clone)]
pub struct SensorPayload {
    /// Sequence id, 2-digit form
    pub sequence_id: String,
    /// Frame id, 6-digit form
    pub frame_id: String,
    /// Frame timestamp in seconds, `frame_id / SAMPLING_FREQUENCY_HZ`
    pub timestamp: f64,
    /// Left camera frame
    pub image_left: CameraImage,
    /// Right camera frame
    pub image_right: CameraImage,
    /// Lidar point cloud
    pub point_cloud: PointCloud,
    /// Per-point semantic labels and colors
    pub labels: LabelSet,
    /// Ego position (x, y, z) in the lidar frame
    pub trajectory: DVec3,
    /// Voxel grid, present only on voxel-bearing frames
    pub voxel: Option<VoxelGrid>,
    /// Per-voxel in-frustum mask, present only alongside `voxel`
    pub fov_mask: Option<Vec<bool>>,
    /// Lidar-to-camera extrinsic, present only alongside `voxel`
    pub extrinsic: Option<DMat4>,
}
