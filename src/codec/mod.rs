// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Per-modality wire codec: typed arrays to compact binary replies and back.
//!
//! The server encodes, the client applies the exact inverse. Layouts:
//!
//! - **camera-left / camera-right**: raw row-major RGB8 at the fixed
//!   negotiated resolution (1226x370), bzip2-compressed.
//! - **lidar**: point bytes (N x 3 LE f32) + `__SPLIT__` + label bytes
//!   (N x 1 LE f32), DEFLATE-compressed. Decode must find exactly 2 parts.
//! - **voxel**: volume bytes (u8 per voxel) + `__SPLIT__` + fov-mask bytes
//!   (one 0/1 byte per voxel) + `__SPLIT__` + extrinsic (16 LE f64,
//!   row-major), DEFLATE-compressed. Decode must find exactly 3 parts.
//! - **trajectory**: 3 raw LE f64, uncompressed — too small to benefit from
//!   compression.
//!
//! Compression is chosen per modality by payload size and compressibility.
//! Delimiter framing avoids length prefixes at the cost of requiring payloads
//! to never contain the delimiter bytes.

use std::io::Read;

use bzip2::read::{BzDecoder, BzEncoder};
use flate2::read::{DeflateDecoder, DeflateEncoder};
use glam::{DMat4, DVec3};

use crate::core::{
    CameraImage, LabelSet, Modality, PointCloud, Result, SensorError, SensorPayload, VoxelGrid,
    CAMERA_HEIGHT, CAMERA_WIDTH, VOXEL_COUNT,
};

/// ASCII delimiter separating parts of a multi-part payload.
pub const PAYLOAD_DELIMITER: &[u8] = b"__SPLIT__";

// =============================================================================
// Compression helpers
// =============================================================================

fn bzip2_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(data, bzip2::Compression::default());
    let mut out = Vec::new();
    encoder
        .read_to_end(&mut out)
        .map_err(|e| SensorError::codec("camera", format!("bzip2 compression failed: {e}")))?;
    Ok(out)
}

fn bzip2_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = BzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| SensorError::codec("camera", format!("bzip2 decompression failed: {e}")))?;
    Ok(out)
}

fn deflate_compress(modality: Modality, data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(data, flate2::Compression::default());
    let mut out = Vec::new();
    encoder.read_to_end(&mut out).map_err(|e| {
        SensorError::codec(modality.as_str(), format!("deflate compression failed: {e}"))
    })?;
    Ok(out)
}

fn deflate_decompress(modality: Modality, data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| {
        SensorError::codec(modality.as_str(), format!("deflate decompression failed: {e}"))
    })?;
    Ok(out)
}

// =============================================================================
// Delimiter framing
// =============================================================================

/// Split `data` on every delimiter occurrence and require exactly
/// `expected` parts; any other count is a framing error.
fn split_parts<'a>(modality: Modality, data: &'a [u8], expected: usize) -> Result<Vec<&'a [u8]>> {
    let mut parts = Vec::new();
    let mut rest = data;
    while let Some(pos) = find_delimiter(rest) {
        parts.push(&rest[..pos]);
        rest = &rest[pos + PAYLOAD_DELIMITER.len()..];
    }
    parts.push(rest);

    if parts.len() != expected {
        return Err(SensorError::framing(
            modality.as_str(),
            expected,
            parts.len(),
        ));
    }
    Ok(parts)
}

fn find_delimiter(data: &[u8]) -> Option<usize> {
    data.windows(PAYLOAD_DELIMITER.len())
        .position(|w| w == PAYLOAD_DELIMITER)
}

// =============================================================================
// Camera
// =============================================================================

/// Encode a camera frame: crop or zero-pad to the fixed negotiated
/// resolution, then bzip2-compress the raw pixel buffer.
pub fn encode_camera(image: &CameraImage) -> Result<Vec<u8>> {
    let mut fixed = vec![0u8; CAMERA_WIDTH * CAMERA_HEIGHT * 3];
    let copy_cols = image.width.min(CAMERA_WIDTH);
    let copy_rows = image.height.min(CAMERA_HEIGHT);
    for row in 0..copy_rows {
        let src = row * image.width * 3;
        let dst = row * CAMERA_WIDTH * 3;
        fixed[dst..dst + copy_cols * 3].copy_from_slice(&image.data[src..src + copy_cols * 3]);
    }
    bzip2_compress(&fixed)
}

/// Decode a camera reply into a frame at the fixed negotiated resolution.
pub fn decode_camera(raw: &[u8]) -> Result<CameraImage> {
    let data = bzip2_decompress(raw)?;
    let expected = CAMERA_WIDTH * CAMERA_HEIGHT * 3;
    if data.len() != expected {
        return Err(SensorError::codec(
            "camera",
            format!("decoded {} bytes, expected {expected}", data.len()),
        ));
    }
    Ok(CameraImage {
        width: CAMERA_WIDTH,
        height: CAMERA_HEIGHT,
        data,
    })
}

// =============================================================================
// Lidar
// =============================================================================

/// Lidar reply decoded client-side.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLidar {
    /// (N, 3) point cloud
    pub points: PointCloud,
    /// (N, 1) label ids as f32, the wire representation
    pub labels: Vec<f32>,
}

/// Encode a lidar reply: point bytes + delimiter + label bytes, deflated.
///
/// Label ids travel as f32 so both parts decode with one element width.
pub fn encode_lidar(cloud: &PointCloud, labels: &LabelSet) -> Result<Vec<u8>> {
    let mut framed = Vec::with_capacity(
        cloud.len() * 12 + PAYLOAD_DELIMITER.len() + labels.ids.len() * 4,
    );
    for point in &cloud.points {
        for c in point {
            framed.extend_from_slice(&c.to_le_bytes());
        }
    }
    framed.extend_from_slice(PAYLOAD_DELIMITER);
    for &id in &labels.ids {
        framed.extend_from_slice(&(id as f32).to_le_bytes());
    }
    deflate_compress(Modality::Lidar, &framed)
}

/// Decode a lidar reply into points and f32 labels.
pub fn decode_lidar(raw: &[u8]) -> Result<DecodedLidar> {
    let data = deflate_decompress(Modality::Lidar, raw)?;
    let parts = split_parts(Modality::Lidar, &data, 2)?;

    let point_bytes = parts[0];
    if point_bytes.len() % 12 != 0 {
        return Err(SensorError::codec(
            "lidar",
            format!("point part has {} bytes, not a multiple of 12", point_bytes.len()),
        ));
    }
    let points = point_bytes
        .chunks_exact(12)
        .map(|b| {
            [
                f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                f32::from_le_bytes([b[4], b[5], b[6], b[7]]),
                f32::from_le_bytes([b[8], b[9], b[10], b[11]]),
            ]
        })
        .collect();

    let label_bytes = parts[1];
    if label_bytes.len() % 4 != 0 {
        return Err(SensorError::codec(
            "lidar",
            format!("label part has {} bytes, not a multiple of 4", label_bytes.len()),
        ));
    }
    let labels = label_bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(DecodedLidar {
        points: PointCloud { points },
        labels,
    })
}

// =============================================================================
// Voxel
// =============================================================================

/// Voxel reply decoded client-side.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedVoxel {
    /// 256x256x32 semantic grid
    pub grid: VoxelGrid,
    /// Per-voxel camera field-of-view mask
    pub fov_mask: Vec<bool>,
    /// Lidar-to-camera extrinsic
    pub extrinsic: DMat4,
}

/// Encode a voxel reply: volume + delimiter + fov mask + delimiter +
/// extrinsic, deflated.
pub fn encode_voxel(grid: &VoxelGrid, fov_mask: &[bool], extrinsic: &DMat4) -> Result<Vec<u8>> {
    let mut framed =
        Vec::with_capacity(grid.voxels.len() + fov_mask.len() + 2 * PAYLOAD_DELIMITER.len() + 128);
    framed.extend_from_slice(&grid.voxels);
    framed.extend_from_slice(PAYLOAD_DELIMITER);
    framed.extend(fov_mask.iter().map(|&b| b as u8));
    framed.extend_from_slice(PAYLOAD_DELIMITER);
    // row-major to match the (4, 4) layout the renderer expects
    for value in extrinsic.transpose().to_cols_array() {
        framed.extend_from_slice(&value.to_le_bytes());
    }
    deflate_compress(Modality::Voxel, &framed)
}

/// Decode a voxel reply into grid, fov mask, and extrinsic.
pub fn decode_voxel(raw: &[u8]) -> Result<DecodedVoxel> {
    let data = deflate_decompress(Modality::Voxel, raw)?;
    let parts = split_parts(Modality::Voxel, &data, 3)?;

    let voxel_bytes = parts[0];
    if voxel_bytes.len() != VOXEL_COUNT {
        return Err(SensorError::codec(
            "voxel",
            format!("volume part has {} bytes, expected {VOXEL_COUNT}", voxel_bytes.len()),
        ));
    }

    let mask_bytes = parts[1];
    if mask_bytes.len() != VOXEL_COUNT {
        return Err(SensorError::codec(
            "voxel",
            format!("fov mask part has {} bytes, expected {VOXEL_COUNT}", mask_bytes.len()),
        ));
    }

    let extrinsic_bytes = parts[2];
    if extrinsic_bytes.len() != 16 * 8 {
        return Err(SensorError::codec(
            "voxel",
            format!("extrinsic part has {} bytes, expected 128", extrinsic_bytes.len()),
        ));
    }
    let mut row_major = [0f64; 16];
    for (value, b) in row_major.iter_mut().zip(extrinsic_bytes.chunks_exact(8)) {
        *value = f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
    }

    Ok(DecodedVoxel {
        grid: VoxelGrid {
            voxels: voxel_bytes.to_vec(),
        },
        fov_mask: mask_bytes.iter().map(|&b| b != 0).collect(),
        extrinsic: DMat4::from_cols_array(&row_major).transpose(),
    })
}

// =============================================================================
// Trajectory
// =============================================================================

/// Encode a trajectory reply: 3 raw LE f64, uncompressed.
pub fn encode_trajectory(xyz: DVec3) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    out.extend_from_slice(&xyz.x.to_le_bytes());
    out.extend_from_slice(&xyz.y.to_le_bytes());
    out.extend_from_slice(&xyz.z.to_le_bytes());
    out
}

/// Decode a trajectory reply.
pub fn decode_trajectory(raw: &[u8]) -> Result<DVec3> {
    if raw.len() != 24 {
        return Err(SensorError::codec(
            "trajectory",
            format!("reply has {} bytes, expected 24", raw.len()),
        ));
    }
    let read = |i: usize| {
        f64::from_le_bytes([
            raw[i],
            raw[i + 1],
            raw[i + 2],
            raw[i + 3],
            raw[i + 4],
            raw[i + 5],
            raw[i + 6],
            raw[i + 7],
        ])
    };
    Ok(DVec3::new(read(0), read(8), read(16)))
}

// =============================================================================
// Dispatch
// =============================================================================

/// Encode the requested modality of a processed payload.
///
/// A voxel request on a frame that carries no voxel ground truth (frame id
/// not a multiple of 5) fails here; the server turns that into an
/// error-shaped reply.
pub fn encode_response(modality: Modality, payload: &SensorPayload) -> Result<Vec<u8>> {
    match modality {
        Modality::CameraLeft => encode_camera(&payload.image_left),
        Modality::CameraRight => encode_camera(&payload.image_right),
        Modality::Lidar => encode_lidar(&payload.point_cloud, &payload.labels),
        Modality::Voxel => {
            match (&payload.voxel, &payload.fov_mask, &payload.extrinsic) {
                (Some(grid), Some(mask), Some(extrinsic)) => encode_voxel(grid, mask, extrinsic),
                _ => Err(SensorError::codec(
                    "voxel",
                    format!(
                        "frame {} carries no voxel ground truth (ids are multiples of 5)",
                        payload.frame_id
                    ),
                )),
            }
        }
        Modality::Trajectory => Ok(encode_trajectory(payload.trajectory)),
    }
}
