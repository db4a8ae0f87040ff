// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Lidar point cloud and per-point label readers.
//!
//! `velodyne/FFFFFF.bin` is a flat little-endian f32 buffer of
//! `[x, y, z, intensity]` quadruples; only xyz is kept. `labels/FFFFFF.label`
//! is a flat little-endian u32 buffer of semantic class ids, colored through
//! the fixed SemanticKITTI class table.

use std::fs;
use std::path::Path;

use crate::core::{LabelSet, PointCloud, Result, SensorError};

/// Bytes per point record in a velodyne `.bin` file (4 x f32).
const POINT_RECORD_BYTES: usize = 16;

/// Read a point cloud, keeping only xyz.
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let raw = fs::read(path).map_err(|e| SensorError::io(path, &e))?;

    if raw.len() % POINT_RECORD_BYTES != 0 {
        return Err(SensorError::parse(
            "velodyne bin",
            format!(
                "{} has {} bytes, not a multiple of {POINT_RECORD_BYTES}",
                path.display(),
                raw.len()
            ),
        ));
    }

    let points = raw
        .chunks_exact(POINT_RECORD_BYTES)
        .map(|record| {
            [
                f32::from_le_bytes([record[0], record[1], record[2], record[3]]),
                f32::from_le_bytes([record[4], record[5], record[6], record[7]]),
                f32::from_le_bytes([record[8], record[9], record[10], record[11]]),
            ]
        })
        .collect();

    Ok(PointCloud { points })
}

/// Read per-point labels and derive their display colors.
pub fn read_labels_and_colors<P: AsRef<Path>>(path: P) -> Result<LabelSet> {
    let path = path.as_ref();
    let raw = fs::read(path).map_err(|e| SensorError::io(path, &e))?;

    if raw.len() % 4 != 0 {
        return Err(SensorError::parse(
            "label file",
            format!(
                "{} has {} bytes, not a multiple of 4",
                path.display(),
                raw.len()
            ),
        ));
    }

    let ids: Vec<u32> = raw
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let colors = ids.iter().map(|&id| class_color(id)).collect();

    Ok(LabelSet { ids, colors })
}

/// BGR display color for a raw semantic class id.
///
/// Unknown ids fall back to black, matching the dataset tooling.
pub fn class_color(class_id: u32) -> [u8; 3] {
    match class_id {
        0 => [0, 0, 0],        // unlabeled
        1 => [0, 0, 255],      // outlier
        10 => [245, 150, 100], // car
        11 => [245, 230, 100], // bicycle
        13 => [250, 80, 100],  // bus
        15 => [150, 60, 30],   // motorcycle
        16 => [255, 0, 0],     // on-rails
        18 => [180, 30, 80],   // truck
        20 => [255, 0, 0],     // other-vehicle
        30 => [30, 30, 255],   // person
        31 => [200, 40, 255],  // bicyclist
        32 => [90, 30, 150],   // motorcyclist
        40 => [255, 0, 255],   // road
        44 => [255, 150, 255], // parking
        48 => [75, 0, 75],     // sidewalk
        49 => [75, 0, 175],    // other-ground
        50 => [0, 200, 255],   // building
        51 => [50, 120, 255],  // fence
        52 => [0, 150, 255],   // other-structure
        60 => [170, 255, 150], // lane-marking
        70 => [0, 175, 0],     // vegetation
        71 => [0, 60, 135],    // trunk
        72 => [80, 240, 150],  // terrain
        80 => [150, 240, 255], // pole
        81 => [0, 0, 255],     // traffic-sign
        99 => [255, 255, 50],  // other-object
        252 => [245, 150, 100], // moving-car
        253 => [200, 40, 255],  // moving-bicyclist
        254 => [30, 30, 255],   // moving-person
        255 => [90, 30, 150],   // moving-motorcyclist
        256 => [255, 0, 0],     // moving-on-rails
        257 => [250, 80, 100],  // moving-bus
        258 => [180, 30, 80],   // moving-truck
        259 => [255, 0, 0],     // moving-other-vehicle
        _ => [0, 0, 0],
    }
}
