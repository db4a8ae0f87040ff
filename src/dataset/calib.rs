// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Calibration and pose file readers.
//!
//! `calib.txt` is line-oriented `KEY: v0 v1 ... v11`; parsing stops at the
//! first blank line. `P2` is the left-camera 3x4 projection, `Tr` the lidar
//! to camera transform embedded into a 4x4 homogeneous matrix.
//!
//! `poses.txt` carries one 12-value row-major 3x4 pose per frame, expressed
//! in the camera frame. Poses are re-expressed in the lidar frame via
//! `Tr⁻¹ · pose · Tr` before any lookup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{DMat3, DMat4, DVec3};

use crate::core::{Result, SensorError};

/// Per-sequence calibration as read from `calib.txt`.
#[derive(Debug, Clone)]
pub struct Calibration {
    /// `P2` camera projection, row-major 3x4
    pub projection: [f64; 12],
    /// `Tr` lidar-to-camera transform, homogeneous 4x4
    pub extrinsic: DMat4,
}

impl Calibration {
    /// Intrinsic 3x3 block of the `P2` projection.
    pub fn intrinsic(&self) -> DMat3 {
        let p = &self.projection;
        // glam is column-major; P2 rows become matrix rows via transpose
        DMat3::from_cols_array(&[p[0], p[1], p[2], p[4], p[5], p[6], p[8], p[9], p[10]]).transpose()
    }
}

/// Build a 4x4 homogeneous matrix from a row-major 3x4 block.
pub(crate) fn mat4_from_rows_3x4(rows: &[f64]) -> DMat4 {
    debug_assert_eq!(rows.len(), 12);
    let row_major = [
        rows[0], rows[1], rows[2], rows[3], //
        rows[4], rows[5], rows[6], rows[7], //
        rows[8], rows[9], rows[10], rows[11], //
        0.0, 0.0, 0.0, 1.0,
    ];
    DMat4::from_cols_array(&row_major).transpose()
}

/// Read `calib.txt`, stopping at the first blank line.
pub fn read_calibration<P: AsRef<Path>>(path: P) -> Result<Calibration> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| SensorError::io(path, &e))?;

    let mut entries: HashMap<String, Vec<f64>> = HashMap::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        let (key, values) = line.split_once(':').ok_or_else(|| {
            SensorError::parse("calib.txt", format!("missing ':' separator in line: {line}"))
        })?;
        let values: Vec<f64> = values
            .split_whitespace()
            .map(|v| {
                v.parse::<f64>().map_err(|e| {
                    SensorError::parse("calib.txt", format!("bad value '{v}' for {key}: {e}"))
                })
            })
            .collect::<Result<_>>()?;
        entries.insert(key.trim().to_string(), values);
    }

    let projection = calib_block(&entries, "P2")?;
    let tr = calib_block(&entries, "Tr")?;

    Ok(Calibration {
        projection,
        extrinsic: mat4_from_rows_3x4(&tr),
    })
}

fn calib_block(entries: &HashMap<String, Vec<f64>>, key: &str) -> Result<[f64; 12]> {
    let values = entries
        .get(key)
        .ok_or_else(|| SensorError::parse("calib.txt", format!("missing {key} entry")))?;
    if values.len() != 12 {
        return Err(SensorError::parse(
            "calib.txt",
            format!("{key} has {} values, expected 12", values.len()),
        ));
    }
    let mut block = [0.0; 12];
    block.copy_from_slice(values);
    Ok(block)
}

/// Read `poses.txt` and re-express every pose in the lidar frame.
pub fn read_poses<P: AsRef<Path>>(path: P, calib: &Calibration) -> Result<Vec<DMat4>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| SensorError::io(path, &e))?;

    let tr = calib.extrinsic;
    let tr_inv = tr.inverse();

    let mut poses = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values: Vec<f64> = line
            .split_whitespace()
            .map(|v| {
                v.parse::<f64>().map_err(|e| {
                    SensorError::parse(
                        "poses.txt",
                        format!("bad value '{v}' on line {}: {e}", line_no + 1),
                    )
                })
            })
            .collect::<Result<_>>()?;
        if values.len() != 12 {
            return Err(SensorError::parse(
                "poses.txt",
                format!(
                    "line {} has {} values, expected 12",
                    line_no + 1,
                    values.len()
                ),
            ));
        }
        let pose = mat4_from_rows_3x4(&values);
        poses.push(tr_inv * pose * tr);
    }
    Ok(poses)
}

/// Translation column of the pose at `frame_index`.
///
/// Fails with an out-of-range error instead of panicking; the engine turns
/// that into a buffer-memory fallback.
pub fn position_at_frame(poses: &[DMat4], frame_index: usize) -> Result<DVec3> {
    let pose = poses
        .get(frame_index)
        .ok_or_else(|| SensorError::frame_out_of_range(frame_index, poses.len()))?;
    Ok(pose.w_axis.truncate())
}
