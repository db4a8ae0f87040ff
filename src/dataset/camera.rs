// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Camera frame reader.
//!
//! Frames live under `image_2/` (left) and `image_3/` (right) as PNG files
//! named by their 6-digit frame id. Decoded to raw row-major RGB8.

use std::path::Path;

use crate::core::{CameraImage, Result, SensorError};

/// Load one camera frame as raw RGB8.
pub fn load_camera_frame<P: AsRef<Path>>(image_dir: P, frame_id: &str) -> Result<CameraImage> {
    let path = image_dir.as_ref().join(format!("{frame_id}.png"));
    if !path.exists() {
        return Err(SensorError::not_found(&path));
    }

    let decoded = image::open(&path)
        .map_err(|e| SensorError::parse("png", format!("{}: {e}", path.display())))?
        .into_rgb8();

    let (width, height) = decoded.dimensions();
    Ok(CameraImage {
        width: width as usize,
        height: height as usize,
        data: decoded.into_raw(),
    })
}
