// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common fixture builders for integration tests.
//!
//! Builds a miniature SemanticKITTI-style dataset tree in a temporary
//! directory: calibration, poses, velodyne point clouds, per-point labels,
//! packed voxel ground truth, and PNG camera frames.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use kittistream::dataset::RemapTable;
use kittistream::core::VOXEL_COUNT;

// ============================================================================
// Temp directory handling
// ============================================================================

/// Cleanup guard for test temporary files
pub struct CleanupGuard(pub PathBuf);

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Create a unique dataset root with cleanup guard
pub fn temp_dataset() -> (PathBuf, CleanupGuard) {
    let random = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    let dir = std::env::temp_dir().join(format!(
        "kittistream_test_{}_{}",
        std::process::id(),
        random
    ));
    fs::create_dir_all(&dir).unwrap();
    let guard = CleanupGuard(dir.clone());
    (dir, guard)
}

// ============================================================================
// Fixture writers
// ============================================================================

/// Directory of one sequence, creating it if needed.
pub fn sequence_dir(root: &Path, sequence: &str) -> PathBuf {
    let dir = root.join("sequences").join(sequence);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Identity `P2` and `Tr` calibration, with trailing entries after the blank
/// line that a correct parser must ignore.
pub fn write_identity_calib(root: &Path, sequence: &str) {
    let dir = sequence_dir(root, sequence);
    let text = "P2: 1 0 0 0 0 1 0 0 0 0 1 0\n\
                Tr: 1 0 0 0 0 1 0 0 0 0 1 0\n\
                \n\
                garbage after blank line\n";
    fs::write(dir.join("calib.txt"), text).unwrap();
}

/// One pose line per translation, identity rotation.
pub fn write_poses(root: &Path, sequence: &str, translations: &[[f64; 3]]) {
    let dir = sequence_dir(root, sequence);
    let mut text = String::new();
    for t in translations {
        text.push_str(&format!(
            "1 0 0 {} 0 1 0 {} 0 0 1 {}\n",
            t[0], t[1], t[2]
        ));
    }
    fs::write(dir.join("poses.txt"), text).unwrap();
}

/// Velodyne point cloud of `[x, y, z, intensity]` records.
pub fn write_point_cloud(root: &Path, sequence: &str, frame: &str, points: &[[f32; 4]]) {
    let dir = sequence_dir(root, sequence).join("velodyne");
    fs::create_dir_all(&dir).unwrap();
    let mut bytes = Vec::with_capacity(points.len() * 16);
    for p in points {
        for c in p {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
    }
    fs::write(dir.join(format!("{frame}.bin")), bytes).unwrap();
}

/// Per-point semantic label file.
pub fn write_labels(root: &Path, sequence: &str, frame: &str, ids: &[u32]) {
    let dir = sequence_dir(root, sequence).join("labels");
    fs::create_dir_all(&dir).unwrap();
    let mut bytes = Vec::with_capacity(ids.len() * 4);
    for id in ids {
        bytes.extend_from_slice(&id.to_le_bytes());
    }
    fs::write(dir.join(format!("{frame}.label")), bytes).unwrap();
}

/// Voxel ground truth: a full grid of `raw_label` with the given packed
/// invalid mask (all-valid when `invalid` is None).
pub fn write_voxels(root: &Path, sequence: &str, frame: &str, raw_label: u16, invalid: Option<&[u8]>) {
    let dir = sequence_dir(root, sequence).join("voxels");
    fs::create_dir_all(&dir).unwrap();

    let mut label_bytes = Vec::with_capacity(VOXEL_COUNT * 2);
    for _ in 0..VOXEL_COUNT {
        label_bytes.extend_from_slice(&raw_label.to_le_bytes());
    }
    fs::write(dir.join(format!("{frame}.label")), label_bytes).unwrap();

    let invalid_bytes = match invalid {
        Some(packed) => packed.to_vec(),
        None => vec![0u8; VOXEL_COUNT / 8],
    };
    fs::write(dir.join(format!("{frame}.invalid")), invalid_bytes).unwrap();
}

/// Solid-color PNG camera frame.
pub fn write_camera_frame(
    root: &Path,
    sequence: &str,
    camera_dir: &str,
    frame: &str,
    width: u32,
    height: u32,
    fill: [u8; 3],
) {
    let dir = sequence_dir(root, sequence).join(camera_dir);
    fs::create_dir_all(&dir).unwrap();
    let image = image::RgbImage::from_pixel(width, height, image::Rgb(fill));
    image.save(dir.join(format!("{frame}.png"))).unwrap();
}

/// Remap table used across tests: car-ish ids to compact training ids.
pub fn test_remap() -> RemapTable {
    RemapTable::from_pairs(&[(0, 0), (10, 1), (40, 9), (70, 15)])
}

/// A complete single-sequence fixture: identity calibration, three poses,
/// point cloud + labels + voxels + cameras for frame 000000.
pub fn write_basic_sequence(root: &Path, sequence: &str) {
    write_identity_calib(root, sequence);
    write_poses(
        root,
        sequence,
        &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
    );
    write_point_cloud(
        root,
        sequence,
        "000000",
        &[[1.0, 2.0, 3.0, 0.5], [4.0, 5.0, 6.0, 0.9]],
    );
    write_labels(root, sequence, "000000", &[10, 40]);
    write_voxels(root, sequence, "000000", 10, None);
    write_camera_frame(root, sequence, "image_2", "000000", 8, 6, [10, 20, 30]);
    write_camera_frame(root, sequence, "image_3", "000000", 8, 6, [40, 50, 60]);
}
