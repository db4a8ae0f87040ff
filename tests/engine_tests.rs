// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Backend engine integration tests.
//!
//! Tests cover:
//! - Full-frame processing with every modality present
//! - Buffer-memory fallback and problem-flag lifecycle per modality
//! - Voxel presence rules on multiples of 5
//! - Static sequence data caching across sequences

use kittistream::core::{SensorError, VOXEL_COUNT, VOXEL_INVALID_LABEL};
use kittistream::engine::BackendEngine;

mod common;
use common::*;

fn engine_for(root: &std::path::Path) -> BackendEngine {
    BackendEngine::new(root, test_remap())
}

// ============================================================================
// Full-frame processing
// ============================================================================

#[test]
fn test_process_full_frame() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let mut engine = engine_for(&root);

    let payload = engine.process(0, 0).unwrap();
    assert_eq!(payload.sequence_id, "00");
    assert_eq!(payload.frame_id, "000000");
    assert_eq!(payload.timestamp, 0.0);

    assert_eq!(payload.image_left.width, 8);
    assert_eq!(payload.image_left.height, 6);
    assert_eq!(&payload.image_left.data[..3], &[10, 20, 30]);
    assert_eq!(&payload.image_right.data[..3], &[40, 50, 60]);

    assert_eq!(payload.point_cloud.points, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    assert_eq!(payload.labels.ids, vec![10, 40]);
    assert_eq!(payload.trajectory, glam::DVec3::new(1.0, 2.0, 3.0));

    // frame 0 is voxel-bearing
    let voxel = payload.voxel.as_ref().unwrap();
    assert_eq!(voxel.voxels.len(), VOXEL_COUNT);
    assert!(voxel
        .voxels
        .iter()
        .all(|&v| v <= 19 || v == VOXEL_INVALID_LABEL));
    assert_eq!(payload.fov_mask.as_ref().unwrap().len(), VOXEL_COUNT);
    assert_eq!(payload.extrinsic.unwrap(), glam::DMat4::IDENTITY);

    assert_eq!(engine.problem_flags(), Default::default());
    assert_eq!(engine.stats().frames_served, 1);
}

#[test]
fn test_timestamp_follows_sampling_frequency() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    write_poses(&root, "00", &[[0.0; 3]; 50]);
    let mut engine = engine_for(&root);

    let payload = engine.process(0, 41).unwrap();
    assert_eq!(payload.frame_id, "000041");
    assert!((payload.timestamp - 4.1).abs() < 1e-12);
}

// ============================================================================
// Buffer memory and problem flags
// ============================================================================

#[test]
fn test_missing_image_falls_back_then_flag_clears() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let mut engine = engine_for(&root);

    // frame 0: image present, buffer primed
    engine.process(0, 0).unwrap();
    assert!(!engine.problem_flags().camera_left);

    // frame 1: image absent, previous frame's pixels repeat
    let payload = engine.process(0, 1).unwrap();
    assert!(engine.problem_flags().camera_left);
    assert!(engine.problem_flags().camera_right);
    assert_eq!(&payload.image_left.data[..3], &[10, 20, 30]);
    assert_eq!(&payload.image_right.data[..3], &[40, 50, 60]);

    // frame 0 again: file present, flag clears
    engine.process(0, 0).unwrap();
    assert!(!engine.problem_flags().camera_left);
    assert!(!engine.problem_flags().camera_right);
}

#[test]
fn test_lidar_points_and_labels_fail_independently() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    // frame 1 has labels but no point cloud
    write_labels(&root, "00", "000001", &[70]);
    let mut engine = engine_for(&root);

    engine.process(0, 0).unwrap();
    let payload = engine.process(0, 1).unwrap();

    assert!(engine.problem_flags().lidar_points);
    assert!(!engine.problem_flags().lidar_labels);
    // points repeat frame 0, labels are fresh
    assert_eq!(payload.point_cloud.points, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    assert_eq!(payload.labels.ids, vec![70]);
}

#[test]
fn test_before_first_success_buffer_defaults_are_zero_valued() {
    let (root, _guard) = temp_dataset();
    write_identity_calib(&root, "00");
    write_poses(&root, "00", &[[1.0, 2.0, 3.0]]);
    let mut engine = engine_for(&root);

    // nothing but static data exists; every modality degrades to its default
    let payload = engine.process(0, 1).unwrap();
    assert_eq!(payload.image_left.data, vec![0, 0, 0]);
    assert_eq!(payload.point_cloud.points, vec![[0.0; 3]]);
    assert_eq!(payload.labels.ids, vec![0]);
    assert_eq!(payload.trajectory, glam::DVec3::ZERO);
    let flags = engine.problem_flags();
    assert!(flags.camera_left && flags.camera_right);
    assert!(flags.lidar_points && flags.lidar_labels);
    assert!(flags.trajectory);
}

#[test]
fn test_trajectory_out_of_range_falls_back() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00"); // 3 poses
    let mut engine = engine_for(&root);

    engine.process(0, 1).unwrap();
    assert_eq!(engine.problem_flags().trajectory, false);

    let payload = engine.process(0, 7).unwrap();
    assert!(engine.problem_flags().trajectory);
    // repeats the pose of frame 1
    assert_eq!(payload.trajectory, glam::DVec3::new(4.0, 5.0, 6.0));
}

// ============================================================================
// Voxel presence rules
// ============================================================================

#[test]
fn test_non_stride_frame_has_no_voxel_entries() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let mut engine = engine_for(&root);

    let payload = engine.process(0, 3).unwrap();
    assert!(payload.voxel.is_none());
    assert!(payload.fov_mask.is_none());
    assert!(payload.extrinsic.is_none());
    assert!(!engine.problem_flags().voxel);
}

#[test]
fn test_stride_frame_with_missing_voxel_falls_back() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    write_poses(&root, "00", &[[0.0; 3]; 10]);
    let mut engine = engine_for(&root);

    // frame 0 primes the voxel buffer with training id 1
    engine.process(0, 0).unwrap();

    // frame 5 is voxel-bearing but has no files
    let payload = engine.process(0, 5).unwrap();
    assert!(engine.problem_flags().voxel);
    let voxel = payload.voxel.as_ref().unwrap();
    assert!(voxel.voxels.iter().all(|&v| v == 1));
}

// ============================================================================
// Static data caching
// ============================================================================

#[test]
fn test_static_data_computed_once_per_sequence() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    write_basic_sequence(&root, "01");
    let mut engine = engine_for(&root);

    // alternating sequences must not thrash the cache
    engine.process(0, 0).unwrap();
    engine.process(1, 0).unwrap();
    engine.process(0, 1).unwrap();
    engine.process(1, 1).unwrap();
    engine.process(0, 2).unwrap();

    assert_eq!(engine.stats().static_rebuilds, 2);
    assert!(engine.static_data("00").is_some());
    assert!(engine.static_data("01").is_some());
}

#[test]
fn test_missing_static_data_is_fatal() {
    let (root, _guard) = temp_dataset();
    write_basic_sequence(&root, "00");
    let mut engine = engine_for(&root);

    let err = engine.process(2, 0).unwrap_err();
    assert!(matches!(err, SensorError::StaticDataMissing { .. }));

    // the good sequence still works afterwards
    assert!(engine.process(0, 0).is_ok());
}
