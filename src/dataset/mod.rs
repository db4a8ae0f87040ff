// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Stateless per-format dataset readers.
//!
//! Each submodule reads one SemanticKITTI file format:
//! - [`calib`] - calibration matrices and ego poses
//! - [`camera`] - PNG camera frames
//! - [`point_cloud`] - lidar point clouds and per-point labels
//! - [`voxel`] - packed semantic voxel ground truth
//! - [`projection`] - voxel field-of-view projection
//!
//! Loaders carry no state; caching and fallback policy live in the engine.

pub mod calib;
pub mod camera;
pub mod point_cloud;
pub mod projection;
pub mod voxel;

pub use calib::{position_at_frame, read_calibration, read_poses, Calibration};
pub use camera::load_camera_frame;
pub use point_cloud::{class_color, read_labels_and_colors, read_point_cloud};
pub use projection::{project_voxel_grid, FovProjection, VoxelGridSpec};
pub use voxel::{load_voxel_grid, unpack_bitmask, RemapTable};
