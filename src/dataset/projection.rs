// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Voxel-to-pixel projection for the camera field-of-view mask.
//!
//! Every voxel centroid is expressed in lidar space, transformed into camera
//! space through the extrinsic, and perspective-projected through the
//! intrinsic. A voxel is in the field of view when its pixel lands inside the
//! image bounds and its camera-space depth is positive.
//!
//! The projection depends only on calibration and grid geometry, so it is
//! computed once per sequence and cached with the static sequence data.

use glam::{DMat3, DMat4, DVec3};

use crate::core::{SCENE_EXTENT, VOXEL_ORIGIN, VOXEL_SIZE};

/// Geometry of the voxel grid being projected.
#[derive(Debug, Clone, Copy)]
pub struct VoxelGridSpec {
    /// Grid origin in the lidar frame, meters
    pub origin: DVec3,
    /// Edge length of one voxel, meters
    pub voxel_size: f64,
    /// Metric extent covered by the grid (x, y, z), meters
    pub scene_extent: [f64; 3],
}

impl Default for VoxelGridSpec {
    fn default() -> Self {
        Self {
            origin: VOXEL_ORIGIN,
            voxel_size: VOXEL_SIZE,
            scene_extent: SCENE_EXTENT,
        }
    }
}

impl VoxelGridSpec {
    /// Grid dimensions derived from extent and voxel size.
    pub fn dims(&self) -> [usize; 3] {
        [
            (self.scene_extent[0] / self.voxel_size) as usize,
            (self.scene_extent[1] / self.voxel_size) as usize,
            (self.scene_extent[2] / self.voxel_size) as usize,
        ]
    }

    /// Total voxel count.
    pub fn voxel_count(&self) -> usize {
        let [x, y, z] = self.dims();
        x * y * z
    }
}

/// Result of projecting every voxel centroid into the camera image.
#[derive(Debug, Clone)]
pub struct FovProjection {
    /// Rounded pixel coordinates (x, y) per voxel
    pub pixels: Vec<[i64; 2]>,
    /// True where the voxel projects inside the image with positive depth
    pub mask: Vec<bool>,
    /// Camera-space depth per voxel, meters
    pub depth: Vec<f64>,
}

/// Project all voxel centroids of `spec` through `extrinsic` and `intrinsic`
/// into an image of `image_size` (width, height).
///
/// Voxels iterate in C order (x outer, z inner), matching the label grid
/// layout on disk.
pub fn project_voxel_grid(
    extrinsic: &DMat4,
    intrinsic: &DMat3,
    spec: &VoxelGridSpec,
    image_size: (usize, usize),
) -> FovProjection {
    let [dim_x, dim_y, dim_z] = spec.dims();
    let count = dim_x * dim_y * dim_z;
    let (img_w, img_h) = (image_size.0 as i64, image_size.1 as i64);

    let fx = intrinsic.x_axis.x;
    let fy = intrinsic.y_axis.y;
    let cx = intrinsic.z_axis.x;
    let cy = intrinsic.z_axis.y;

    let mut pixels = Vec::with_capacity(count);
    let mut mask = Vec::with_capacity(count);
    let mut depth = Vec::with_capacity(count);

    for ix in 0..dim_x {
        for iy in 0..dim_y {
            for iz in 0..dim_z {
                let centroid = spec.origin
                    + spec.voxel_size
                        * DVec3::new(ix as f64 + 0.5, iy as f64 + 0.5, iz as f64 + 0.5);
                let cam = extrinsic.transform_point3(centroid);

                let z = cam.z;
                let px = (cam.x * fx / z + cx).round() as i64;
                let py = (cam.y * fy / z + cy).round() as i64;

                let in_fov = z > 0.0 && px >= 0 && px < img_w && py >= 0 && py < img_h;

                pixels.push([px, py]);
                mask.push(in_fov);
                depth.push(z);
            }
        }
    }

    FovProjection {
        pixels,
        mask,
        depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VOXEL_COUNT;

    #[test]
    fn test_default_spec_dims() {
        let spec = VoxelGridSpec::default();
        assert_eq!(spec.dims(), [256, 256, 32]);
        assert_eq!(spec.voxel_count(), VOXEL_COUNT);
    }

    #[test]
    fn test_projection_shapes() {
        let spec = VoxelGridSpec {
            origin: DVec3::new(0.0, -1.0, -1.0),
            voxel_size: 1.0,
            scene_extent: [2.0, 2.0, 2.0],
        };
        let proj = project_voxel_grid(&DMat4::IDENTITY, &DMat3::IDENTITY, &spec, (10, 10));
        assert_eq!(proj.pixels.len(), 8);
        assert_eq!(proj.mask.len(), 8);
        assert_eq!(proj.depth.len(), 8);
    }

    #[test]
    fn test_voxel_behind_camera_is_out_of_fov() {
        // single voxel centered at z = -0.5 with identity calibration
        let spec = VoxelGridSpec {
            origin: DVec3::new(0.0, 0.0, -1.0),
            voxel_size: 1.0,
            scene_extent: [1.0, 1.0, 1.0],
        };
        let proj = project_voxel_grid(&DMat4::IDENTITY, &DMat3::IDENTITY, &spec, (100, 100));
        assert_eq!(proj.mask, vec![false]);
        assert!(proj.depth[0] < 0.0);
    }

    #[test]
    fn test_voxel_in_front_projects_inside_image() {
        // single voxel centered at (0.5, 0.5, 4.5); pinhole with principal
        // point at the image center
        let spec = VoxelGridSpec {
            origin: DVec3::new(0.0, 0.0, 4.0),
            voxel_size: 1.0,
            scene_extent: [1.0, 1.0, 1.0],
        };
        let intrinsic = DMat3::from_cols_array(&[
            10.0, 0.0, 0.0, //
            0.0, 10.0, 0.0, //
            50.0, 50.0, 1.0,
        ]);
        let proj = project_voxel_grid(&DMat4::IDENTITY, &intrinsic, &spec, (100, 100));
        assert_eq!(proj.mask, vec![true]);
        // 0.5 * 10 / 4.5 + 50 ≈ 51
        assert_eq!(proj.pixels[0], [51, 51]);
        assert!((proj.depth[0] - 4.5).abs() < 1e-12);
    }
}
