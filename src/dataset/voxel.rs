// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Semantic voxel ground truth reader.
//!
//! A voxel frame consists of two files under `voxels/`:
//! - `FFFFFF.label`: flat little-endian u16 buffer of raw class ids, one per
//!   voxel in 256x256x32 C order
//! - `FFFFFF.invalid`: packed bitmask, 1 bit per voxel, MSB first
//!
//! Raw ids go through a precomputed remap lookup table (raw id -> compact
//! training id in `0..=19`); voxels flagged invalid are forced to 255 after
//! the remap. Unlike per-frame camera or lidar files, a missing voxel file is
//! reported as NotFound and handled by the caller.

use std::fs;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::core::{Result, SensorError, VoxelGrid, VOXEL_COUNT, VOXEL_INVALID_LABEL};

/// Lookup table mapping raw semantic ids to compact training ids.
///
/// Index 0 stays 0 ("empty"); raw ids that map to nothing resolve to
/// [`VOXEL_INVALID_LABEL`].
#[derive(Debug, Clone)]
pub struct RemapTable {
    lut: Vec<u8>,
}

impl RemapTable {
    /// Slack appended past the highest mapped id so stray raw ids still
    /// resolve through the table instead of indexing out of bounds.
    const LUT_SLACK: usize = 100;

    /// Build the table from `(raw_id, training_id)` pairs.
    pub fn from_pairs(pairs: &[(u16, u8)]) -> Self {
        let max_key = pairs.iter().map(|&(raw, _)| raw as usize).max().unwrap_or(0);
        let mut lut = vec![0u8; max_key + Self::LUT_SLACK];
        for &(raw, mapped) in pairs {
            lut[raw as usize] = mapped;
        }
        // 0 means "maps to nothing" for every id except true empty
        for entry in lut.iter_mut() {
            if *entry == 0 {
                *entry = VOXEL_INVALID_LABEL;
            }
        }
        lut[0] = 0;
        Self { lut }
    }

    /// Load the table from a line-oriented text file of `raw mapped` integer
    /// pairs. Blank lines and `#` comments are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SensorError::io(path, &e))?;

        let mut pairs = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (raw, mapped) = match (fields.next(), fields.next(), fields.next()) {
                (Some(raw), Some(mapped), None) => (raw, mapped),
                _ => {
                    return Err(SensorError::parse(
                        "remap table",
                        format!("line {} is not a 'raw mapped' pair", line_no + 1),
                    ))
                }
            };
            let raw: u16 = raw.parse().map_err(|e| {
                SensorError::parse("remap table", format!("bad raw id '{raw}': {e}"))
            })?;
            let mapped: u8 = mapped.parse().map_err(|e| {
                SensorError::parse("remap table", format!("bad training id '{mapped}': {e}"))
            })?;
            pairs.push((raw, mapped));
        }
        Ok(Self::from_pairs(&pairs))
    }

    /// Remap one raw id.
    pub fn remap(&self, raw_id: u16) -> u8 {
        self.lut
            .get(raw_id as usize)
            .copied()
            .unwrap_or(VOXEL_INVALID_LABEL)
    }
}

/// Unpack a bit-packed voxel mask into one byte per voxel, MSB first.
pub fn unpack_bitmask(packed: &[u8]) -> Vec<u8> {
    let mut unpacked = Vec::with_capacity(packed.len() * 8);
    for &byte in packed {
        for shift in (0..8).rev() {
            unpacked.push((byte >> shift) & 1);
        }
    }
    unpacked
}

/// Load one voxel ground-truth frame.
///
/// Fails with NotFound if either the label or the invalid file is absent.
pub fn load_voxel_grid<P: AsRef<Path>>(
    sequences_dir: P,
    sequence_id: &str,
    frame_id: &str,
    remap: &RemapTable,
) -> Result<VoxelGrid> {
    let voxels_dir = sequences_dir.as_ref().join(sequence_id).join("voxels");
    let label_path = voxels_dir.join(format!("{frame_id}.label"));
    let invalid_path = voxels_dir.join(format!("{frame_id}.invalid"));

    if !label_path.exists() {
        return Err(SensorError::not_found(&label_path));
    }
    if !invalid_path.exists() {
        return Err(SensorError::not_found(&invalid_path));
    }

    let label_raw = fs::read(&label_path).map_err(|e| SensorError::io(&label_path, &e))?;
    if label_raw.len() != VOXEL_COUNT * 2 {
        return Err(SensorError::parse(
            "voxel label",
            format!(
                "{} has {} bytes, expected {}",
                label_path.display(),
                label_raw.len(),
                VOXEL_COUNT * 2
            ),
        ));
    }
    let mut labels = vec![0u16; VOXEL_COUNT];
    LittleEndian::read_u16_into(&label_raw, &mut labels);

    let invalid_raw = fs::read(&invalid_path).map_err(|e| SensorError::io(&invalid_path, &e))?;
    if invalid_raw.len() != VOXEL_COUNT / 8 {
        return Err(SensorError::parse(
            "voxel invalid mask",
            format!(
                "{} has {} bytes, expected {}",
                invalid_path.display(),
                invalid_raw.len(),
                VOXEL_COUNT / 8
            ),
        ));
    }
    let invalid = unpack_bitmask(&invalid_raw);

    let voxels = labels
        .iter()
        .zip(invalid.iter())
        .map(|(&raw, &bad)| {
            if bad == 1 {
                VOXEL_INVALID_LABEL
            } else {
                remap.remap(raw)
            }
        })
        .collect();

    Ok(VoxelGrid { voxels })
}
