// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for kittistream.
//!
//! Provides error types for the serving pipeline:
//! - Dataset file loading and parsing
//! - Per-modality encode/decode
//! - Request handling and transport

use std::fmt;
use std::path::Path;

/// Errors that can occur in the sensor serving pipeline.
#[derive(Debug, Clone)]
pub enum SensorError {
    /// A per-frame modality file is missing.
    ///
    /// Recoverable at the engine level via buffer memory.
    NotFound {
        /// Path that was probed
        path: String,
    },

    /// Sequence-level static data (calib.txt / poses.txt) is missing.
    ///
    /// Fatal for the current `process()` call.
    StaticDataMissing {
        /// Sequence id (2-digit form)
        sequence: String,
        /// Calibration file path that was probed
        calib_path: String,
        /// Poses file path that was probed
        poses_path: String,
    },

    /// Parse error in a dataset text file
    ParseError {
        /// What was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// Encode/decode error for one modality
    CodecError {
        /// Modality name (e.g. "lidar", "voxel")
        modality: String,
        /// Error message
        message: String,
    },

    /// Wrong delimiter-part count while decoding a multi-part payload
    FramingError {
        /// Modality name
        modality: String,
        /// Expected part count
        expected: usize,
        /// Actual part count
        actual: usize,
    },

    /// Pose lookup index outside the sequence's pose list
    FrameOutOfRange {
        /// Requested frame index
        index: usize,
        /// Number of poses in the sequence
        len: usize,
    },

    /// Malformed inbound request (unknown modality, bad ids, parse failure)
    MalformedRequest {
        /// Error message
        message: String,
    },

    /// Transport-level failure (connect/send/receive)
    ConnectionError {
        /// Error message
        message: String,
    },

    /// I/O error with path context
    Io {
        /// Path being accessed
        path: String,
        /// Underlying error message
        message: String,
    },

    /// Other error
    Other(String),
}

impl SensorError {
    /// Create a "file not found" error.
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        SensorError::NotFound {
            path: path.as_ref().display().to_string(),
        }
    }

    /// Create a sequence-level static data error.
    pub fn static_data_missing(
        sequence: impl Into<String>,
        calib_path: impl AsRef<Path>,
        poses_path: impl AsRef<Path>,
    ) -> Self {
        SensorError::StaticDataMissing {
            sequence: sequence.into(),
            calib_path: calib_path.as_ref().display().to_string(),
            poses_path: poses_path.as_ref().display().to_string(),
        }
    }

    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        SensorError::ParseError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an encode/decode error.
    pub fn codec(modality: impl Into<String>, message: impl Into<String>) -> Self {
        SensorError::CodecError {
            modality: modality.into(),
            message: message.into(),
        }
    }

    /// Create a framing error.
    pub fn framing(modality: impl Into<String>, expected: usize, actual: usize) -> Self {
        SensorError::FramingError {
            modality: modality.into(),
            expected,
            actual,
        }
    }

    /// Create a frame-out-of-range error.
    pub fn frame_out_of_range(index: usize, len: usize) -> Self {
        SensorError::FrameOutOfRange { index, len }
    }

    /// Create a malformed request error.
    pub fn malformed_request(message: impl Into<String>) -> Self {
        SensorError::MalformedRequest {
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        SensorError::ConnectionError {
            message: message.into(),
        }
    }

    /// Create an I/O error with path context, folding `NotFound` into the
    /// recoverable variant so engine fallbacks can match on it.
    pub fn io(path: impl AsRef<Path>, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return SensorError::not_found(path);
        }
        SensorError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// True for the per-frame recoverable "file missing" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SensorError::NotFound { .. })
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::NotFound { path } => {
                write!(f, "File not found: {path}")
            }
            SensorError::StaticDataMissing {
                sequence,
                calib_path,
                poses_path,
            } => write!(
                f,
                "Static data for sequence {sequence} missing: expected {calib_path} and {poses_path}"
            ),
            SensorError::ParseError { context, message } => {
                write!(f, "Parse error in {context}: {message}")
            }
            SensorError::CodecError { modality, message } => {
                write!(f, "Codec error for {modality}: {message}")
            }
            SensorError::FramingError {
                modality,
                expected,
                actual,
            } => write!(
                f,
                "Framing error for {modality}: expected {expected} delimiter-separated parts, got {actual}"
            ),
            SensorError::FrameOutOfRange { index, len } => {
                write!(
                    f,
                    "Frame index {index} out of range (sequence has {len} poses)"
                )
            }
            SensorError::MalformedRequest { message } => {
                write!(f, "Malformed request: {message}")
            }
            SensorError::ConnectionError { message } => {
                write!(f, "Connection error: {message}")
            }
            SensorError::Io { path, message } => {
                write!(f, "I/O error on {path}: {message}")
            }
            SensorError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SensorError {}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, SensorError>;
