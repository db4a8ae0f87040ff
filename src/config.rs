// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! TOML configuration for the serving pipeline.
//!
//! ```toml
//! [dataset]
//! data_dir = "/data/semantic_kitti/dataset"
//! remap_table = "configs/remap.txt"
//!
//! [server]
//! bind = "127.0.0.1:8765"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::{Result, SensorError};

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Dataset location and remap table
    pub dataset: DatasetConfig,
    /// Server bind settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Dataset section.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// Root directory containing `sequences/`
    pub data_dir: PathBuf,
    /// Path to the semantic-label remap table (`raw mapped` pairs)
    pub remap_table: PathBuf,
}

/// Server section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8765".to_string()
}

impl Config {
    /// Load and parse a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SensorError::io(path, &e))?;
        toml::from_str(&text)
            .map_err(|e| SensorError::parse("config", format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [dataset]
            data_dir = "/data/kitti"
            remap_table = "configs/remap.txt"

            [server]
            bind = "0.0.0.0:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.dataset.data_dir, PathBuf::from("/data/kitti"));
        assert_eq!(config.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_server_section_defaults() {
        let config: Config = toml::from_str(
            r#"
            [dataset]
            data_dir = "/data/kitti"
            remap_table = "remap.txt"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8765");
    }
}
