// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Kittistream CLI
//!
//! Command-line tool for the sensor streaming pipeline.
//!
//! ## Usage
//!
//! ```sh
//! # Serve a dataset
//! kittistream serve --config configs/kittistream.toml
//!
//! # Fetch one modality of one frame from a running server
//! kittistream fetch 127.0.0.1:8765 lidar 0 40
//!
//! # Report sequences and frame counts under a data root
//! kittistream inspect /data/semantic_kitti/dataset
//! ```

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use kittistream::dataset::RemapTable;
use kittistream::engine::BackendEngine;
use kittistream::net::{ClientSession, ServerSession};
use kittistream::{Config, Modality};

/// Kittistream - sensor log replay toolkit
///
/// Serve SemanticKITTI-style datasets over WebSocket and fetch decoded
/// frames from a running server.
#[derive(Parser)]
#[command(name = "kittistream")]
#[command(about = "Sensor-data serving pipeline for autonomous-driving log replay", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run the sensor stream server
    Serve {
        /// Path to the TOML configuration file
        #[arg(long, default_value = "configs/kittistream.toml")]
        config: PathBuf,
    },

    /// Fetch one modality of one frame from a running server
    Fetch {
        /// Server address (host:port)
        addr: String,
        /// Sensor type (camera-left, camera-right, lidar, voxel, trajectory)
        sensor_type: String,
        /// Sequence id
        seq_id: i64,
        /// Frame id
        frame_id: i64,
        /// Write the raw reply bytes to this file instead of decoding
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Report sequences and frame counts under a data root
    Inspect {
        /// Dataset root containing `sequences/`
        data_dir: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;

    match cli.command {
        Commands::Serve { config } => runtime.block_on(serve(config)),
        Commands::Fetch {
            addr,
            sensor_type,
            seq_id,
            frame_id,
            output,
        } => runtime.block_on(fetch(addr, sensor_type, seq_id, frame_id, output)),
        Commands::Inspect { data_dir } => inspect(data_dir),
    }
}

async fn serve(config_path: PathBuf) -> Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let remap = RemapTable::from_file(&config.dataset.remap_table)
        .with_context(|| format!("loading remap table {}", config.dataset.remap_table.display()))?;

    let engine = BackendEngine::new(&config.dataset.data_dir, remap);
    let server = ServerSession::bind(&config.server.bind, engine)
        .await
        .context("binding server")?;
    println!("Serving {} on ws://{}", config.dataset.data_dir.display(), server.local_addr());

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown();
        }
    });

    server.run().await.context("server loop")?;
    Ok(())
}

async fn fetch(
    addr: String,
    sensor_type: String,
    seq_id: i64,
    frame_id: i64,
    output: Option<PathBuf>,
) -> Result<()> {
    let modality = Modality::parse(&sensor_type)?;
    let client = ClientSession::new();
    client.connect(&addr).await?;

    if let Some(path) = output {
        let raw = client.request_raw(modality, seq_id, frame_id).await?;
        fs::write(&path, &raw).with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {} bytes to {}", raw.len(), path.display());
    } else {
        match modality {
            Modality::CameraLeft | Modality::CameraRight => {
                let image = match modality {
                    Modality::CameraLeft => client.fetch_camera_left(seq_id, frame_id).await?,
                    _ => client.fetch_camera_right(seq_id, frame_id).await?,
                };
                println!("{modality}: {}x{} RGB8", image.width, image.height);
            }
            Modality::Lidar => {
                let lidar = client.fetch_lidar(seq_id, frame_id).await?;
                println!("lidar: {} points, {} labels", lidar.points.len(), lidar.labels.len());
            }
            Modality::Voxel => {
                let voxel = client.fetch_voxel(seq_id, frame_id).await?;
                let in_fov = voxel.fov_mask.iter().filter(|&&m| m).count();
                let [x, y, z] = voxel.grid.dims();
                println!("voxel: {x}x{y}x{z}, {in_fov} voxels in fov");
            }
            Modality::Trajectory => {
                let xyz = client.fetch_trajectory(seq_id, frame_id).await?;
                println!("trajectory: [{}, {}, {}]", xyz.x, xyz.y, xyz.z);
            }
        }
    }

    client.disconnect().await?;
    Ok(())
}

fn inspect(data_dir: PathBuf) -> Result<()> {
    let sequences_dir = data_dir.join("sequences");
    let mut entries: Vec<_> = fs::read_dir(&sequences_dir)
        .with_context(|| format!("reading {}", sequences_dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    println!("{:<10} {:>8} {:>8} {:>8}", "sequence", "poses", "frames", "voxels");
    for entry in entries {
        let seq_dir = entry.path();
        let poses = fs::read_to_string(seq_dir.join("poses.txt"))
            .map(|t| t.lines().filter(|l| !l.trim().is_empty()).count())
            .unwrap_or(0);
        let frames = count_files(&seq_dir.join("velodyne"), "bin");
        let voxels = count_files(&seq_dir.join("voxels"), "label");
        println!(
            "{:<10} {poses:>8} {frames:>8} {voxels:>8}",
            entry.file_name().to_string_lossy()
        );
    }
    Ok(())
}

fn count_files(dir: &std::path::Path, extension: &str) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.path()
                        .extension()
                        .is_some_and(|ext| ext == extension)
                })
                .count()
        })
        .unwrap_or(0)
}
