// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use shutter::Config;
use shutter::backends::camera::CameraBackendType;
use shutter::constants::paths;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "shutter")]
#[command(about = "Camera with live preview, photo and video capture, and a media gallery")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Directory captures are stored in (overrides the config file)
    #[arg(long, global = true)]
    media_dir: Option<PathBuf>,

    /// Camera backend: "gstreamer" or "test"
    #[arg(long, global = true)]
    backend: Option<CameraBackendType>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Use the front camera
        #[arg(long)]
        front: bool,
    },

    /// Record a video
    Video {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Use the front camera
        #[arg(long)]
        front: bool,
    },

    /// List stored photos and videos, newest first
    Gallery,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(dir) = cli.media_dir {
        config.media_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    // Set RUST_LOG to control the log level, e.g. RUST_LOG=shutter=debug
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    match cli.command {
        None => {
            // The screen owns stdout, so logs go to a file
            let log_dir = dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(paths::APP_DIR);
            std::fs::create_dir_all(&log_dir)?;
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_dir.join(paths::LOG_FILE))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::sync::Mutex::new(log_file))
                .with_ansi(false)
                .init();
            shutter::terminal::run(config)
        }
        Some(command) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_target(true)
                .with_level(true)
                .init();
            match command {
                Commands::List => cli::list_cameras(&config),
                Commands::Photo { front } => cli::take_photo(config, front),
                Commands::Video { duration, front } => cli::record_video(config, duration, front),
                Commands::Gallery => cli::list_gallery(config),
            }
        }
    }
}
