// SPDX-License-Identifier: GPL-3.0-only

//! Shutter - a camera with live preview, photo and video capture and a gallery
//!
//! # Architecture
//!
//! - [`app`]: the screen controller ([`AppModel`]), its messages and view model
//! - [`backends`]: camera and playback devices (GStreamer)
//! - [`storage`]: the media directory and gallery ordering
//! - [`config`]: user configuration
//! - [`flash`]: torch LED control
//! - [`terminal`]: the interactive terminal screen
//!
//! Captures are stored as `{epoch_millis}.jpg` and `{epoch_millis}.mp4`; the
//! file name is the only metadata.

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppModel, Dispatcher, Message};
pub use config::Config;
pub use constants::ResolutionPreset;
pub use errors::{AppError, AppResult};
