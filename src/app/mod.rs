// SPDX-License-Identifier: GPL-3.0-only

//! The camera screen controller
//!
//! # Architecture
//!
//! - `state`: state types ([`AppModel`], [`Message`], [`RecordingState`], ...)
//! - `update`: message routing
//! - `handlers`: message handlers by domain
//! - `task`: deferred work returned from `update`
//! - `runtime`: the [`Dispatcher`] that runs tasks and feeds results back
//! - `view`: the pure screen view model
//!
//! All state lives in [`AppModel`] and changes only inside
//! [`AppModel::update`]. Device and filesystem calls run as blocking tasks and
//! report back as completion messages.

mod handlers;
pub mod runtime;
pub mod state;
pub mod task;
mod update;
pub mod view;

pub use runtime::Dispatcher;
pub use state::{
    AppModel, CameraSession, CaptureMode, GalleryView, Message, PlayerState, RecordingState,
    Services, SessionStatus, Viewer,
};
pub use task::Task;
pub use view::{ScreenView, view};

use crate::constants::paths;
use std::path::PathBuf;

/// Default media directory (~/Pictures/shutter)
pub fn default_media_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join("Pictures")
        })
        .join(paths::APP_DIR)
}
