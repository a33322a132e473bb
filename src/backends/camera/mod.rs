// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │  AppModel (screen)  │
//! └──────────┬──────────┘
//!            │  spawn_blocking
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackendManager│  ← one live session, stale-handle checks
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│
//! └──────────┬──────────┘
//!            ▼
//!      ┌───────────┐
//!      │ GStreamer │  (real devices or videotestsrc)
//!      └───────────┘
//! ```

pub mod gst_camera;
pub mod manager;
pub mod types;

pub use manager::CameraBackendManager;
pub use types::*;

use crate::backends::frames::FrameSlot;
use crate::constants::ResolutionPreset;
use crate::flash::FlashMode;
use std::path::PathBuf;

/// Camera device contract
///
/// Calls may block (device negotiation, encoder flushes) and are made from
/// blocking worker threads, never from the UI loop. Every session-scoped call
/// carries the handle returned by [`CameraBackend::open`] and fails with
/// [`BackendError::StaleSession`] once that session is closed.
pub trait CameraBackend: Send {
    /// Enumerate available cameras
    fn enumerate_cameras(&mut self) -> BackendResult<Vec<CameraDevice>>;

    /// Open a session on `device` at the given resolution preset
    fn open(
        &mut self,
        device: &CameraDevice,
        preset: ResolutionPreset,
    ) -> BackendResult<SessionHandle>;

    /// Apply a flash mode to the live session
    fn set_flash(&mut self, handle: SessionHandle, mode: FlashMode) -> BackendResult<()>;

    /// Capture a still image into a temporary JPEG file
    fn capture_still(&mut self, handle: SessionHandle) -> BackendResult<PathBuf>;

    /// Start recording video
    fn start_video(&mut self, handle: SessionHandle) -> BackendResult<()>;

    /// Stop recording and return the finished temporary MP4 file
    fn stop_video(&mut self, handle: SessionHandle) -> BackendResult<PathBuf>;

    /// Close the session and release the device
    ///
    /// An in-progress recording is discarded.
    fn close(&mut self, handle: SessionHandle) -> BackendResult<()>;

    /// Mailbox the live session's preview frames land in
    fn frame_slot(&self) -> Option<FrameSlot>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;
}

/// Create the backend for a configured type
pub fn get_backend_for_type(backend_type: CameraBackendType) -> Box<dyn CameraBackend> {
    Box::new(gst_camera::GStreamerBackend::new(backend_type))
}

/// Pick the device for a facing: an exact match, otherwise the first device
///
/// Returns the device and whether it matched the requested facing.
pub fn select_device(cameras: &[CameraDevice], facing: Facing) -> Option<(&CameraDevice, bool)> {
    cameras
        .iter()
        .find(|c| c.facing == facing)
        .map(|c| (c, true))
        .or_else(|| cameras.first().map(|c| (c, false)))
}
