// SPDX-License-Identifier: GPL-3.0-only

//! Capture handlers
//!
//! Photo capture, video recording, shutter gestures and the capture mode.

use crate::app::state::{AppModel, CaptureMode, Message, RecordingState, SessionStatus};
use crate::app::task::Task;
use crate::backends::camera::CameraBackendManager;
use crate::backends::camera::types::{BackendError, SessionHandle};
use crate::errors::{AppError, AppResult, CameraError, PhotoError, RecordingError};
use crate::storage::{Clock, MediaKind, MediaStore, media_file_name};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Move a finished temporary capture into the store
///
/// The capture is dropped when its session was disposed in the meantime.
fn persist_capture(
    camera: &CameraBackendManager,
    handle: SessionHandle,
    store: &dyn MediaStore,
    clock: &dyn Clock,
    kind: MediaKind,
    temp: &Path,
) -> AppResult<PathBuf> {
    if !camera.is_current(handle) {
        discard_temp(temp);
        return Err(AppError::Cancelled);
    }

    let name = media_file_name(kind, clock.now_millis());
    store.write(temp, &name).map_err(|e| -> AppError {
        discard_temp(temp);
        match kind {
            MediaKind::Photo => PhotoError::SaveFailed(e.to_string()).into(),
            MediaKind::Video => RecordingError::StopFailed(e.to_string()).into(),
        }
    })
}

fn discard_temp(temp: &Path) {
    if let Err(e) = std::fs::remove_file(temp) {
        debug!(path = %temp.display(), error = %e, "Temporary capture already gone");
    }
}

impl AppModel {
    /// Session handle for a capture action, or why there is none
    fn ready_handle(&self) -> AppResult<SessionHandle> {
        match self.session.handle {
            Some(handle) if self.session.status == SessionStatus::Ready => Ok(handle),
            _ => Err(CameraError::NotReady(self.session.status).into()),
        }
    }

    // =========================================================================
    // Photo
    // =========================================================================

    pub(crate) fn handle_capture_photo(&mut self) -> Task<Message> {
        if self.mode != CaptureMode::Photo {
            return self.reject(PhotoError::WrongMode.into());
        }
        let handle = match self.ready_handle() {
            Ok(handle) => handle,
            Err(e) => return self.reject(e),
        };
        if self.capture_in_flight {
            return self.reject(PhotoError::CaptureInProgress.into());
        }

        info!(%handle, "Capturing photo");
        self.capture_in_flight = true;

        let camera = self.services.camera.clone();
        let store = Arc::clone(&self.services.store);
        let clock = Arc::clone(&self.services.clock);
        Task::blocking(
            move || {
                let temp = camera.capture_still(handle).map_err(|e| match e {
                    BackendError::StaleSession => AppError::Cancelled,
                    other => PhotoError::CaptureFailed(other.to_string()).into(),
                })?;
                persist_capture(
                    &camera,
                    handle,
                    &*store,
                    &*clock,
                    MediaKind::Photo,
                    &temp,
                )
            },
            Message::PhotoSaved,
        )
    }

    pub(crate) fn handle_photo_saved(&mut self, result: AppResult<PathBuf>) -> Task<Message> {
        self.capture_in_flight = false;
        match result {
            Ok(path) => {
                info!(path = %path.display(), "Photo saved");
                self.last_saved = Some(path);
                self.last_error = None;
                self.refresh_gallery()
            }
            Err(e) => {
                self.report(e);
                Task::none()
            }
        }
    }

    // =========================================================================
    // Video
    // =========================================================================

    pub(crate) fn handle_start_recording(&mut self) -> Task<Message> {
        if self.mode != CaptureMode::Video {
            return self.reject(RecordingError::WrongMode.into());
        }
        let handle = match self.ready_handle() {
            Ok(handle) => handle,
            Err(e) => return self.reject(e),
        };
        if self.recording.is_busy() {
            return self.reject(RecordingError::AlreadyRecording.into());
        }

        info!(%handle, "Starting recording");
        self.recording = RecordingState::Starting {
            stop_requested: false,
        };

        let camera = self.services.camera.clone();
        Task::blocking(
            move || {
                camera.start_video(handle).map_err(|e| match e {
                    BackendError::StaleSession => AppError::Cancelled,
                    other => RecordingError::StartFailed(other.to_string()).into(),
                })
            },
            move |result| Message::RecordingStarted(handle, result),
        )
    }

    pub(crate) fn handle_recording_started(
        &mut self,
        handle: SessionHandle,
        result: AppResult<()>,
    ) -> Task<Message> {
        let RecordingState::Starting { stop_requested } = self.recording else {
            debug!(%handle, state = ?self.recording, "Recording start no longer expected");
            return Task::none();
        };
        if self.session.handle != Some(handle) {
            debug!(%handle, "Recording started on a disposed session");
            return Task::none();
        }

        match result {
            Ok(()) if stop_requested => {
                info!(%handle, "Recording started, stopping as requested");
                self.begin_stop(handle)
            }
            Ok(()) => {
                info!(%handle, "Recording");
                self.recording = RecordingState::Recording {
                    since: Instant::now(),
                };
                Task::none()
            }
            Err(e) => {
                self.recording = RecordingState::Idle;
                self.report(e);
                Task::none()
            }
        }
    }

    pub(crate) fn handle_stop_recording(&mut self) -> Task<Message> {
        match self.recording {
            RecordingState::Recording { .. } => match self.session.handle {
                Some(handle) => self.begin_stop(handle),
                None => {
                    self.recording = RecordingState::Idle;
                    Task::none()
                }
            },
            RecordingState::Starting { .. } => {
                debug!("Stop requested before the recording started");
                self.recording = RecordingState::Starting {
                    stop_requested: true,
                };
                Task::none()
            }
            RecordingState::Stopping => {
                debug!("Recording already stopping");
                Task::none()
            }
            RecordingState::Idle => self.reject(RecordingError::NotRecording.into()),
        }
    }

    fn begin_stop(&mut self, handle: SessionHandle) -> Task<Message> {
        self.recording = RecordingState::Stopping;

        let camera = self.services.camera.clone();
        let store = Arc::clone(&self.services.store);
        let clock = Arc::clone(&self.services.clock);
        Task::blocking(
            move || {
                let temp = camera.stop_video(handle).map_err(|e| match e {
                    BackendError::StaleSession => AppError::Cancelled,
                    other => RecordingError::StopFailed(other.to_string()).into(),
                })?;
                // Named by the time the recording stopped
                persist_capture(
                    &camera,
                    handle,
                    &*store,
                    &*clock,
                    MediaKind::Video,
                    &temp,
                )
            },
            move |result| Message::RecordingSaved(handle, result),
        )
    }

    pub(crate) fn handle_recording_saved(
        &mut self,
        handle: SessionHandle,
        result: AppResult<PathBuf>,
    ) -> Task<Message> {
        if self.session.handle == Some(handle) && self.recording == RecordingState::Stopping {
            self.recording = RecordingState::Idle;
        }

        match result {
            Ok(path) => {
                info!(path = %path.display(), "Recording saved");
                self.last_saved = Some(path);
                self.last_error = None;
                self.refresh_gallery()
            }
            Err(e) => {
                self.report(e);
                Task::none()
            }
        }
    }

    // =========================================================================
    // Shutter and mode
    // =========================================================================

    /// Tap: take a photo, or in video mode start/stop recording
    pub(crate) fn handle_shutter_tapped(&mut self) -> Task<Message> {
        match self.mode {
            CaptureMode::Photo => self.handle_capture_photo(),
            CaptureMode::Video if self.recording.is_busy() => self.handle_stop_recording(),
            CaptureMode::Video => self.handle_start_recording(),
        }
    }

    pub(crate) fn handle_shutter_held(&mut self) -> Task<Message> {
        if self.mode != CaptureMode::Video {
            debug!("Long press ignored in photo mode");
            return Task::none();
        }
        self.handle_start_recording()
    }

    pub(crate) fn handle_shutter_released(&mut self) -> Task<Message> {
        if self.mode != CaptureMode::Video || !self.recording.is_busy() {
            return Task::none();
        }
        self.handle_stop_recording()
    }

    pub(crate) fn handle_toggle_mode(&mut self) -> Task<Message> {
        if self.recording.is_busy() {
            return self.reject(RecordingError::ModeLocked.into());
        }
        self.mode = self.mode.toggle();
        info!(mode = %self.mode, "Capture mode changed");
        Task::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{BackendResult, CameraBackendType, CameraDevice, Facing};
    use crate::backends::camera::CameraBackend;
    use crate::backends::frames::FrameSlot;
    use crate::constants::ResolutionPreset;
    use crate::flash::FlashMode;
    use crate::storage::FsMediaStore;

    struct NullCamera;

    impl CameraBackend for NullCamera {
        fn enumerate_cameras(&mut self) -> BackendResult<Vec<CameraDevice>> {
            Ok(Vec::new())
        }
        fn open(&mut self, _: &CameraDevice, _: ResolutionPreset) -> BackendResult<SessionHandle> {
            Ok(SessionHandle::next())
        }
        fn set_flash(&mut self, _: SessionHandle, _: FlashMode) -> BackendResult<()> {
            Ok(())
        }
        fn capture_still(&mut self, _: SessionHandle) -> BackendResult<PathBuf> {
            Err(BackendError::CaptureFailed("unused".into()))
        }
        fn start_video(&mut self, _: SessionHandle) -> BackendResult<()> {
            Ok(())
        }
        fn stop_video(&mut self, _: SessionHandle) -> BackendResult<PathBuf> {
            Err(BackendError::NoRecordingInProgress)
        }
        fn close(&mut self, _: SessionHandle) -> BackendResult<()> {
            Ok(())
        }
        fn frame_slot(&self) -> Option<FrameSlot> {
            None
        }
        fn backend_type(&self) -> CameraBackendType {
            CameraBackendType::TestPattern
        }
    }

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0
        }
    }

    fn device() -> CameraDevice {
        CameraDevice {
            id: "cam".into(),
            name: "cam".into(),
            facing: Facing::Back,
            path: None,
        }
    }

    #[test]
    fn test_persist_moves_temp_into_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path().join("media"));
        let camera = CameraBackendManager::with_backend(Box::new(NullCamera));
        let handle = camera.open(&device(), ResolutionPreset::Low, 1).unwrap();

        let temp = dir.path().join("capture.tmp");
        std::fs::write(&temp, b"jpeg").unwrap();

        let saved =
            persist_capture(&camera, handle, &store, &FixedClock(1000), MediaKind::Photo, &temp)
                .unwrap();
        assert_eq!(saved, dir.path().join("media").join("1000.jpg"));
        assert!(!temp.exists());
    }

    #[test]
    fn test_persist_drops_capture_of_closed_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path().join("media"));
        let camera = CameraBackendManager::with_backend(Box::new(NullCamera));
        let handle = camera.open(&device(), ResolutionPreset::Low, 1).unwrap();
        camera.close(handle).unwrap();

        let temp = dir.path().join("clip.tmp");
        std::fs::write(&temp, b"mp4").unwrap();

        let result =
            persist_capture(&camera, handle, &store, &FixedClock(1000), MediaKind::Video, &temp);
        assert_eq!(result, Err(AppError::Cancelled));
        assert!(!temp.exists());
        assert!(store.list().unwrap().is_empty());
    }
}
