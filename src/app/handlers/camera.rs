// SPDX-License-Identifier: GPL-3.0-only

//! Camera session handlers
//!
//! Session lifecycle (screen entry, background/resume, close), facing
//! switches and the flash. Opening is two steps: enumerate, then open the
//! selected device. Both results carry the session generation they were
//! started for; anything older than the current generation is discarded and
//! a device it opened is closed again.

use crate::app::state::{AppModel, Message, SessionStatus};
use crate::app::task::Task;
use crate::backends::camera::select_device;
use crate::backends::camera::types::{CameraDevice, Facing, SessionHandle};
use crate::errors::{AppError, AppResult, CameraError, RecordingError};
use crate::flash::FlashMode;
use tracing::{debug, info, warn};

impl AppModel {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub(crate) fn handle_screen_entered(&mut self) -> Task<Message> {
        if self.session.status != SessionStatus::Uninitialized {
            debug!(status = %self.session.status, "Camera already initialized");
            return Task::none();
        }
        info!("Camera screen entered");
        self.initialize_camera(self.session.facing)
    }

    pub(crate) fn handle_app_backgrounded(&mut self) -> Task<Message> {
        let viewer = self.close_viewer();
        match self.session.status {
            SessionStatus::Ready | SessionStatus::Initializing => {
                info!("App backgrounded, releasing camera");
                self.resume_pending = true;
                Task::batch([self.dispose_session(), viewer])
            }
            _ => viewer,
        }
    }

    pub(crate) fn handle_app_resumed(&mut self) -> Task<Message> {
        if !self.resume_pending {
            debug!("Nothing to resume");
            return Task::none();
        }
        self.resume_pending = false;
        info!(facing = %self.session.facing, "App resumed, reacquiring camera");
        self.initialize_camera(self.session.facing)
    }

    pub(crate) fn handle_screen_closed(&mut self) -> Task<Message> {
        info!("Camera screen closed");
        let session = self.dispose_session();
        let viewer = self.close_viewer();
        self.gallery.open = false;
        self.gallery.assets.clear();
        self.resume_pending = false;
        self.closed = true;
        Task::batch([session, viewer])
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Start acquiring a camera with the given facing
    ///
    /// Supersedes any initialize still in flight.
    pub(crate) fn initialize_camera(&mut self, facing: Facing) -> Task<Message> {
        self.session.generation += 1;
        self.session.facing = facing;
        self.session.handle = None;
        self.session.status = SessionStatus::Initializing;

        let generation = self.session.generation;
        let camera = self.services.camera.clone();
        info!(%facing, generation, "Initializing camera");

        Task::blocking(
            move || camera.enumerate_cameras().map_err(AppError::from),
            move |result| Message::CamerasEnumerated(generation, result),
        )
    }

    pub(crate) fn handle_cameras_enumerated(
        &mut self,
        generation: u64,
        result: AppResult<Vec<CameraDevice>>,
    ) -> Task<Message> {
        if generation != self.session.generation {
            debug!(generation, "Ignoring enumeration for a superseded request");
            return Task::none();
        }

        let cameras = match result {
            Ok(cameras) => cameras,
            Err(e) => {
                self.session.status = SessionStatus::Failed;
                self.report(e);
                return Task::none();
            }
        };
        self.available_cameras = cameras;

        let requested = self.session.facing;
        let Some((device, exact)) = select_device(&self.available_cameras, requested) else {
            self.session.status = SessionStatus::Failed;
            self.report(CameraError::NoCameraFound.into());
            return Task::none();
        };
        let device = device.clone();

        if !exact {
            warn!(
                error = %CameraError::DeviceUnavailable(requested),
                fallback = %device.name,
                "Using first available camera"
            );
        }
        if device.facing != Facing::External {
            self.session.facing = device.facing;
        }
        self.session.device = Some(device.clone());

        let preset = self.session.preset;
        let camera = self.services.camera.clone();
        let target = device.clone();
        Task::blocking(
            move || {
                camera
                    .open(&target, preset, generation)
                    .map_err(AppError::from)
            },
            move |result| Message::SessionOpened(generation, device, result),
        )
    }

    pub(crate) fn handle_session_opened(
        &mut self,
        generation: u64,
        device: CameraDevice,
        result: AppResult<SessionHandle>,
    ) -> Task<Message> {
        if generation != self.session.generation {
            return match result {
                Ok(handle) => {
                    debug!(%handle, "Closing session opened for a superseded request");
                    self.close_session_task(handle)
                }
                Err(_) => Task::none(),
            };
        }

        match result {
            Ok(handle) => {
                info!(%handle, device = %device.name, "Camera ready");
                self.session.handle = Some(handle);
                self.session.status = SessionStatus::Ready;
                self.last_error = None;
                self.apply_flash()
            }
            Err(e) => {
                self.session.status = SessionStatus::Failed;
                self.report(e);
                Task::none()
            }
        }
    }

    /// Drop the live session; in-flight work for it will complete as cancelled
    ///
    /// A recording in progress is discarded with the session.
    pub(crate) fn dispose_session(&mut self) -> Task<Message> {
        self.session.generation += 1;
        self.session.status = SessionStatus::Uninitialized;

        if self.recording.is_busy() {
            warn!(state = ?self.recording, "Discarding recording with its session");
            self.recording = Default::default();
        }

        match self.session.handle.take() {
            Some(handle) => self.close_session_task(handle),
            None => Task::none(),
        }
    }

    fn close_session_task(&self, handle: SessionHandle) -> Task<Message> {
        let camera = self.services.camera.clone();
        Task::blocking(
            move || camera.close(handle).map_err(AppError::from),
            Message::SessionClosed,
        )
    }

    // =========================================================================
    // Facing and flash
    // =========================================================================

    pub(crate) fn handle_toggle_facing(&mut self) -> Task<Message> {
        if self.recording.is_busy() {
            return self.reject(RecordingError::SessionLocked.into());
        }
        match self.session.status {
            SessionStatus::Ready | SessionStatus::Failed => {}
            status => return self.reject(CameraError::NotReady(status).into()),
        }

        let target = self.session.facing.opposite();
        info!(from = %self.session.facing, to = %target, "Switching camera");

        let close = self.dispose_session();
        Task::batch([close, self.initialize_camera(target)])
    }

    pub(crate) fn handle_toggle_flash(&mut self) -> Task<Message> {
        self.session.flash = self.session.flash.toggle();
        info!(flash = %self.session.flash, "Flash toggled");
        self.apply_flash()
    }

    /// Push the configured flash mode to the live session
    pub(crate) fn apply_flash(&self) -> Task<Message> {
        let Some(handle) = self.session.handle.filter(|_| self.session.is_ready()) else {
            return Task::none();
        };
        let mode = self.session.flash;
        let camera = self.services.camera.clone();
        Task::blocking(
            move || camera.set_flash(handle, mode).map_err(AppError::from),
            move |result| Message::FlashApplied(mode, result),
        )
    }

    pub(crate) fn handle_flash_applied(
        &mut self,
        mode: FlashMode,
        result: AppResult<()>,
    ) -> Task<Message> {
        match result {
            Ok(()) => debug!(%mode, "Flash applied"),
            Err(e) if e.is_cancelled() => debug!(%mode, "Flash request outlived its session"),
            Err(e) => {
                // The session stays usable without a torch
                warn!(%mode, error = %e, "Failed to apply flash");
                self.last_error = Some(e);
            }
        }
        Task::none()
    }
}
