// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! `update()` routes each message to a handler method. Handlers are grouped by
//! domain in the `handlers` submodules:
//!
//! - `handlers::camera`: session lifecycle, facing, flash
//! - `handlers::capture`: photo capture, recording, shutter gestures, mode
//! - `handlers::gallery`: gallery scans and the asset viewer

use crate::app::state::{AppModel, Message};
use crate::app::task::Task;
use crate::errors::AppError;
use tracing::{debug, error, warn};

impl AppModel {
    /// Apply one message; the returned task carries any asynchronous follow-up
    pub fn update(&mut self, message: Message) -> Task<Message> {
        // Completions still run after close so late device handles get released
        if self.closed && !message.is_completion() {
            debug!(?message, "Screen closed, ignoring message");
            return Task::none();
        }

        match message {
            // ===== Lifecycle =====
            Message::ScreenEntered => self.handle_screen_entered(),
            Message::AppBackgrounded => self.handle_app_backgrounded(),
            Message::AppResumed => self.handle_app_resumed(),
            Message::ScreenClosed => self.handle_screen_closed(),

            // ===== Camera =====
            Message::ToggleFacing => self.handle_toggle_facing(),
            Message::ToggleFlash => self.handle_toggle_flash(),
            Message::CamerasEnumerated(generation, result) => {
                self.handle_cameras_enumerated(generation, result)
            }
            Message::SessionOpened(generation, device, result) => {
                self.handle_session_opened(generation, device, result)
            }
            Message::SessionClosed(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to close camera session");
                }
                Task::none()
            }
            Message::FlashApplied(mode, result) => self.handle_flash_applied(mode, result),

            // ===== Capture =====
            Message::CapturePhoto => self.handle_capture_photo(),
            Message::PhotoSaved(result) => self.handle_photo_saved(result),
            Message::StartRecording => self.handle_start_recording(),
            Message::StopRecording => self.handle_stop_recording(),
            Message::RecordingStarted(handle, result) => {
                self.handle_recording_started(handle, result)
            }
            Message::RecordingSaved(handle, result) => self.handle_recording_saved(handle, result),
            Message::ShutterTapped => self.handle_shutter_tapped(),
            Message::ShutterHeld => self.handle_shutter_held(),
            Message::ShutterReleased => self.handle_shutter_released(),
            Message::ToggleMode => self.handle_toggle_mode(),

            // ===== Gallery =====
            Message::ToggleGallery => self.handle_toggle_gallery(),
            Message::RefreshGallery => self.refresh_gallery(),
            Message::GalleryScanned(seq, result) => self.handle_gallery_scanned(seq, result),
            Message::OpenAsset(asset) => self.handle_open_asset(asset),
            Message::CloseAsset => self.handle_close_asset(),
            Message::PlayerOpened(request, result) => self.handle_player_opened(request, result),
            Message::PlayerClosed(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to close player");
                }
                Task::none()
            }

            Message::DismissError => {
                self.last_error = None;
                Task::none()
            }
        }
    }

    /// Log a failure and show it in the error banner; cancellations stay quiet
    pub(crate) fn report(&mut self, err: AppError) {
        if err.is_cancelled() {
            debug!("Operation cancelled with its session");
            return;
        }
        error!(error = %err, "Operation failed");
        self.last_error = Some(err);
    }

    /// Log an action the current state does not allow
    pub(crate) fn reject(&self, err: AppError) -> Task<Message> {
        warn!(error = %err, "Action rejected");
        Task::none()
    }
}
