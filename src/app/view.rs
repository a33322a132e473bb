// SPDX-License-Identifier: GPL-3.0-only

//! Screen view model
//!
//! [`view`] derives everything the screen shows from [`AppModel`] and nothing
//! else. The terminal front end draws the result; frames are fetched
//! separately because they change without any message.

use crate::app::state::{
    AppModel, CaptureMode, PlayerState, RecordingState, SessionStatus, Viewer,
};
use crate::backends::camera::types::Facing;
use crate::flash::FlashMode;
use crate::storage::MediaKind;
use std::time::{Duration, Instant};

/// Recording indicator in the top bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingIndicator {
    Off,
    Starting,
    Recording(Duration),
    Saving,
}

/// Which controls accept input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub shutter: bool,
    pub switch_camera: bool,
    pub flash: bool,
    pub mode: bool,
    pub gallery: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryTile {
    pub label: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerContent {
    Photo,
    VideoLoading,
    VideoPlaying,
    VideoFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerPanel {
    pub title: String,
    pub content: ViewerContent,
}

/// Everything the screen renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenView {
    pub status: SessionStatus,
    pub status_label: String,
    pub camera_name: Option<String>,
    pub facing: Facing,
    pub flash: FlashMode,
    pub mode: CaptureMode,
    pub recording: RecordingIndicator,
    pub shutter_label: &'static str,
    pub controls: Controls,
    /// Present while the gallery overlay is open
    pub gallery: Option<Vec<GalleryTile>>,
    pub viewer: Option<ViewerPanel>,
    pub error: Option<String>,
}

/// Build the view model as of now
pub fn view(model: &AppModel) -> ScreenView {
    view_at(model, Instant::now())
}

/// Build the view model with `now` as the clock for recording time
pub fn view_at(model: &AppModel, now: Instant) -> ScreenView {
    let status = model.session.status;
    let ready = status == SessionStatus::Ready;

    let recording = match model.recording {
        RecordingState::Idle => RecordingIndicator::Off,
        RecordingState::Starting { .. } => RecordingIndicator::Starting,
        RecordingState::Recording { since } => {
            RecordingIndicator::Recording(now.saturating_duration_since(since))
        }
        RecordingState::Stopping => RecordingIndicator::Saving,
    };

    let shutter = match model.mode {
        CaptureMode::Photo => ready && !model.capture_in_flight,
        CaptureMode::Video => ready && model.recording != RecordingState::Stopping,
    };

    let shutter_label = match (model.mode, model.recording.is_busy()) {
        (CaptureMode::Photo, _) => "Take photo",
        (CaptureMode::Video, false) => "Record",
        (CaptureMode::Video, true) => "Stop",
    };

    let status_label = match status {
        SessionStatus::Uninitialized => "Camera off".to_string(),
        SessionStatus::Initializing => "Starting camera…".to_string(),
        SessionStatus::Ready => match &model.session.device {
            Some(device) => device.name.clone(),
            None => "Ready".to_string(),
        },
        SessionStatus::Failed => "Camera unavailable".to_string(),
    };

    let gallery = model.gallery.open.then(|| {
        model
            .gallery
            .assets
            .iter()
            .map(|asset| GalleryTile {
                label: asset.file_name(),
                kind: asset.kind,
            })
            .collect()
    });

    let viewer = model.viewer.as_ref().map(|viewer| ViewerPanel {
        title: viewer.asset().file_name(),
        content: match viewer {
            Viewer::Photo(_) => ViewerContent::Photo,
            Viewer::Video { player, .. } => match player {
                PlayerState::Opening => ViewerContent::VideoLoading,
                PlayerState::Playing(_) => ViewerContent::VideoPlaying,
                PlayerState::Failed => ViewerContent::VideoFailed,
            },
        },
    });

    ScreenView {
        status,
        status_label,
        camera_name: model.session.device.as_ref().map(|d| d.name.clone()),
        facing: model.session.facing,
        flash: model.session.flash,
        mode: model.mode,
        recording,
        shutter_label,
        controls: Controls {
            shutter,
            switch_camera: matches!(status, SessionStatus::Ready | SessionStatus::Failed)
                && !model.recording.is_busy(),
            flash: true,
            mode: !model.recording.is_busy(),
            gallery: true,
        },
        gallery,
        viewer,
        error: model.last_error.as_ref().map(|e| e.to_string()),
    }
}

/// `mm:ss` for the recording timer
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
