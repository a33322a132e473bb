// SPDX-License-Identifier: GPL-3.0-only

//! Application state types

use crate::backends::camera::types::{CameraDevice, Facing, SessionHandle};
use crate::backends::camera::CameraBackendManager;
use crate::backends::playback::{PlaybackManager, PlayerHandle};
use crate::config::Config;
use crate::constants::ResolutionPreset;
use crate::errors::{AppError, AppResult};
use crate::flash::FlashMode;
use crate::storage::{Clock, FsMediaStore, MediaAsset, MediaStore, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Initialization status of the camera session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No device held
    #[default]
    Uninitialized,
    /// Enumeration or open in flight
    Initializing,
    /// Device open, capture allowed
    Ready,
    /// Last initialize failed; capture blocked until a retry succeeds
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Uninitialized => write!(f, "uninitialized"),
            SessionStatus::Initializing => write!(f, "initializing"),
            SessionStatus::Ready => write!(f, "ready"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What the shutter does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    Photo,
    Video,
}

impl CaptureMode {
    pub fn toggle(self) -> Self {
        match self {
            CaptureMode::Photo => CaptureMode::Video,
            CaptureMode::Video => CaptureMode::Photo,
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureMode::Photo => write!(f, "photo"),
            CaptureMode::Video => write!(f, "video"),
        }
    }
}

/// The binding to one opened camera
#[derive(Debug, Clone)]
pub struct CameraSession {
    /// Device the session is (or is being) opened on
    pub device: Option<CameraDevice>,
    pub handle: Option<SessionHandle>,
    pub preset: ResolutionPreset,
    pub flash: FlashMode,
    /// Facing requested for the next initialize; follows the opened device
    pub facing: Facing,
    pub status: SessionStatus,
    /// Bumped by every dispose and initialize so late completions are ignored
    pub generation: u64,
}

impl CameraSession {
    pub fn new(preset: ResolutionPreset) -> Self {
        Self {
            device: None,
            handle: None,
            preset,
            flash: FlashMode::Off,
            facing: Facing::Back,
            status: SessionStatus::Uninitialized,
            generation: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready && self.handle.is_some()
    }
}

/// Video recording progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    /// Start requested; `stop_requested` records a release that came early
    Starting { stop_requested: bool },
    Recording { since: Instant },
    /// Stop requested, file being finalized
    Stopping,
}

impl RecordingState {
    /// Whether the device is recording (acknowledged and not yet saved)
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RecordingState::Recording { .. } | RecordingState::Stopping
        )
    }

    /// Whether any recording work is in flight
    pub fn is_busy(&self) -> bool {
        !matches!(self, RecordingState::Idle)
    }
}

/// Gallery overlay
#[derive(Debug, Clone, Default)]
pub struct GalleryView {
    pub open: bool,
    /// Newest first
    pub assets: Vec<MediaAsset>,
    /// Sequence number of the newest scan request
    pub scan_seq: u64,
}

/// State of the gallery video player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Opening,
    Playing(PlayerHandle),
    Failed,
}

/// Enlarged view of one gallery asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Photo(MediaAsset),
    Video {
        asset: MediaAsset,
        player: PlayerState,
        /// Request number matched against `PlayerOpened`
        request: u64,
    },
}

impl Viewer {
    pub fn asset(&self) -> &MediaAsset {
        match self {
            Viewer::Photo(asset) | Viewer::Video { asset, .. } => asset,
        }
    }
}

/// Messages handled by [`AppModel::update`]
#[derive(Debug, Clone)]
pub enum Message {
    // ===== Lifecycle =====
    ScreenEntered,
    AppBackgrounded,
    AppResumed,
    ScreenClosed,

    // ===== User actions =====
    CapturePhoto,
    StartRecording,
    StopRecording,
    /// Short press of the shutter
    ShutterTapped,
    /// Long press of the shutter began
    ShutterHeld,
    /// Long press of the shutter ended
    ShutterReleased,
    ToggleFacing,
    ToggleFlash,
    ToggleMode,
    ToggleGallery,
    RefreshGallery,
    OpenAsset(MediaAsset),
    CloseAsset,
    DismissError,

    // ===== Completions =====
    /// Enumeration for the given session generation finished
    CamerasEnumerated(u64, AppResult<Vec<CameraDevice>>),
    /// Open for the given session generation finished
    SessionOpened(u64, CameraDevice, AppResult<SessionHandle>),
    SessionClosed(AppResult<()>),
    FlashApplied(FlashMode, AppResult<()>),
    PhotoSaved(AppResult<PathBuf>),
    RecordingStarted(SessionHandle, AppResult<()>),
    RecordingSaved(SessionHandle, AppResult<PathBuf>),
    /// Listing for the given scan sequence finished
    GalleryScanned(u64, AppResult<Vec<MediaAsset>>),
    /// Player for the given viewer request opened and started
    PlayerOpened(u64, AppResult<PlayerHandle>),
    PlayerClosed(AppResult<()>),
}

impl Message {
    /// Whether this message reports the result of earlier work
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            Message::CamerasEnumerated(..)
                | Message::SessionOpened(..)
                | Message::SessionClosed(_)
                | Message::FlashApplied(..)
                | Message::PhotoSaved(_)
                | Message::RecordingStarted(..)
                | Message::RecordingSaved(..)
                | Message::GalleryScanned(..)
                | Message::PlayerOpened(..)
                | Message::PlayerClosed(_)
        )
    }
}

/// Collaborators the controller delegates to
#[derive(Clone)]
pub struct Services {
    pub camera: CameraBackendManager,
    pub playback: PlaybackManager,
    pub store: Arc<dyn MediaStore>,
    pub clock: Arc<dyn Clock>,
}

/// The camera screen: sole owner and writer of all screen state
pub struct AppModel {
    pub config: Config,
    pub session: CameraSession,
    /// Result of the last enumeration
    pub available_cameras: Vec<CameraDevice>,
    pub mode: CaptureMode,
    pub recording: RecordingState,
    /// Single-flight guard for photo capture
    pub capture_in_flight: bool,
    pub gallery: GalleryView,
    pub viewer: Option<Viewer>,
    /// Error banner
    pub last_error: Option<AppError>,
    /// Most recently saved capture
    pub last_saved: Option<PathBuf>,
    /// Session was live when the app went to the background
    pub resume_pending: bool,
    pub closed: bool,
    pub(crate) viewer_seq: u64,
    pub(crate) services: Services,
}

impl AppModel {
    pub fn new(
        config: Config,
        camera: CameraBackendManager,
        playback: PlaybackManager,
        store: Arc<dyn MediaStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session = CameraSession::new(config.resolution);
        Self {
            config,
            session,
            available_cameras: Vec::new(),
            mode: CaptureMode::default(),
            recording: RecordingState::default(),
            capture_in_flight: false,
            gallery: GalleryView::default(),
            viewer: None,
            last_error: None,
            last_saved: None,
            resume_pending: false,
            closed: false,
            viewer_seq: 0,
            services: Services {
                camera,
                playback,
                store,
                clock,
            },
        }
    }

    /// Model wired to the real devices and the configured media directory
    pub fn from_config(config: Config) -> Self {
        let camera = CameraBackendManager::new(config.backend);
        let store = Arc::new(FsMediaStore::new(config.media_dir()));
        Self::new(
            config,
            camera,
            PlaybackManager::new(),
            store,
            Arc::new(SystemClock),
        )
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Directory captures are saved to
    pub fn media_dir(&self) -> PathBuf {
        self.services.store.root().to_path_buf()
    }

    /// Latest camera preview frame
    pub fn preview_frame(&self) -> Option<Arc<crate::backends::frames::PreviewFrame>> {
        if self.session.is_ready() {
            self.services.camera.preview_frame()
        } else {
            None
        }
    }

    /// Latest frame of the gallery video player
    pub fn player_frame(&self) -> Option<Arc<crate::backends::frames::PreviewFrame>> {
        match self.viewer {
            Some(Viewer::Video {
                player: PlayerState::Playing(_),
                ..
            }) => self.services.playback.current_frame(),
            _ => None,
        }
    }

    /// Release devices synchronously, for process exit
    pub fn teardown(&mut self) {
        self.session.generation += 1;
        self.session.handle = None;
        self.session.status = SessionStatus::Uninitialized;
        self.recording = RecordingState::Idle;
        self.viewer = None;
        if let Err(e) = self.services.camera.close_current() {
            tracing::warn!(error = %e, "Failed to close camera on exit");
        }
        if let Err(e) = self.services.playback.close_current() {
            tracing::warn!(error = %e, "Failed to close player on exit");
        }
        self.closed = true;
    }
}
