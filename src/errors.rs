// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera application
//!
//! Device and filesystem failures are converted into these types at the point
//! where the asynchronous call completes and never propagate past the
//! controller. They end up in the log and in the screen's error banner.

use crate::app::state::SessionStatus;
use crate::backends::camera::types::{BackendError, Facing};
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Camera session errors
    Camera(CameraError),
    /// Recording-related errors
    Recording(RecordingError),
    /// Photo capture errors
    Photo(PhotoError),
    /// Media store errors (listing, writing)
    Storage(String),
    /// Gallery video preview errors
    Playback(String),
    /// Configuration errors
    Config(String),
    /// The operation belonged to a session that has since been disposed
    Cancelled,
    /// Generic error with message
    Other(String),
}

/// Camera-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// No camera devices found at all
    NoCameraFound,
    /// No device with the requested facing; the first device is used instead
    DeviceUnavailable(Facing),
    /// Device open/configure failed
    InitializationFailed(String),
    /// An operation needed a ready session
    NotReady(SessionStatus),
    /// Backend error outside of initialization
    Backend(String),
}

/// Recording-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    /// Failed to start recording
    StartFailed(String),
    /// Failed to stop recording
    StopFailed(String),
    /// A start or stop is already in progress
    AlreadyRecording,
    /// Stop requested without an active recording
    NotRecording,
    /// Recording requires video mode
    WrongMode,
    /// Capture mode cannot change while recording
    ModeLocked,
    /// Camera cannot be switched while recording
    SessionLocked,
}

/// Photo capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoError {
    /// Photo capture requires photo mode
    WrongMode,
    /// A capture is already in flight
    CaptureInProgress,
    /// Capture failed
    CaptureFailed(String),
    /// Save failed
    SaveFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Recording(e) => write!(f, "Recording error: {}", e),
            AppError::Photo(e) => write!(f, "Photo error: {}", e),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Playback(msg) => write!(f, "Playback error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Cancelled => write!(f, "Operation cancelled"),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoCameraFound => write!(f, "No camera devices found"),
            CameraError::DeviceUnavailable(facing) => {
                write!(f, "No {} camera available", facing)
            }
            CameraError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            CameraError::NotReady(status) => write!(f, "Camera is not ready ({})", status),
            CameraError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::StartFailed(msg) => write!(f, "Failed to start recording: {}", msg),
            RecordingError::StopFailed(msg) => write!(f, "Failed to stop recording: {}", msg),
            RecordingError::AlreadyRecording => write!(f, "Recording already in progress"),
            RecordingError::NotRecording => write!(f, "No recording in progress"),
            RecordingError::WrongMode => write!(f, "Recording requires video mode"),
            RecordingError::ModeLocked => write!(f, "Cannot change mode while recording"),
            RecordingError::SessionLocked => write!(f, "Cannot switch camera while recording"),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::WrongMode => write!(f, "Photo capture requires photo mode"),
            PhotoError::CaptureInProgress => write!(f, "A capture is already in progress"),
            PhotoError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            PhotoError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for RecordingError {}
impl std::error::Error for PhotoError {}

impl AppError {
    /// Whether this error is the quiet result of a disposed session
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<RecordingError> for AppError {
    fn from(err: RecordingError) -> Self {
        AppError::Recording(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<BackendError> for CameraError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InitializationFailed(msg) => CameraError::InitializationFailed(msg),
            BackendError::DeviceNotFound(_) => CameraError::NoCameraFound,
            other => CameraError::Backend(other.to_string()),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::StaleSession => AppError::Cancelled,
            other => AppError::Camera(other.into()),
        }
    }
}
