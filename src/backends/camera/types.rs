// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraBackendType {
    /// Real cameras discovered through the GStreamer device monitor
    #[default]
    GStreamer,
    /// Two synthetic cameras (back + front) built from `videotestsrc`
    TestPattern,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::GStreamer => write!(f, "GStreamer"),
            CameraBackendType::TestPattern => write!(f, "test pattern"),
        }
    }
}

impl std::str::FromStr for CameraBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gstreamer" | "gst" => Ok(CameraBackendType::GStreamer),
            "test" | "test-pattern" | "test_pattern" => Ok(CameraBackendType::TestPattern),
            other => Err(format!("unknown camera backend: {}", other)),
        }
    }
}

/// Camera orientation relative to the device body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Faces away from the user
    #[default]
    Back,
    /// Faces the user
    Front,
    /// External camera with no meaningful orientation
    External,
}

impl Facing {
    /// The facing a switch-camera action aims for
    pub fn opposite(self) -> Self {
        match self {
            Facing::Back => Facing::Front,
            Facing::Front | Facing::External => Facing::Back,
        }
    }

    /// Parse a libcamera/PipeWire location property ("front", "back", "external")
    pub fn from_location(location: &str) -> Self {
        match location.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => Facing::Front,
            "back" | "rear" | "environment" => Facing::Back,
            _ => Facing::External,
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Back => write!(f, "back"),
            Facing::Front => write!(f, "front"),
            Facing::External => write!(f, "external"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Stable identifier within one enumeration (used to reopen the device)
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Physical orientation
    pub facing: Facing,
    /// Device node if the backend exposes one (e.g. /dev/video0)
    pub path: Option<String>,
}

/// Identifies one opened camera session
///
/// Handles are never reused, so a handle held by an in-flight operation stops
/// matching as soon as its session is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(pub u64);

impl SessionHandle {
    /// Allocate a fresh handle
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SessionHandle(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to open or configure the device
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// The handle belongs to a session that was closed
    StaleSession,
    /// Still capture failed
    CaptureFailed(String),
    /// Recording already in progress
    RecordingInProgress,
    /// No recording in progress
    NoRecordingInProgress,
    /// Recording pipeline error
    RecordingFailed(String),
    /// No controllable flash LED
    FlashUnavailable(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::StaleSession => write!(f, "Session was closed"),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::RecordingInProgress => write!(f, "Recording already in progress"),
            BackendError::NoRecordingInProgress => write!(f, "No recording in progress"),
            BackendError::RecordingFailed(msg) => write!(f, "Recording failed: {}", msg),
            BackendError::FlashUnavailable(msg) => write!(f, "Flash unavailable: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}
