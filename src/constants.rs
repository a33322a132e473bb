// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capture resolution presets
///
/// The preset is requested when a camera session is opened. The preview and
/// recorded video are scaled to this size; stills are encoded at it too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPreset {
    /// 352x288
    Low,
    /// 720x480
    Medium,
    /// 1280x720 (default)
    #[default]
    High,
    /// 1920x1080
    VeryHigh,
    /// 3840x2160
    UltraHigh,
    /// Whatever the device delivers natively
    Max,
}

impl ResolutionPreset {
    /// All presets from lowest to highest
    pub const ALL: [ResolutionPreset; 6] = [
        ResolutionPreset::Low,
        ResolutionPreset::Medium,
        ResolutionPreset::High,
        ResolutionPreset::VeryHigh,
        ResolutionPreset::UltraHigh,
        ResolutionPreset::Max,
    ];

    /// Target frame size, `None` for [`ResolutionPreset::Max`]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            ResolutionPreset::Low => Some((352, 288)),
            ResolutionPreset::Medium => Some((720, 480)),
            ResolutionPreset::High => Some((1280, 720)),
            ResolutionPreset::VeryHigh => Some((1920, 1080)),
            ResolutionPreset::UltraHigh => Some((3840, 2160)),
            ResolutionPreset::Max => None,
        }
    }

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            ResolutionPreset::Low => "Low",
            ResolutionPreset::Medium => "Medium",
            ResolutionPreset::High => "High",
            ResolutionPreset::VeryHigh => "Very high",
            ResolutionPreset::UltraHigh => "Ultra high",
            ResolutionPreset::Max => "Max",
        }
    }
}

impl std::fmt::Display for ResolutionPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.dimensions() {
            Some((w, h)) => write!(f, "{} ({}x{})", self.display_name(), w, h),
            None => write!(f, "{}", self.display_name()),
        }
    }
}

/// Media file naming
pub mod file_formats {
    /// Suffix of captured stills; the gallery recognises photos by it
    pub const PHOTO_SUFFIX: &str = ".jpg";
    /// Suffix of recorded videos; the gallery recognises videos by it
    pub const VIDEO_SUFFIX: &str = ".mp4";
    /// JPEG encoder quality for stills
    pub const JPEG_QUALITY: u8 = 92;
    /// Prefix of temporary files handed from the camera to the media store
    pub const TEMP_PREFIX: &str = "shutter-";
}

/// Directory and file names
pub mod paths {
    /// Application directory name under config/cache/pictures
    pub const APP_DIR: &str = "shutter";
    /// Config file name inside the config directory
    pub const CONFIG_FILE: &str = "config.json";
    /// Log file used while the terminal screen owns stdout
    pub const LOG_FILE: &str = "shutter.log";
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// How long a still capture waits for the first preview frame
    pub const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(3);
    /// How long opening a session waits for the pipeline to start
    pub const STATE_CHANGE_TIMEOUT_SECS: u64 = 5;
    /// How long stopping a recording waits for the muxer to finalize
    pub const RECORDING_FINALIZE_TIMEOUT_SECS: u64 = 5;
    /// Terminal redraw / input poll interval
    pub const TERMINAL_POLL: Duration = Duration::from_millis(33);
    /// Delay before a headless capture so auto exposure can settle
    pub const CLI_WARMUP: Duration = Duration::from_millis(500);
    /// Upper bound on releasing devices at exit
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Video encoding
pub mod video {
    /// Framerate announced to the recording pipeline
    pub const RECORDING_FRAMERATE: i32 = 30;
    /// H.264 encoders in order of preference
    pub const H264_ENCODERS: &[&str] = &["x264enc", "openh264enc", "avenc_h264"];
}
