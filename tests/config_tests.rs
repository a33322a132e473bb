// SPDX-License-Identifier: GPL-3.0-only

//! Config file round trips

use shutter::backends::camera::CameraBackendType;
use shutter::{Config, ResolutionPreset};
use std::path::PathBuf;

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.resolution, ResolutionPreset::High);
    assert_eq!(config.backend, CameraBackendType::GStreamer);
    assert!(config.media_dir.is_none());
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
        Config::load_from(&dir.path().join("config.json")),
        Config::default()
    );
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");
    let config = Config {
        media_dir: Some(PathBuf::from("/srv/captures")),
        resolution: ResolutionPreset::Low,
        backend: CameraBackendType::TestPattern,
    };

    config.save_to(&path).unwrap();

    assert_eq!(Config::load_from(&path), config);
    assert_eq!(config.media_dir(), PathBuf::from("/srv/captures"));
}

#[test]
fn test_file_uses_snake_case_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"resolution":"very_high","backend":"test_pattern"}"#).unwrap();

    let config = Config::load_from(&path);

    assert_eq!(config.resolution, ResolutionPreset::VeryHigh);
    assert_eq!(config.backend, CameraBackendType::TestPattern);
}

#[test]
fn test_default_media_dir_is_app_folder() {
    let dir = Config::default().media_dir();
    assert!(dir.ends_with("shutter"));
}
