// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! Photo, video and gallery commands drive the same controller as the screen,
//! headless: messages go through a [`Dispatcher`] and the command waits for
//! the resulting work to settle.

use chrono::{Local, TimeZone};
use shutter::app::{AppModel, Dispatcher, Message, SessionStatus};
use shutter::backends::camera::{CameraBackendManager, Facing};
use shutter::constants::timing;
use shutter::storage::MediaKind;
use shutter::{AppError, Config};
use std::path::PathBuf;
use std::time::Duration;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// List all available cameras
pub fn list_cameras(config: &Config) -> CliResult {
    let manager = CameraBackendManager::new(config.backend);
    let cameras = match manager.enumerate_cameras() {
        Ok(cameras) => cameras,
        Err(e) => {
            println!("No cameras found ({}).", e);
            return Ok(());
        }
    };

    println!("Available cameras ({}):", config.backend);
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {} ({})", index, camera.name, camera.facing);
        if let Some(path) = &camera.path {
            println!("      Device: {}", path);
        }
    }
    Ok(())
}

/// Open the camera, failing if it does not become ready
async fn open_camera(
    dispatcher: &mut Dispatcher,
    model: &mut AppModel,
    front: bool,
) -> Result<(), AppError> {
    if front {
        model.session.facing = Facing::Front;
    }
    dispatcher.run(model, Message::ScreenEntered).await;

    if model.session.status != SessionStatus::Ready {
        return Err(model
            .last_error
            .clone()
            .unwrap_or_else(|| AppError::Other("Camera did not start".into())));
    }
    if let Some(device) = &model.session.device {
        println!("Using camera: {}", device.name);
    }
    Ok(())
}

/// The saved file, or the error the controller reported
fn outcome(model: &AppModel) -> Result<PathBuf, AppError> {
    if let Some(err) = &model.last_error {
        return Err(err.clone());
    }
    model
        .last_saved
        .clone()
        .ok_or_else(|| AppError::Other("Nothing was saved".into()))
}

/// Take a photo into the media directory
pub fn take_photo(config: Config, front: bool) -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    let mut model = AppModel::from_config(config);
    let mut dispatcher = Dispatcher::new();

    let result = runtime.block_on(async {
        open_camera(&mut dispatcher, &mut model, front).await?;
        tokio::time::sleep(timing::CLI_WARMUP).await;

        println!("Capturing...");
        dispatcher.run(&mut model, Message::CapturePhoto).await;
        let saved = outcome(&model);

        dispatcher.run(&mut model, Message::ScreenClosed).await;
        saved
    });

    let path = result?;
    println!("Photo saved: {}", path.display());
    Ok(())
}

/// Record a video of `duration` seconds into the media directory
pub fn record_video(config: Config, duration: u64, front: bool) -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    let mut model = AppModel::from_config(config);
    let mut dispatcher = Dispatcher::new();

    let result = runtime.block_on(async {
        open_camera(&mut dispatcher, &mut model, front).await?;

        dispatcher.run(&mut model, Message::ToggleMode).await;
        dispatcher.run(&mut model, Message::StartRecording).await;
        if !model.recording.is_active() {
            let err = model
                .last_error
                .clone()
                .unwrap_or_else(|| AppError::Other("Recording did not start".into()));
            dispatcher.run(&mut model, Message::ScreenClosed).await;
            return Err(err);
        }

        println!("Recording for {} seconds...", duration);
        tokio::time::sleep(Duration::from_secs(duration)).await;

        dispatcher.run(&mut model, Message::StopRecording).await;
        let saved = outcome(&model);

        dispatcher.run(&mut model, Message::ScreenClosed).await;
        saved
    });

    let path = result?;
    println!("Video saved: {}", path.display());
    Ok(())
}

/// Print the gallery, newest first
pub fn list_gallery(config: Config) -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    let mut model = AppModel::from_config(config);
    let mut dispatcher = Dispatcher::new();

    runtime.block_on(dispatcher.run(&mut model, Message::ToggleGallery));
    if let Some(err) = &model.last_error {
        return Err(err.clone().into());
    }

    let media_dir = model.media_dir();
    if model.gallery.assets.is_empty() {
        println!("No photos or videos in {}", media_dir.display());
        return Ok(());
    }

    println!("{}:", media_dir.display());
    for asset in &model.gallery.assets {
        let kind = match asset.kind {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        };
        let taken = asset
            .timestamp
            .and_then(|millis| Local.timestamp_millis_opt(millis).single())
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {}  {}  {}", taken, kind, asset.file_name());
    }
    Ok(())
}
