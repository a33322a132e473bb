// SPDX-License-Identifier: GPL-3.0-only

//! Video recording fed from preview frames
//!
//! The recorder owns its own pipeline:
//! `appsrc ! videoconvert ! <h264 encoder> ! h264parse ! mp4mux ! filesink`.
//! The capture session pushes every RGBA preview frame into the appsrc while
//! the recorder is alive, so the preview is never interrupted.

use crate::backends::camera::types::{BackendError, BackendResult};
use crate::backends::frames::PreviewFrame;
use crate::constants::{timing, video};
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// An in-progress MP4 recording
pub struct Recorder {
    pipeline: gstreamer::Pipeline,
    appsrc: AppSrc,
    output: PathBuf,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("output", &self.output)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// First available H.264 encoder element
fn select_encoder() -> Option<&'static str> {
    video::H264_ENCODERS
        .iter()
        .copied()
        .find(|name| gstreamer::ElementFactory::find(name).is_some())
}

/// Encoder element description tuned for live input
fn encoder_description(name: &str) -> String {
    match name {
        "x264enc" => "x264enc tune=zerolatency speed-preset=veryfast".to_string(),
        other => other.to_string(),
    }
}

impl Recorder {
    /// Build and start a recorder writing `width`x`height` RGBA frames to `output`
    pub fn start(width: u32, height: u32, output: &Path) -> BackendResult<Self> {
        let encoder = select_encoder()
            .ok_or_else(|| BackendError::RecordingFailed("No H.264 encoder available".into()))?;

        info!(
            encoder,
            width,
            height,
            output = %output.display(),
            "Starting recorder"
        );

        let description = format!(
            "appsrc name=src ! videoconvert ! {} ! h264parse ! mp4mux ! filesink name=sink",
            encoder_description(encoder)
        );

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::RecordingFailed(format!("Failed to build recorder: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::RecordingFailed("Recorder is not a pipeline".into()))?;

        let sink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::RecordingFailed("Recorder has no filesink".into()))?;
        sink.set_property("location", &*output.to_string_lossy());

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| BackendError::RecordingFailed("Recorder has no appsrc".into()))?
            .downcast::<AppSrc>()
            .map_err(|_| BackendError::RecordingFailed("Failed to downcast to AppSrc".into()))?;

        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", "RGBA")
            .field("width", width as i32)
            .field("height", height as i32)
            .field(
                "framerate",
                gstreamer::Fraction::new(video::RECORDING_FRAMERATE, 1),
            )
            .build();
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gstreamer::Format::Time);
        appsrc.set_is_live(true);
        appsrc.set_do_timestamp(true);

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            BackendError::RecordingFailed(format!("Failed to start recorder: {}", e))
        })?;

        Ok(Self {
            pipeline,
            appsrc,
            output: output.to_path_buf(),
            width,
            height,
        })
    }

    /// Feed one preview frame
    pub fn push(&self, frame: &PreviewFrame) {
        if frame.width != self.width || frame.height != self.height {
            debug!(
                frame_width = frame.width,
                frame_height = frame.height,
                "Skipping frame with unexpected size"
            );
            return;
        }

        let buffer = gstreamer::Buffer::from_slice(frame.data.clone());
        if let Err(e) = self.appsrc.push_buffer(buffer) {
            warn!(?e, "Failed to push frame to recorder");
        }
    }

    /// Flush the encoder, finalize the MP4 and return its path
    pub fn finish(self) -> BackendResult<PathBuf> {
        info!(output = %self.output.display(), "Finalizing recording");

        self.appsrc
            .end_of_stream()
            .map_err(|e| BackendError::RecordingFailed(format!("Failed to send EOS: {:?}", e)))?;

        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| BackendError::RecordingFailed("Recorder has no bus".into()))?;

        let outcome = match bus.timed_pop_filtered(
            gstreamer::ClockTime::from_seconds(timing::RECORDING_FINALIZE_TIMEOUT_SECS),
            &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
        ) {
            Some(msg) => match msg.view() {
                gstreamer::MessageView::Error(err) => {
                    error!(
                        error = %err.error(),
                        debug = ?err.debug(),
                        "Recorder error while finalizing"
                    );
                    Err(BackendError::RecordingFailed(err.error().to_string()))
                }
                _ => Ok(()),
            },
            None => {
                warn!("Timed out waiting for recorder EOS, file may be truncated");
                Ok(())
            }
        };

        let _ = self.pipeline.set_state(gstreamer::State::Null);

        match outcome {
            Ok(()) => Ok(self.output.clone()),
            Err(e) => {
                let _ = std::fs::remove_file(&self.output);
                Err(e)
            }
        }
    }

    /// Drop the recording and its partial file
    pub fn abort(self) {
        info!(output = %self.output.display(), "Discarding recording");
        let _ = self.pipeline.set_state(gstreamer::State::Null);
        if let Err(e) = std::fs::remove_file(&self.output) {
            debug!(error = %e, "No partial recording to remove");
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}
