// SPDX-License-Identifier: GPL-3.0-only

//! One open camera: preview pipeline, still capture and the recorder tap
//!
//! Pipeline: `<source> ! videoconvert ! videoscale ! video/x-raw,format=RGBA ! appsink`

use super::recorder::Recorder;
use crate::backends::camera::types::{BackendError, BackendResult, SessionHandle};
use crate::backends::frames::{FrameSlot, PreviewFrame, attach_frame_slot};
use crate::constants::{ResolutionPreset, file_formats, timing};
use crate::storage::{MediaKind, temp_media_path};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

type SharedRecorder = Arc<Mutex<Option<Recorder>>>;

/// A live capture pipeline bound to one device
pub struct CaptureSession {
    handle: SessionHandle,
    pipeline: gstreamer::Pipeline,
    frames: FrameSlot,
    recorder: SharedRecorder,
}

impl CaptureSession {
    /// Build the preview pipeline around `source` and bring it to Playing
    pub fn open(
        handle: SessionHandle,
        source: gstreamer::Element,
        preset: ResolutionPreset,
    ) -> BackendResult<Self> {
        let init_err = |what: &str, e: &dyn std::fmt::Display| {
            BackendError::InitializationFailed(format!("{}: {}", what, e))
        };

        let pipeline = gstreamer::Pipeline::new();
        let convert = gstreamer::ElementFactory::make("videoconvert")
            .build()
            .map_err(|e| init_err("Failed to create videoconvert", &e))?;
        let scale = gstreamer::ElementFactory::make("videoscale")
            .build()
            .map_err(|e| init_err("Failed to create videoscale", &e))?;

        let mut caps = gstreamer::Caps::builder("video/x-raw").field("format", "RGBA");
        if let Some((width, height)) = preset.dimensions() {
            caps = caps
                .field("width", width as i32)
                .field("height", height as i32);
        }
        let capsfilter = gstreamer::ElementFactory::make("capsfilter")
            .property("caps", caps.build())
            .build()
            .map_err(|e| init_err("Failed to create capsfilter", &e))?;

        let appsink = AppSink::builder().build();
        appsink.set_property("sync", false);

        pipeline
            .add_many([&source, &convert, &scale, &capsfilter, appsink.upcast_ref()])
            .map_err(|e| init_err("Failed to add elements", &e))?;
        gstreamer::Element::link_many([&source, &convert, &scale, &capsfilter, appsink.upcast_ref()])
            .map_err(|e| init_err("Failed to link elements", &e))?;

        let frames = FrameSlot::new();
        let recorder: SharedRecorder = Arc::new(Mutex::new(None));
        let tap = Arc::clone(&recorder);
        attach_frame_slot(&appsink, frames.clone(), move |frame| {
            if let Some(rec) = tap.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
                rec.push(frame);
            }
        });

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| init_err("Failed to start pipeline", &e))?;

        let (result, _state, _pending) = pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STATE_CHANGE_TIMEOUT_SECS,
        ));
        if result.is_err() {
            let reason = bus_error(&pipeline).unwrap_or_else(|| "pipeline did not start".into());
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(BackendError::InitializationFailed(reason));
        }

        info!(%handle, %preset, "Capture session started");
        Ok(Self {
            handle,
            pipeline,
            frames,
            recorder,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// Shared handle to the preview mailbox
    pub fn frames(&self) -> FrameSlot {
        self.frames.clone()
    }

    fn wait_for_frame(&self) -> BackendResult<Arc<PreviewFrame>> {
        let deadline = Instant::now() + timing::FIRST_FRAME_TIMEOUT;
        loop {
            if let Some(frame) = self.frames.latest() {
                return Ok(frame);
            }
            if Instant::now() >= deadline {
                return Err(BackendError::CaptureFailed(
                    "No frame received from camera".into(),
                ));
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    /// Encode the newest frame as a JPEG in a temporary file
    pub fn capture_still(&self) -> BackendResult<PathBuf> {
        let frame = self.wait_for_frame()?;
        let rgba = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.to_vec())
            .ok_or_else(|| BackendError::CaptureFailed("Frame size mismatch".into()))?;
        let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

        let mut jpeg = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            std::io::Cursor::new(&mut jpeg),
            file_formats::JPEG_QUALITY,
        );
        encoder
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| BackendError::CaptureFailed(format!("JPEG encoding failed: {}", e)))?;

        let path = temp_media_path(MediaKind::Photo);
        std::fs::write(&path, &jpeg)?;

        debug!(path = %path.display(), width = rgb.width(), height = rgb.height(), "Still captured");
        Ok(path)
    }

    pub fn is_recording(&self) -> bool {
        self.recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Attach a recorder sized to the current preview frames
    pub fn start_recording(&self) -> BackendResult<()> {
        if self.is_recording() {
            return Err(BackendError::RecordingInProgress);
        }

        // The streaming thread takes the recorder lock for every frame, so
        // wait for a frame before holding it
        let frame = self.wait_for_frame()?;
        let output = temp_media_path(MediaKind::Video);
        let recorder = Recorder::start(frame.width, frame.height, &output)?;

        let mut slot = self.recorder.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            recorder.abort();
            return Err(BackendError::RecordingInProgress);
        }
        *slot = Some(recorder);
        Ok(())
    }

    /// Detach the recorder and finalize its file
    pub fn stop_recording(&self) -> BackendResult<PathBuf> {
        let recorder = self
            .recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(BackendError::NoRecordingInProgress)?;
        recorder.finish()
    }

    /// Stop everything; a running recording is discarded
    pub fn close(self) {
        if let Some(recorder) = self
            .recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            recorder.abort();
        }
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            error!(?e, handle = %self.handle, "Failed to stop capture pipeline");
        }
        self.frames.clear();
        info!(handle = %self.handle, "Capture session closed");
    }
}

/// First error message waiting on the pipeline bus
fn bus_error(pipeline: &gstreamer::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let msg = bus.timed_pop_filtered(gstreamer::ClockTime::ZERO, &[gstreamer::MessageType::Error])?;
    match msg.view() {
        gstreamer::MessageView::Error(err) => Some(err.error().to_string()),
        _ => None,
    }
}
