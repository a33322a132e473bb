// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer video player
//!
//! Pipeline: `filesrc ! decodebin ! queue ! videoconvert ! video/x-raw,format=RGBA ! appsink`

use super::{PlaybackBackend, PlayerHandle};
use crate::backends::camera::types::{BackendError, BackendResult};
use crate::backends::frames::{FrameSlot, attach_frame_slot, frame_from_sample};
use crate::constants::timing;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const PIPELINE: &str = "filesrc name=src ! decodebin ! queue ! videoconvert ! \
                        video/x-raw,format=RGBA ! appsink name=sink sync=true";

struct Player {
    handle: PlayerHandle,
    pipeline: gstreamer::Pipeline,
    frames: FrameSlot,
}

impl Player {
    fn shutdown(self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(?e, handle = %self.handle, "Failed to stop player pipeline");
        }
        self.frames.clear();
    }
}

/// Plays one video file at a time into a [`FrameSlot`]
#[derive(Default)]
pub struct GStreamerPlayback {
    player: Option<Player>,
}

impl GStreamerPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    fn player(&self, handle: PlayerHandle) -> BackendResult<&Player> {
        self.player
            .as_ref()
            .filter(|p| p.handle == handle)
            .ok_or(BackendError::StaleSession)
    }
}

/// Wait until the pipeline has prerolled
fn wait_for_preroll(pipeline: &gstreamer::Pipeline) -> BackendResult<()> {
    let bus = pipeline
        .bus()
        .ok_or_else(|| BackendError::Other("No bus on pipeline".into()))?;
    let deadline = Instant::now() + Duration::from_secs(timing::STATE_CHANGE_TIMEOUT_SECS);

    while Instant::now() < deadline {
        let Some(msg) = bus.timed_pop(gstreamer::ClockTime::from_mseconds(100)) else {
            continue;
        };
        match msg.view() {
            gstreamer::MessageView::Error(err) => {
                return Err(BackendError::Other(format!(
                    "Playback error: {}",
                    err.error()
                )));
            }
            gstreamer::MessageView::AsyncDone(_) => return Ok(()),
            _ => {}
        }
    }
    Err(BackendError::Other("Timed out opening video".into()))
}

impl PlaybackBackend for GStreamerPlayback {
    fn open(&mut self, path: &Path) -> BackendResult<PlayerHandle> {
        if let Some(previous) = self.player.take() {
            previous.shutdown();
        }

        gstreamer::init()
            .map_err(|e| BackendError::NotAvailable(format!("GStreamer init failed: {}", e)))?;

        let pipeline = gstreamer::parse::launch(PIPELINE)
            .map_err(|e| BackendError::Other(format!("Failed to create player: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::Other("Failed to downcast to Pipeline".into()))?;

        let src = pipeline
            .by_name("src")
            .ok_or_else(|| BackendError::Other("Player has no filesrc".into()))?;
        src.set_property("location", &*path.to_string_lossy());

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::Other("Player has no appsink".into()))?
            .downcast::<AppSink>()
            .map_err(|_| BackendError::Other("Failed to downcast to AppSink".into()))?;

        let frames = FrameSlot::new();
        attach_frame_slot(&appsink, frames.clone(), |_| {});

        pipeline
            .set_state(gstreamer::State::Paused)
            .map_err(|e| BackendError::Other(format!("Failed to preroll video: {:?}", e)))?;
        if let Err(e) = wait_for_preroll(&pipeline) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(e);
        }

        // Show the first frame before play is requested
        if let Some(sample) = appsink.try_pull_preroll(gstreamer::ClockTime::ZERO) {
            match frame_from_sample(&sample) {
                Ok(frame) => frames.store(frame),
                Err(e) => debug!(error = %e, "No usable preroll frame"),
            }
        }

        let handle = PlayerHandle::next();
        info!(%handle, path = %path.display(), "Video opened");
        self.player = Some(Player {
            handle,
            pipeline,
            frames,
        });
        Ok(handle)
    }

    fn play(&mut self, handle: PlayerHandle) -> BackendResult<()> {
        let player = self.player(handle)?;
        player
            .pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| BackendError::Other(format!("Failed to start playback: {:?}", e)))?;
        debug!(%handle, "Playback started");
        Ok(())
    }

    fn close(&mut self, handle: PlayerHandle) -> BackendResult<()> {
        self.player(handle)?;
        if let Some(player) = self.player.take() {
            player.shutdown();
            info!(%handle, "Video closed");
        }
        Ok(())
    }

    fn frame_slot(&self) -> Option<FrameSlot> {
        self.player.as_ref().map(|p| p.frames.clone())
    }
}

impl Drop for GStreamerPlayback {
    fn drop(&mut self) {
        if let Some(player) = self.player.take() {
            player.shutdown();
        }
    }
}
