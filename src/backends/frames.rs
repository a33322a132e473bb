// SPDX-License-Identifier: GPL-3.0-only

//! RGBA frames handed from GStreamer appsinks to the screen

use super::camera::types::{BackendError, BackendResult};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::warn;

/// A tightly packed RGBA frame (stride == width * 4)
#[derive(Clone)]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl std::fmt::Debug for PreviewFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PreviewFrame({}x{}, {} bytes)",
            self.width,
            self.height,
            self.data.len()
        )
    }
}

impl PreviewFrame {
    /// RGBA pixel at (x, y), black when out of range
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 255];
        }
        let offset = ((y * self.width + x) * 4) as usize;
        match self.data.get(offset..offset + 4) {
            Some(px) => [px[0], px[1], px[2], px[3]],
            None => [0, 0, 0, 255],
        }
    }
}

/// Latest-frame mailbox shared between a streaming thread and readers
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<Option<Arc<PreviewFrame>>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, frame: PreviewFrame) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(frame));
    }

    pub fn latest(&self) -> Option<Arc<PreviewFrame>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Copy an RGBA sample into a packed frame, dropping row padding
pub fn frame_from_sample(sample: &gstreamer::Sample) -> BackendResult<PreviewFrame> {
    let caps = sample
        .caps()
        .ok_or_else(|| BackendError::Other("No caps on sample".into()))?;
    let info = VideoInfo::from_caps(caps)
        .map_err(|e| BackendError::Other(format!("Invalid video caps: {}", e)))?;
    let buffer = sample
        .buffer()
        .ok_or_else(|| BackendError::Other("No buffer in sample".into()))?;
    let map = buffer
        .map_readable()
        .map_err(|_| BackendError::Other("Failed to map buffer".into()))?;

    let width = info.width();
    let height = info.height();
    let row_bytes = (width * 4) as usize;
    let stride = info.stride()[0] as usize;
    let src = map.as_slice();

    let data: Vec<u8> = if stride == row_bytes {
        src.get(..row_bytes * height as usize)
            .ok_or_else(|| BackendError::Other("Short RGBA buffer".into()))?
            .to_vec()
    } else {
        let mut packed = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let line = src
                .get(start..start + row_bytes)
                .ok_or_else(|| BackendError::Other("Short RGBA buffer".into()))?;
            packed.extend_from_slice(line);
        }
        packed
    };

    Ok(PreviewFrame {
        width,
        height,
        data: Arc::from(data.into_boxed_slice()),
        captured_at: Instant::now(),
    })
}

/// Route every sample of `appsink` into `slot`, handing each frame to `tap` too
///
/// Clock sync is left to the caller: live previews disable it, playback keeps it.
pub fn attach_frame_slot<F>(appsink: &AppSink, slot: FrameSlot, tap: F)
where
    F: Fn(&PreviewFrame) + Send + Sync + 'static,
{
    appsink.set_property("emit-signals", true);
    appsink.set_property("max-buffers", 2u32);
    appsink.set_property("drop", true);

    appsink.set_callbacks(
        gstreamer_app::AppSinkCallbacks::builder()
            .new_sample(move |appsink| {
                let sample = appsink
                    .pull_sample()
                    .map_err(|_| gstreamer::FlowError::Eos)?;
                match frame_from_sample(&sample) {
                    Ok(frame) => {
                        tap(&frame);
                        slot.store(frame);
                        Ok(gstreamer::FlowSuccess::Ok)
                    }
                    Err(e) => {
                        warn!(error = %e, "Dropping unreadable frame");
                        Ok(gstreamer::FlowSuccess::Ok)
                    }
                }
            })
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> PreviewFrame {
        let data: Vec<u8> = (0..width * height)
            .flat_map(|i| [i as u8, 0, 0, 255])
            .collect();
        PreviewFrame {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_pixel_lookup() {
        let f = frame(4, 2);
        assert_eq!(f.pixel(1, 1), [5, 0, 0, 255]);
        assert_eq!(f.pixel(9, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_slot_keeps_latest() {
        let slot = FrameSlot::new();
        assert!(slot.latest().is_none());
        slot.store(frame(1, 1));
        slot.store(frame(2, 2));
        assert_eq!(slot.latest().map(|f| f.width), Some(2));
        slot.clear();
        assert!(slot.latest().is_none());
    }
}
