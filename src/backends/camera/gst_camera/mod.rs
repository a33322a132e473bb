// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer camera backend
//!
//! Devices come from a `gstreamer::DeviceMonitor` filtered on `Video/Source`
//! (PipeWire, libcamera and V4L2 providers all report there). The
//! [`CameraBackendType::TestPattern`] flavour replaces them with two
//! `videotestsrc` cameras so the application runs without hardware.

mod recorder;
mod session;

pub use recorder::Recorder;
pub use session::CaptureSession;

use super::CameraBackend;
use super::types::*;
use crate::backends::frames::FrameSlot;
use crate::constants::ResolutionPreset;
use crate::flash::{self, FlashDevice, FlashMode};
use gstreamer::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Device properties that carry the sensor location, in lookup order
const LOCATION_PROPERTIES: &[&str] = &[
    "api.libcamera.location",
    "camera.location",
    "device.location",
];

/// Where a session's source element comes from
enum DeviceSource {
    Monitor(gstreamer::Device),
    TestPattern(&'static str),
}

/// Camera backend built on GStreamer pipelines
pub struct GStreamerBackend {
    backend_type: CameraBackendType,
    sources: HashMap<String, DeviceSource>,
    session: Option<CaptureSession>,
    /// Discovered lazily on the first flash request
    flash_leds: Option<Vec<FlashDevice>>,
    torch_on: bool,
}

impl GStreamerBackend {
    pub fn new(backend_type: CameraBackendType) -> Self {
        Self {
            backend_type,
            sources: HashMap::new(),
            session: None,
            flash_leds: None,
            torch_on: false,
        }
    }

    fn session(&self, handle: SessionHandle) -> BackendResult<&CaptureSession> {
        self.session
            .as_ref()
            .filter(|s| s.handle() == handle)
            .ok_or(BackendError::StaleSession)
    }

    fn monitor_devices(&mut self) -> BackendResult<Vec<CameraDevice>> {
        let monitor = gstreamer::DeviceMonitor::new();
        monitor.add_filter(Some("Video/Source"), None);
        monitor
            .start()
            .map_err(|e| BackendError::NotAvailable(format!("Device monitor failed: {}", e)))?;
        let devices = monitor.devices();
        monitor.stop();

        let mut cameras = Vec::new();
        for (index, device) in devices.into_iter().enumerate() {
            let name = device.display_name().to_string();
            let props = device.properties();

            let facing = props
                .as_ref()
                .and_then(|p| {
                    LOCATION_PROPERTIES
                        .iter()
                        .find_map(|key| p.get::<String>(*key).ok())
                })
                .map(|loc| Facing::from_location(&loc))
                .unwrap_or(Facing::External);

            let path = props.as_ref().and_then(|p| {
                p.get::<String>("api.v4l2.path")
                    .or_else(|_| p.get::<String>("device.path"))
                    .ok()
            });

            let id = format!("gst:{}:{}", index, name);
            debug!(%id, %facing, ?path, "Found camera");
            self.sources.insert(id.clone(), DeviceSource::Monitor(device));
            cameras.push(CameraDevice {
                id,
                name,
                facing,
                path,
            });
        }
        Ok(cameras)
    }

    fn test_pattern_devices(&mut self) -> Vec<CameraDevice> {
        [
            ("test:back", "Test Pattern (back)", Facing::Back, "smpte"),
            ("test:front", "Test Pattern (front)", Facing::Front, "ball"),
        ]
        .into_iter()
        .map(|(id, name, facing, pattern)| {
            self.sources
                .insert(id.to_string(), DeviceSource::TestPattern(pattern));
            CameraDevice {
                id: id.to_string(),
                name: name.to_string(),
                facing,
                path: None,
            }
        })
        .collect()
    }

    fn make_source(&self, device: &CameraDevice) -> BackendResult<gstreamer::Element> {
        match self.sources.get(&device.id) {
            Some(DeviceSource::Monitor(dev)) => dev.create_element(None).map_err(|e| {
                BackendError::InitializationFailed(format!(
                    "Failed to create source for {}: {}",
                    device.name, e
                ))
            }),
            Some(DeviceSource::TestPattern(pattern)) => {
                gstreamer::ElementFactory::make("videotestsrc")
                    .property("is-live", true)
                    .property_from_str("pattern", pattern)
                    .build()
                    .map_err(|e| {
                        BackendError::InitializationFailed(format!(
                            "Failed to create videotestsrc: {}",
                            e
                        ))
                    })
            }
            None => Err(BackendError::DeviceNotFound(device.name.clone())),
        }
    }

    fn drive_torch(&mut self, mode: FlashMode) -> BackendResult<()> {
        let leds = self.flash_leds.get_or_insert_with(FlashDevice::discover);
        if leds.is_empty() {
            return if mode.is_on() {
                Err(BackendError::FlashUnavailable("no flash LED found".into()))
            } else {
                Ok(())
            };
        }
        flash::apply_all(leds, mode)?;
        self.torch_on = mode.is_on();
        Ok(())
    }
}

impl CameraBackend for GStreamerBackend {
    fn enumerate_cameras(&mut self) -> BackendResult<Vec<CameraDevice>> {
        gstreamer::init()
            .map_err(|e| BackendError::NotAvailable(format!("GStreamer init failed: {}", e)))?;

        self.sources.clear();
        let cameras = match self.backend_type {
            CameraBackendType::GStreamer => self.monitor_devices()?,
            CameraBackendType::TestPattern => self.test_pattern_devices(),
        };
        info!(count = cameras.len(), backend = %self.backend_type, "Enumerated cameras");
        Ok(cameras)
    }

    fn open(
        &mut self,
        device: &CameraDevice,
        preset: ResolutionPreset,
    ) -> BackendResult<SessionHandle> {
        if let Some(previous) = self.session.take() {
            warn!(handle = %previous.handle(), "Replacing a session that was never closed");
            previous.close();
        }

        if !self.sources.contains_key(&device.id) {
            self.enumerate_cameras()?;
        }
        let source = self.make_source(device)?;

        let handle = SessionHandle::next();
        self.session = Some(CaptureSession::open(handle, source, preset)?);
        Ok(handle)
    }

    fn set_flash(&mut self, handle: SessionHandle, mode: FlashMode) -> BackendResult<()> {
        self.session(handle)?;
        self.drive_torch(mode)
    }

    fn capture_still(&mut self, handle: SessionHandle) -> BackendResult<PathBuf> {
        self.session(handle)?.capture_still()
    }

    fn start_video(&mut self, handle: SessionHandle) -> BackendResult<()> {
        self.session(handle)?.start_recording()
    }

    fn stop_video(&mut self, handle: SessionHandle) -> BackendResult<PathBuf> {
        self.session(handle)?.stop_recording()
    }

    fn close(&mut self, handle: SessionHandle) -> BackendResult<()> {
        let session = match self.session.take() {
            Some(s) if s.handle() == handle => s,
            other => {
                self.session = other;
                return Err(BackendError::StaleSession);
            }
        };
        session.close();

        if self.torch_on {
            if let Err(e) = self.drive_torch(FlashMode::Off) {
                warn!(error = %e, "Failed to switch torch off");
            }
        }
        Ok(())
    }

    fn frame_slot(&self) -> Option<FrameSlot> {
        self.session.as_ref().map(|s| s.frames())
    }

    fn backend_type(&self) -> CameraBackendType {
        self.backend_type
    }
}

impl Drop for GStreamerBackend {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }
}
