// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend lifecycle manager
//!
//! The manager provides:
//! - Thread-safe backend access (cloned into blocking tasks)
//! - The single-session rule: opening a session closes the previous one first
//! - Ordered opens: an open for an older generation never replaces a newer session
//! - Handle validation, so work for a disposed session fails instead of
//!   touching the device that replaced it
//! - Preview reads that never wait for a device call in progress

use super::types::*;
use super::{CameraBackend, get_backend_for_type};
use crate::backends::frames::{FrameSlot, PreviewFrame};
use crate::constants::ResolutionPreset;
use crate::flash::FlashMode;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Internal manager state
struct ManagerState {
    /// The active backend instance
    backend: Box<dyn CameraBackend>,
    /// Handle of the live session, if any
    current: Option<SessionHandle>,
    /// Newest generation passed to `open`
    latest_generation: u64,
}

impl ManagerState {
    fn check(&self, handle: SessionHandle) -> BackendResult<()> {
        if self.current == Some(handle) {
            Ok(())
        } else {
            Err(BackendError::StaleSession)
        }
    }
}

/// Camera backend manager
///
/// Cheap to clone; all clones share one backend. The live session's frame
/// slot is kept beside the backend lock, which device calls hold for their
/// whole duration.
#[derive(Clone)]
pub struct CameraBackendManager {
    state: Arc<Mutex<ManagerState>>,
    frames: Arc<Mutex<Option<FrameSlot>>>,
}

impl CameraBackendManager {
    /// Create a manager for the given backend type
    pub fn new(backend_type: CameraBackendType) -> Self {
        info!(backend = %backend_type, "Creating camera backend manager");
        Self::with_backend(get_backend_for_type(backend_type))
    }

    /// Wrap an already constructed backend
    pub fn with_backend(backend: Box<dyn CameraBackend>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManagerState {
                backend,
                current: None,
                latest_generation: 0,
            })),
            frames: Arc::new(Mutex::new(None)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_frames(&self, slot: Option<FrameSlot>) {
        *self.frames.lock().unwrap_or_else(PoisonError::into_inner) = slot;
    }

    /// Get the backend type
    pub fn backend_type(&self) -> CameraBackendType {
        self.lock().backend.backend_type()
    }

    /// Enumerate available cameras, failing when there are none
    pub fn enumerate_cameras(&self) -> BackendResult<Vec<CameraDevice>> {
        let cameras = self.lock().backend.enumerate_cameras()?;
        if cameras.is_empty() {
            Err(BackendError::DeviceNotFound("No cameras found".to_string()))
        } else {
            Ok(cameras)
        }
    }

    /// Open a session for `generation`, closing any live one first
    ///
    /// An open for a generation older than one already seen fails with
    /// [`BackendError::StaleSession`] and leaves the newer session running.
    pub fn open(
        &self,
        device: &CameraDevice,
        preset: ResolutionPreset,
        generation: u64,
    ) -> BackendResult<SessionHandle> {
        let mut state = self.lock();
        if generation < state.latest_generation {
            debug!(
                generation,
                latest = state.latest_generation,
                "Refusing open for a superseded request"
            );
            return Err(BackendError::StaleSession);
        }
        state.latest_generation = generation;

        if let Some(previous) = state.current.take() {
            info!(%previous, "Closing live session before opening a new one");
            self.set_frames(None);
            if let Err(e) = state.backend.close(previous) {
                warn!(%previous, error = %e, "Failed to close previous session");
            }
        }

        info!(device = %device.name, facing = %device.facing, %preset, generation, "Opening camera session");
        let handle = state.backend.open(device, preset)?;
        state.current = Some(handle);
        self.set_frames(state.backend.frame_slot());
        Ok(handle)
    }

    /// Close a session; closing an already closed session is a no-op
    pub fn close(&self, handle: SessionHandle) -> BackendResult<()> {
        let mut state = self.lock();
        if state.current != Some(handle) {
            debug!(%handle, "Session already closed");
            return Ok(());
        }
        state.current = None;
        self.set_frames(None);
        info!(%handle, "Closing camera session");
        state.backend.close(handle)
    }

    /// Close whatever session is live
    pub fn close_current(&self) -> BackendResult<()> {
        let current = self.lock().current;
        match current {
            Some(handle) => self.close(handle),
            None => Ok(()),
        }
    }

    /// Whether `handle` is the live session
    pub fn is_current(&self, handle: SessionHandle) -> bool {
        self.lock().current == Some(handle)
    }

    pub fn set_flash(&self, handle: SessionHandle, mode: FlashMode) -> BackendResult<()> {
        let mut state = self.lock();
        state.check(handle)?;
        state.backend.set_flash(handle, mode)
    }

    pub fn capture_still(&self, handle: SessionHandle) -> BackendResult<PathBuf> {
        let mut state = self.lock();
        state.check(handle)?;
        state.backend.capture_still(handle)
    }

    pub fn start_video(&self, handle: SessionHandle) -> BackendResult<()> {
        let mut state = self.lock();
        state.check(handle)?;
        state.backend.start_video(handle)
    }

    pub fn stop_video(&self, handle: SessionHandle) -> BackendResult<PathBuf> {
        let mut state = self.lock();
        state.check(handle)?;
        state.backend.stop_video(handle)
    }

    /// Latest preview frame, if a session is live; never waits on the backend
    pub fn preview_frame(&self) -> Option<Arc<PreviewFrame>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(FrameSlot::latest)
    }
}

impl std::fmt::Debug for CameraBackendManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CameraBackendManager")
            .field("backend_type", &state.backend.backend_type())
            .field("current", &state.current)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    /// Counts live sessions so the tests can see double acquisition
    #[derive(Default)]
    struct Counters {
        live: AtomicUsize,
        peak: AtomicUsize,
        capturing: AtomicBool,
    }

    struct CountingBackend {
        counters: Arc<Counters>,
        slot: FrameSlot,
        capture_delay: Duration,
    }

    impl CameraBackend for CountingBackend {
        fn enumerate_cameras(&mut self) -> BackendResult<Vec<CameraDevice>> {
            Ok(Vec::new())
        }

        fn open(&mut self, _: &CameraDevice, _: ResolutionPreset) -> BackendResult<SessionHandle> {
            let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.peak.fetch_max(live, Ordering::SeqCst);
            self.slot.store(PreviewFrame {
                width: 1,
                height: 1,
                data: Arc::from(vec![0u8, 0, 0, 255].into_boxed_slice()),
                captured_at: Instant::now(),
            });
            Ok(SessionHandle::next())
        }

        fn set_flash(&mut self, _: SessionHandle, _: FlashMode) -> BackendResult<()> {
            Ok(())
        }

        fn capture_still(&mut self, _: SessionHandle) -> BackendResult<PathBuf> {
            self.counters.capturing.store(true, Ordering::SeqCst);
            std::thread::sleep(self.capture_delay);
            Ok(PathBuf::from("still.jpg"))
        }

        fn start_video(&mut self, _: SessionHandle) -> BackendResult<()> {
            Ok(())
        }

        fn stop_video(&mut self, _: SessionHandle) -> BackendResult<PathBuf> {
            Ok(PathBuf::from("clip.mp4"))
        }

        fn close(&mut self, _: SessionHandle) -> BackendResult<()> {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
            self.slot.clear();
            Ok(())
        }

        fn frame_slot(&self) -> Option<FrameSlot> {
            Some(self.slot.clone())
        }

        fn backend_type(&self) -> CameraBackendType {
            CameraBackendType::TestPattern
        }
    }

    fn manager_with_delay(capture_delay: Duration) -> (CameraBackendManager, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let backend = CountingBackend {
            counters: Arc::clone(&counters),
            slot: FrameSlot::new(),
            capture_delay,
        };
        (CameraBackendManager::with_backend(Box::new(backend)), counters)
    }

    fn manager() -> (CameraBackendManager, Arc<Counters>) {
        manager_with_delay(Duration::ZERO)
    }

    fn device() -> CameraDevice {
        CameraDevice {
            id: "cam".into(),
            name: "cam".into(),
            facing: Facing::Back,
            path: None,
        }
    }

    #[test]
    fn test_reopen_closes_previous_session() {
        let (manager, counters) = manager();
        let first = manager.open(&device(), ResolutionPreset::High, 1).unwrap();
        let second = manager.open(&device(), ResolutionPreset::High, 2).unwrap();

        assert_ne!(first, second);
        assert_eq!(counters.live.load(Ordering::SeqCst), 1);
        assert_eq!(counters.peak.load(Ordering::SeqCst), 1);
        assert!(!manager.is_current(first));
        assert!(manager.is_current(second));
    }

    #[test]
    fn test_older_generation_does_not_replace_newer_session() {
        let (manager, counters) = manager();
        let newer = manager.open(&device(), ResolutionPreset::High, 4).unwrap();

        assert_eq!(
            manager.open(&device(), ResolutionPreset::High, 3),
            Err(BackendError::StaleSession)
        );
        assert!(manager.is_current(newer));
        assert_eq!(counters.live.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let (manager, _) = manager();
        let handle = manager.open(&device(), ResolutionPreset::High, 1).unwrap();
        manager.close(handle).unwrap();

        assert_eq!(
            manager.capture_still(handle),
            Err(BackendError::StaleSession)
        );
        assert!(manager.preview_frame().is_none());
        // Closing twice is harmless
        assert!(manager.close(handle).is_ok());
    }

    #[test]
    fn test_preview_readable_during_slow_capture() {
        let (manager, counters) = manager_with_delay(Duration::from_millis(600));
        let handle = manager.open(&device(), ResolutionPreset::High, 1).unwrap();

        let worker = manager.clone();
        let capture = std::thread::spawn(move || worker.capture_still(handle));
        while !counters.capturing.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        let started = Instant::now();
        assert!(manager.preview_frame().is_some());
        assert!(started.elapsed() < Duration::from_millis(200));

        assert!(capture.join().unwrap().is_ok());
    }

    #[test]
    fn test_empty_enumeration_is_an_error() {
        let (manager, _) = manager();
        assert!(matches!(
            manager.enumerate_cameras(),
            Err(BackendError::DeviceNotFound(_))
        ));
    }
}
