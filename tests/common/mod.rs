// SPDX-License-Identifier: GPL-3.0-only

//! Fake devices and a harness for driving the screen controller in tests

#![allow(dead_code)]

use shutter::app::{AppModel, Dispatcher, Message};
use shutter::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraBackendManager, CameraBackendType,
    CameraDevice, Facing, SessionHandle,
};
use shutter::backends::frames::{FrameSlot, PreviewFrame};
use shutter::backends::playback::{PlaybackBackend, PlaybackManager, PlayerHandle};
use shutter::constants::ResolutionPreset;
use shutter::flash::FlashMode;
use shutter::storage::{Clock, FsMediaStore};
use shutter::Config;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// What the fake camera was asked to do
#[derive(Default)]
pub struct CameraLog {
    pub live: AtomicUsize,
    pub peak: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub stills: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub discarded_recordings: AtomicUsize,
    pub flash: Mutex<Vec<FlashMode>>,
    pub opened_devices: Mutex<Vec<String>>,
    pub fail_open: AtomicBool,
    pub fail_flash: AtomicBool,
    /// How long a still capture holds the device
    pub capture_delay_ms: AtomicU64,
}

impl CameraLog {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn slow_captures(&self, millis: u64) {
        self.capture_delay_ms.store(millis, Ordering::SeqCst);
    }
}

/// A small solid frame standing in for device output
pub fn test_frame() -> PreviewFrame {
    PreviewFrame {
        width: 2,
        height: 2,
        data: Arc::from(vec![128u8; 16].into_boxed_slice()),
        captured_at: Instant::now(),
    }
}

fn pause(millis: &AtomicU64) {
    let millis = millis.load(Ordering::SeqCst);
    if millis > 0 {
        std::thread::sleep(Duration::from_millis(millis));
    }
}

pub struct FakeCamera {
    devices: Vec<CameraDevice>,
    log: Arc<CameraLog>,
    scratch: PathBuf,
    live: Option<SessionHandle>,
    recording: bool,
    files: usize,
    frames: FrameSlot,
}

impl FakeCamera {
    fn temp_file(&mut self, suffix: &str, contents: &[u8]) -> BackendResult<PathBuf> {
        self.files += 1;
        let path = self.scratch.join(format!("capture-{}{}", self.files, suffix));
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    fn check(&self, handle: SessionHandle) -> BackendResult<()> {
        if self.live == Some(handle) {
            Ok(())
        } else {
            Err(BackendError::StaleSession)
        }
    }
}

impl CameraBackend for FakeCamera {
    fn enumerate_cameras(&mut self) -> BackendResult<Vec<CameraDevice>> {
        Ok(self.devices.clone())
    }

    fn open(&mut self, device: &CameraDevice, _: ResolutionPreset) -> BackendResult<SessionHandle> {
        if self.log.fail_open.load(Ordering::SeqCst) {
            return Err(BackendError::InitializationFailed("device busy".into()));
        }
        let live = self.log.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.peak.fetch_max(live, Ordering::SeqCst);
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        self.log.opened_devices.lock().unwrap().push(device.id.clone());

        let handle = SessionHandle::next();
        self.live = Some(handle);
        self.frames.store(test_frame());
        Ok(handle)
    }

    fn set_flash(&mut self, handle: SessionHandle, mode: FlashMode) -> BackendResult<()> {
        self.check(handle)?;
        if mode.is_on() && self.log.fail_flash.load(Ordering::SeqCst) {
            return Err(BackendError::FlashUnavailable("no flash LED found".into()));
        }
        self.log.flash.lock().unwrap().push(mode);
        Ok(())
    }

    fn capture_still(&mut self, handle: SessionHandle) -> BackendResult<PathBuf> {
        self.check(handle)?;
        self.log.stills.fetch_add(1, Ordering::SeqCst);
        pause(&self.log.capture_delay_ms);
        self.temp_file(".jpg", b"\xFF\xD8\xFF\xD9")
    }

    fn start_video(&mut self, handle: SessionHandle) -> BackendResult<()> {
        self.check(handle)?;
        if self.recording {
            return Err(BackendError::RecordingInProgress);
        }
        self.recording = true;
        self.log.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_video(&mut self, handle: SessionHandle) -> BackendResult<PathBuf> {
        self.check(handle)?;
        if !self.recording {
            return Err(BackendError::NoRecordingInProgress);
        }
        self.recording = false;
        self.log.stops.fetch_add(1, Ordering::SeqCst);
        self.temp_file(".mp4", b"ftyp")
    }

    fn close(&mut self, handle: SessionHandle) -> BackendResult<()> {
        self.check(handle)?;
        if self.recording {
            self.recording = false;
            self.log.discarded_recordings.fetch_add(1, Ordering::SeqCst);
        }
        self.live = None;
        self.frames.clear();
        self.log.live.fetch_sub(1, Ordering::SeqCst);
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn frame_slot(&self) -> Option<FrameSlot> {
        Some(self.frames.clone())
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::TestPattern
    }
}

/// What the fake player was asked to do
#[derive(Default)]
pub struct PlaybackLog {
    pub live: AtomicUsize,
    pub peak: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub played: AtomicUsize,
    /// How long opening a file takes
    pub open_delay_ms: AtomicU64,
    pub fail_play: AtomicBool,
}

impl PlaybackLog {
    pub fn slow_opens(&self, millis: u64) {
        self.open_delay_ms.store(millis, Ordering::SeqCst);
    }
}

pub struct FakePlayback {
    log: Arc<PlaybackLog>,
    live: Option<PlayerHandle>,
    frames: FrameSlot,
}

impl PlaybackBackend for FakePlayback {
    fn open(&mut self, _: &Path) -> BackendResult<PlayerHandle> {
        pause(&self.log.open_delay_ms);
        let live = self.log.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.peak.fetch_max(live, Ordering::SeqCst);
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        let handle = PlayerHandle::next();
        self.live = Some(handle);
        self.frames.store(test_frame());
        Ok(handle)
    }

    fn play(&mut self, _: PlayerHandle) -> BackendResult<()> {
        if self.log.fail_play.load(Ordering::SeqCst) {
            return Err(BackendError::InitializationFailed("decoder stalled".into()));
        }
        self.log.played.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self, handle: PlayerHandle) -> BackendResult<()> {
        if self.live != Some(handle) {
            return Err(BackendError::StaleSession);
        }
        self.live = None;
        self.frames.clear();
        self.log.live.fetch_sub(1, Ordering::SeqCst);
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn frame_slot(&self) -> Option<FrameSlot> {
        Some(self.frames.clone())
    }
}

/// Clock the tests set by hand
#[derive(Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn device(id: &str, facing: Facing) -> CameraDevice {
    CameraDevice {
        id: id.to_string(),
        name: format!("{} camera", id),
        facing,
        path: None,
    }
}

pub fn back_and_front() -> Vec<CameraDevice> {
    vec![device("back", Facing::Back), device("front", Facing::Front)]
}

pub fn back_only() -> Vec<CameraDevice> {
    vec![device("back", Facing::Back)]
}

/// A controller wired to fakes, with a dispatcher to drive it
pub struct Harness {
    pub model: AppModel,
    pub dispatcher: Dispatcher,
    pub camera: Arc<CameraLog>,
    pub playback: Arc<PlaybackLog>,
    pub clock: Arc<ManualClock>,
    pub media: TempDir,
    _scratch: TempDir,
}

impl Harness {
    pub fn new(devices: Vec<CameraDevice>) -> Self {
        let media = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let camera_log = Arc::new(CameraLog::default());
        let playback_log = Arc::new(PlaybackLog::default());
        let clock = Arc::new(ManualClock::default());

        let camera = CameraBackendManager::with_backend(Box::new(FakeCamera {
            devices,
            log: Arc::clone(&camera_log),
            scratch: scratch.path().to_path_buf(),
            live: None,
            recording: false,
            files: 0,
            frames: FrameSlot::new(),
        }));
        let playback = PlaybackManager::with_backend(Box::new(FakePlayback {
            log: Arc::clone(&playback_log),
            live: None,
            frames: FrameSlot::new(),
        }));
        let store = Arc::new(FsMediaStore::new(media.path().join("media")));

        let model = AppModel::new(
            Config::default(),
            camera,
            playback,
            store,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );

        Self {
            model,
            dispatcher: Dispatcher::new(),
            camera: camera_log,
            playback: playback_log,
            clock,
            media,
            _scratch: scratch,
        }
    }

    /// Deliver a message and wait for all resulting work
    pub async fn send(&mut self, message: Message) {
        self.dispatcher.run(&mut self.model, message).await;
    }

    /// Deliver a message without waiting
    pub fn dispatch(&mut self, message: Message) {
        self.dispatcher.dispatch(&mut self.model, message);
    }

    pub async fn settle(&mut self) {
        self.dispatcher.settle(&mut self.model).await;
    }

    /// Enter the screen and wait for the camera
    pub async fn enter(&mut self) {
        self.send(Message::ScreenEntered).await;
    }

    pub async fn photo_at(&mut self, millis: i64) {
        self.clock.set(millis);
        self.send(Message::CapturePhoto).await;
    }

    /// Names of the files in the media directory, sorted
    pub fn stored_files(&self) -> Vec<String> {
        let dir = self.media.path().join("media");
        let mut names: Vec<String> = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Gallery contents as file names, in display order
    pub fn gallery_names(&self) -> Vec<String> {
        self.model
            .gallery
            .assets
            .iter()
            .map(|a| a.file_name())
            .collect()
    }
}
