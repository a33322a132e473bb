// SPDX-License-Identifier: GPL-3.0-only

//! Video playback for the gallery viewer
//!
//! At most one player is alive at a time. [`PlaybackManager`] disposes the
//! previous player before a new one is opened, the same way the camera manager
//! treats sessions.

pub mod gst_playback;

use crate::backends::camera::types::{BackendError, BackendResult};
use crate::backends::frames::{FrameSlot, PreviewFrame};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Identifies one opened player; never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerHandle(pub u64);

impl PlayerHandle {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        PlayerHandle(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Video playback contract
///
/// `open` prerolls the file (decoder negotiated, first frame available) and
/// may block; it is called from blocking worker threads.
pub trait PlaybackBackend: Send {
    /// Open and preroll a video file
    fn open(&mut self, path: &Path) -> BackendResult<PlayerHandle>;

    /// Start playback of an opened player
    fn play(&mut self, handle: PlayerHandle) -> BackendResult<()>;

    /// Stop and release the player
    fn close(&mut self, handle: PlayerHandle) -> BackendResult<()>;

    /// Mailbox the live player decodes into
    fn frame_slot(&self) -> Option<FrameSlot>;
}

struct PlaybackState {
    backend: Box<dyn PlaybackBackend>,
    current: Option<PlayerHandle>,
    /// Newest request number seen by `open`
    latest_request: u64,
}

/// Owner of the single gallery player
///
/// Frames are read through a slot kept outside the backend lock, so the
/// screen never waits on a decoder that is opening or shutting down.
#[derive(Clone)]
pub struct PlaybackManager {
    state: Arc<Mutex<PlaybackState>>,
    frames: Arc<Mutex<Option<FrameSlot>>>,
}

impl PlaybackManager {
    /// Manager backed by GStreamer
    pub fn new() -> Self {
        Self::with_backend(Box::new(gst_playback::GStreamerPlayback::new()))
    }

    pub fn with_backend(backend: Box<dyn PlaybackBackend>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlaybackState {
                backend,
                current: None,
                latest_request: 0,
            })),
            frames: Arc::new(Mutex::new(None)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_frames(&self, slot: Option<FrameSlot>) {
        *self.frames.lock().unwrap_or_else(PoisonError::into_inner) = slot;
    }

    /// Open `path` for viewer request `request`, disposing the previous player first
    ///
    /// A request older than one already opened fails with
    /// [`BackendError::StaleSession`] and leaves the newer player alone.
    pub fn open(&self, path: &Path, request: u64) -> BackendResult<PlayerHandle> {
        let mut state = self.lock();
        if request < state.latest_request {
            debug!(request, latest = state.latest_request, "Refusing superseded player request");
            return Err(BackendError::StaleSession);
        }
        state.latest_request = request;

        if let Some(previous) = state.current.take() {
            info!(%previous, "Disposing previous player");
            self.set_frames(None);
            if let Err(e) = state.backend.close(previous) {
                warn!(%previous, error = %e, "Failed to close previous player");
            }
        }

        let handle = state.backend.open(path)?;
        debug!(%handle, request, path = %path.display(), "Player opened");
        state.current = Some(handle);
        self.set_frames(state.backend.frame_slot());
        Ok(handle)
    }

    pub fn play(&self, handle: PlayerHandle) -> BackendResult<()> {
        let mut state = self.lock();
        if state.current != Some(handle) {
            return Err(BackendError::StaleSession);
        }
        state.backend.play(handle)
    }

    /// Close a player; closing one that is already gone is a no-op
    pub fn close(&self, handle: PlayerHandle) -> BackendResult<()> {
        let mut state = self.lock();
        if state.current != Some(handle) {
            return Ok(());
        }
        state.current = None;
        self.set_frames(None);
        state.backend.close(handle)
    }

    pub fn close_current(&self) -> BackendResult<()> {
        let current = self.lock().current;
        match current {
            Some(handle) => self.close(handle),
            None => Ok(()),
        }
    }

    /// Latest frame of the live player; never waits on the backend
    pub fn current_frame(&self) -> Option<Arc<PreviewFrame>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(FrameSlot::latest)
    }
}

impl Default for PlaybackManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PlaybackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackManager")
            .field("current", &self.lock().current)
            .finish()
    }
}
