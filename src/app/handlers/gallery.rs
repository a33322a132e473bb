// SPDX-License-Identifier: GPL-3.0-only

//! Gallery handlers
//!
//! Gallery scans and the enlarged asset viewer. Each scan carries a sequence
//! number and only the newest result is applied. Video assets get a player
//! through the playback manager, which disposes the previous player before
//! creating the next one.

use crate::app::state::{AppModel, Message, PlayerState, Viewer};
use crate::app::task::Task;
use crate::backends::camera::types::BackendError;
use crate::backends::playback::PlayerHandle;
use crate::errors::{AppError, AppResult};
use crate::storage::{MediaAsset, MediaKind, scan_gallery};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn playback_error(err: BackendError) -> AppError {
    match err {
        BackendError::StaleSession => AppError::Cancelled,
        other => AppError::Playback(other.to_string()),
    }
}

impl AppModel {
    pub(crate) fn handle_toggle_gallery(&mut self) -> Task<Message> {
        if self.gallery.open {
            info!("Closing gallery");
            self.gallery.open = false;
            self.gallery.assets.clear();
            return self.close_viewer();
        }
        info!("Opening gallery");
        self.gallery.open = true;
        self.refresh_gallery()
    }

    /// Rescan the media store
    pub(crate) fn refresh_gallery(&mut self) -> Task<Message> {
        self.gallery.scan_seq += 1;
        let seq = self.gallery.scan_seq;
        let store = Arc::clone(&self.services.store);

        Task::blocking(
            move || {
                let paths = store
                    .list()
                    .map_err(|e| AppError::Storage(format!("Failed to list media: {}", e)))?;
                Ok(scan_gallery(paths))
            },
            move |result| Message::GalleryScanned(seq, result),
        )
    }

    pub(crate) fn handle_gallery_scanned(
        &mut self,
        seq: u64,
        result: AppResult<Vec<MediaAsset>>,
    ) -> Task<Message> {
        if seq != self.gallery.scan_seq {
            debug!(seq, latest = self.gallery.scan_seq, "Ignoring outdated gallery scan");
            return Task::none();
        }
        match result {
            Ok(assets) => {
                debug!(count = assets.len(), "Gallery scanned");
                self.gallery.assets = assets;
            }
            // Keep showing what we had
            Err(e) => self.report(e),
        }
        Task::none()
    }

    // =========================================================================
    // Viewer
    // =========================================================================

    pub(crate) fn handle_open_asset(&mut self, asset: MediaAsset) -> Task<Message> {
        info!(asset = %asset.file_name(), kind = %asset.kind, "Opening asset");

        match asset.kind {
            MediaKind::Photo => {
                let close = self.close_viewer();
                self.viewer = Some(Viewer::Photo(asset));
                close
            }
            MediaKind::Video => {
                self.viewer_seq += 1;
                let request = self.viewer_seq;
                let path = asset.path.clone();
                self.viewer = Some(Viewer::Video {
                    asset,
                    player: PlayerState::Opening,
                    request,
                });

                let playback = self.services.playback.clone();
                Task::blocking(
                    move || {
                        let handle = playback.open(&path, request).map_err(playback_error)?;
                        if let Err(e) = playback.play(handle) {
                            if let Err(close) = playback.close(handle) {
                                warn!(%handle, error = %close, "Player close failed");
                            }
                            return Err(playback_error(e));
                        }
                        Ok(handle)
                    },
                    move |result| Message::PlayerOpened(request, result),
                )
            }
        }
    }

    pub(crate) fn handle_player_opened(
        &mut self,
        request: u64,
        result: AppResult<PlayerHandle>,
    ) -> Task<Message> {
        let Some(Viewer::Video {
            player,
            request: current,
            ..
        }) = self.viewer.as_mut()
        else {
            return self.close_orphan_player(result);
        };
        if *current != request || *player != PlayerState::Opening {
            return self.close_orphan_player(result);
        }

        match result {
            Ok(handle) => {
                debug!(%handle, "Playing video");
                *player = PlayerState::Playing(handle);
                Task::none()
            }
            Err(e) => {
                *player = PlayerState::Failed;
                self.report(e);
                Task::none()
            }
        }
    }

    /// A player finished opening after its viewer went away
    fn close_orphan_player(&self, result: AppResult<PlayerHandle>) -> Task<Message> {
        match result {
            Ok(handle) => {
                debug!(%handle, "Closing player for a dismissed viewer");
                self.close_player_task(handle)
            }
            Err(_) => Task::none(),
        }
    }

    pub(crate) fn handle_close_asset(&mut self) -> Task<Message> {
        self.close_viewer()
    }

    /// Dismiss the viewer and release its player
    pub(crate) fn close_viewer(&mut self) -> Task<Message> {
        match self.viewer.take() {
            Some(Viewer::Video {
                player: PlayerState::Playing(handle),
                ..
            }) => self.close_player_task(handle),
            Some(viewer) => {
                debug!(asset = %viewer.asset().file_name(), "Viewer closed");
                Task::none()
            }
            None => Task::none(),
        }
    }

    fn close_player_task(&self, handle: PlayerHandle) -> Task<Message> {
        let playback = self.services.playback.clone();
        Task::blocking(
            move || {
                playback.close(handle).map_err(|e| {
                    warn!(%handle, error = %e, "Player close failed");
                    playback_error(e)
                })
            },
            Message::PlayerClosed,
        )
    }
}
