// SPDX-License-Identifier: GPL-3.0-only

//! Media store: the directory holding captured photos and videos
//!
//! The file name is the only metadata. `{epoch_millis}.jpg` is a photo,
//! `{epoch_millis}.mp4` is a video, and the gallery orders assets by the
//! number in the name.

use crate::constants::file_formats;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Kind of a stored asset, inferred from the file name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// File name suffix including the dot
    pub fn suffix(self) -> &'static str {
        match self {
            MediaKind::Photo => file_formats::PHOTO_SUFFIX,
            MediaKind::Video => file_formats::VIDEO_SUFFIX,
        }
    }

    /// Classify a file name; suffix matching is case-sensitive
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(file_formats::PHOTO_SUFFIX) {
            Some(MediaKind::Photo)
        } else if name.ends_with(file_formats::VIDEO_SUFFIX) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Name of the file a capture taken at `millis` is stored under
pub fn media_file_name(kind: MediaKind, millis: i64) -> String {
    format!("{}{}", millis, kind.suffix())
}

/// Unique temporary path for a capture on its way into the store
pub fn temp_media_path(kind: MediaKind) -> PathBuf {
    std::env::temp_dir().join(format!(
        "{}{}{}",
        file_formats::TEMP_PREFIX,
        uuid::Uuid::new_v4(),
        kind.suffix()
    ))
}

/// One stored photo or video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Capture time parsed from the file name, if it is a plain number
    pub timestamp: Option<i64>,
}

impl MediaAsset {
    /// Build an asset from a path, `None` if the suffix is not a media suffix
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let kind = MediaKind::from_file_name(name)?;
        let timestamp = name
            .strip_suffix(kind.suffix())
            .and_then(|stem| stem.parse::<i64>().ok());
        Some(Self {
            path,
            kind,
            timestamp,
        })
    }

    /// File name without the directory
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Filter media files out of a listing and order them newest-first
///
/// Ordering uses the timestamp in the file name, never directory order. Files
/// whose name is not a number sort after all timestamped ones, by name.
pub fn scan_gallery(paths: Vec<PathBuf>) -> Vec<MediaAsset> {
    let mut assets: Vec<MediaAsset> = paths.into_iter().filter_map(MediaAsset::from_path).collect();
    assets.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.path.cmp(&b.path),
    });
    assets
}

/// Media store contract
///
/// Calls block on the filesystem and are made from blocking worker threads.
pub trait MediaStore: Send + Sync {
    /// Directory the store manages
    fn root(&self) -> &Path;

    /// Every entry in the store directory
    fn list(&self) -> io::Result<Vec<PathBuf>>;

    /// Move a finished temporary file into the store under `name`
    fn write(&self, temp: &Path, name: &str) -> io::Result<PathBuf>;

    /// Path an entry called `name` would have
    fn join(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }
}

/// Media store backed by a local directory
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory if it is missing
    pub fn ensure_exists(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        debug!(path = %self.root.display(), "Media directory ready");
        Ok(())
    }
}

impl MediaStore for FsMediaStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            // Nothing captured yet
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }

    fn write(&self, temp: &Path, name: &str) -> io::Result<PathBuf> {
        self.ensure_exists()?;
        let dest = self.join(name);

        if dest.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", dest.display()),
            ));
        }

        // Temp files usually live on another filesystem
        if let Err(e) = std::fs::rename(temp, &dest) {
            debug!(error = %e, "Rename failed, copying instead");
            std::fs::copy(temp, &dest)?;
            if let Err(e) = std::fs::remove_file(temp) {
                warn!(path = %temp.display(), error = %e, "Failed to remove temporary file");
            }
        }

        info!(path = %dest.display(), "Saved media");
        Ok(dest)
    }
}

/// Source of capture timestamps
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
