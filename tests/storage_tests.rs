// SPDX-License-Identifier: GPL-3.0-only

//! Media store behaviour against a real directory

use shutter::storage::{FsMediaStore, MediaKind, MediaStore, media_file_name, scan_gallery};

#[test]
fn test_listing_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsMediaStore::new(dir.path().join("not-yet"));

    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_write_creates_directory_and_moves_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsMediaStore::new(dir.path().join("media"));
    let temp = dir.path().join("capture.tmp");
    std::fs::write(&temp, b"jpeg").unwrap();

    let saved = store
        .write(&temp, &media_file_name(MediaKind::Photo, 1000))
        .unwrap();

    assert_eq!(saved, dir.path().join("media").join("1000.jpg"));
    assert_eq!(std::fs::read(&saved).unwrap(), b"jpeg");
    assert!(!temp.exists());
}

#[test]
fn test_write_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsMediaStore::new(dir.path());
    std::fs::write(dir.path().join("1000.jpg"), b"first").unwrap();
    let temp = dir.path().join("second.tmp");
    std::fs::write(&temp, b"second").unwrap();

    let err = store.write(&temp, "1000.jpg").unwrap_err();

    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    assert_eq!(std::fs::read(dir.path().join("1000.jpg")).unwrap(), b"first");
}

#[test]
fn test_scan_ignores_foreign_files_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["1000.jpg", "3000.mp4", "2000.jpg", "notes.txt", "4000.JPG"] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }
    std::fs::create_dir(dir.path().join("5000.jpg")).unwrap();
    let store = FsMediaStore::new(dir.path());

    let assets = scan_gallery(store.list().unwrap());
    let names: Vec<String> = assets.iter().map(|a| a.file_name()).collect();

    assert_eq!(names, vec!["3000.mp4", "2000.jpg", "1000.jpg"]);
    assert_eq!(assets[0].kind, MediaKind::Video);
    assert_eq!(assets[0].timestamp, Some(3000));
}
