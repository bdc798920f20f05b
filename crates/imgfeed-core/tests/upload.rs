use std::fs;

use imgfeed_core::{Dispatcher, StoreError, UploadError};
use imgfeed_mem::MemStore;

#[tokio::test]
async fn upload_preserves_relative_path_and_content_type() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("2025/06")).unwrap();
    let path = dir.path().join("2025/06/frame.webp");
    fs::write(&path, b"webp").unwrap();

    let store = MemStore::new();
    let up = Dispatcher::new(&store, dir.path(), "stills/").upload(&path).await.unwrap();

    assert_eq!(up.key, "stills/2025/06/frame.webp");
    assert_eq!(up.content_type, "image/webp");
    assert_eq!(up.bytes, 4);
    let obj = store.object("stills/2025/06/frame.webp").unwrap();
    assert_eq!(obj.content_type, "image/webp");
}

#[tokio::test]
async fn unknown_extension_falls_back_to_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.cr2");
    fs::write(&path, b"raw").unwrap();

    let store = MemStore::new();
    let up = Dispatcher::new(&store, dir.path(), "").upload(&path).await.unwrap();
    assert_eq!((up.key.as_str(), up.content_type), ("raw.cr2", "image/jpeg"));
}

#[tokio::test]
async fn failures_are_typed() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemStore::new();
    let dispatcher = Dispatcher::new(&store, dir.path(), "cam/");

    let outside = tempfile::tempdir().unwrap();
    let stray = outside.path().join("x.jpg");
    fs::write(&stray, b"x").unwrap();
    assert!(matches!(dispatcher.upload(&stray).await, Err(UploadError::OutsideRoot { .. })));

    let missing = dir.path().join("missing.jpg");
    assert!(matches!(dispatcher.upload(&missing).await, Err(UploadError::Read { .. })));

    let present = dir.path().join("ok.jpg");
    fs::write(&present, b"x").unwrap();
    store.set_offline(true);
    match dispatcher.upload(&present).await {
        Err(UploadError::Store { key, source: StoreError::Put(_) }) => assert_eq!(key, "cam/ok.jpg"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(store.keys().is_empty());
}
