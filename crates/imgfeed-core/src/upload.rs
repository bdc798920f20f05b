use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::layout::destination_key;
use crate::media::content_type_for;
use crate::store::{ObjectStore, StoreError};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{path} is not under watch root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to upload {key}: {source}")]
    Store { key: String, source: StoreError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub key: String,
    pub content_type: &'static str,
    pub bytes: usize,
}

/// Uploads local files under `root` to `prefix` + their relative path.
pub struct Dispatcher<'a> {
    store: &'a dyn ObjectStore,
    root: PathBuf,
    prefix: String,
}

impl<'a> Dispatcher<'a> {
    pub fn new(store: &'a dyn ObjectStore, root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self { store, root: root.into(), prefix: prefix.into() }
    }

    pub fn key_for(&self, path: &Path) -> Result<String, UploadError> {
        destination_key(&self.prefix, &self.root, path).ok_or_else(|| UploadError::OutsideRoot {
            path: path.to_path_buf(),
            root: self.root.clone(),
        })
    }

    /// Upload one file in a single put. No retry beyond the store's own.
    pub async fn upload(&self, path: &Path) -> Result<Uploaded, UploadError> {
        let key = self.key_for(path)?;
        let content_type = content_type_for(path);
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| UploadError::Read { path: path.to_path_buf(), source })?;
        let bytes = data.len();
        info!(path = %path.display(), %key, "uploading");
        self.store
            .put(&key, Bytes::from(data), content_type)
            .await
            .map_err(|source| UploadError::Store { key: key.clone(), source })?;
        info!(%key, content_type, bytes, "uploaded");
        Ok(Uploaded { key, content_type, bytes })
    }
}
