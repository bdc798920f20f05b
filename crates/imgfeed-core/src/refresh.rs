//! One manifest refresh cycle: fetch, enumerate, merge, write back.
//!
//! The cycle is a read-modify-write of a single object with no locking.
//! Two cycles running at once against the same manifest key race and the
//! last writer wins, so whatever schedules refreshes must run at most one at
//! a time.

use bytes::Bytes;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ManifestConfig;
use crate::enumerate::collect_images;
use crate::layout::encode_key;
use crate::manifest::{Manifest, Merger, PriorManifest, MANIFEST_CONTENT_TYPE};
use crate::store::{ObjectStore, StoreError};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("failed to fetch manifest {key}: {source}")]
    Fetch { key: String, source: StoreError },
    #[error("failed to list images: {0}")]
    List(StoreError),
    #[error("failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write manifest {key}: {source}")]
    Write { key: String, source: StoreError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub prior: PriorManifest,
    /// Image objects seen across all prefixes.
    pub listed: usize,
    pub manifest: Manifest,
    /// Entries in the new manifest that were not in the prior one.
    pub added: usize,
    /// Prior entries no longer in the new manifest.
    pub dropped: usize,
}

pub async fn run(store: &dyn ObjectStore, cfg: &ManifestConfig) -> Result<RefreshReport, RefreshError> {
    let prior = load_prior(store, &cfg.key).await?;

    let listing = collect_images(store, &cfg.prefixes, &cfg.extensions)
        .await
        .map_err(RefreshError::List)?;
    let listed = listing.len();

    let before = prior.manifest();
    let merger = Merger::new(cfg.policy, cfg.max_images);
    let manifest = merger.merge(&before, listing);

    let body = manifest.to_json()?;
    store
        .put(&cfg.key, Bytes::from(body), MANIFEST_CONTENT_TYPE)
        .await
        .map_err(|source| RefreshError::Write { key: cfg.key.clone(), source })?;

    let old: HashSet<String> = before.images.iter().map(|k| encode_key(k)).collect();
    let new: HashSet<String> = manifest.images.iter().cloned().collect();
    let added = new.difference(&old).count();
    let dropped = old.difference(&new).count();

    info!(
        key = %cfg.key,
        store = store.name(),
        policy = %cfg.policy,
        prior = %prior,
        listed,
        images = manifest.len(),
        added,
        dropped,
        "manifest updated"
    );
    Ok(RefreshReport { prior, listed, manifest, added, dropped })
}

/// Fetch and parse the current manifest. Only transport failures error.
pub async fn load_prior(store: &dyn ObjectStore, key: &str) -> Result<PriorManifest, RefreshError> {
    let bytes = store
        .get(key)
        .await
        .map_err(|source| RefreshError::Fetch { key: key.to_string(), source })?;
    let prior = PriorManifest::parse(bytes.as_deref());
    match &prior {
        PriorManifest::Missing => info!(key, "no existing manifest found, creating a new one"),
        PriorManifest::Corrupt(reason) => warn!(key, %reason, "existing manifest is unreadable, starting empty"),
        PriorManifest::Loaded(m) => info!(key, images = m.len(), "loaded existing manifest"),
    }
    Ok(prior)
}
