// Object key layout helpers.
// Layout:
// s3://bucket/
// ├─ {prefix}/{relative path...}   uploaded images, one prefix per source
// └─ {manifest key}                e.g. metadata/image-list.json
//
// Keys stored in the manifest are percent-encoded per path segment so the
// viewer can splice them into URLs without further escaping.

use std::path::{Component, Path};

/// Percent-encode a store key for embedding in the manifest.
///
/// Each `/`-separated segment is decoded first and then re-encoded, so the
/// function is idempotent: `encode_key(encode_key(k)) == encode_key(k)`.
/// A segment that does not decode to valid UTF-8 is encoded as-is.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| match urlencoding::decode(segment) {
            Ok(decoded) => urlencoding::encode(&decoded).into_owned(),
            Err(_) => urlencoding::encode(segment).into_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Trailing file name of a key (everything after the last `/`).
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Destination key for a local file: `prefix` followed by the file's path
/// relative to `root`, joined with `/` regardless of the host separator.
/// Returns `None` when `path` is not under `root`.
pub fn destination_key(prefix: &str, root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for c in rel.components() {
        match c {
            Component::Normal(s) => parts.push(s.to_string_lossy().replace('\\', "/")),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!("{}{}", prefix, parts.join("/")))
}
