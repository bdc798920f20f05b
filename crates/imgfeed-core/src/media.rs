use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::layout::file_name;

/// Fallback content type for image files whose type cannot be determined.
pub const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

pub fn default_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp"].iter().map(|s| s.to_string()).collect()
}

/// Case-insensitive set of allowed file extensions (without the leading dot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    pub fn new<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            exts.into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the key's final segment ends in `.<ext>` for an allowed ext.
    pub fn matches_key(&self, key: &str) -> bool {
        extension(file_name(key)).is_some_and(|ext| self.0.contains(&ext))
    }

    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.matches_key(n))
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::new(default_extensions())
    }
}

impl From<Vec<String>> for ExtensionSet {
    fn from(v: Vec<String>) -> Self {
        Self::new(v)
    }
}

impl From<ExtensionSet> for Vec<String> {
    fn from(s: ExtensionSet) -> Self {
        s.0.into_iter().collect()
    }
}

fn extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Content type sent with an upload, derived from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(extension)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "svg" => "image/svg+xml",
        _ => DEFAULT_IMAGE_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_case_insensitive_on_last_suffix() {
        let set = ExtensionSet::default();
        assert!(set.matches_key("cam/photo.JPG"));
        assert!(set.matches_key("cam/archive.tar.jpeg"));
        assert!(!set.matches_key("cam/photo.TXT"));
        assert!(!set.matches_key("cam/photo"));
        assert!(!set.matches_key("cam.jpg/photo"));
        assert!(!set.matches_key("cam/"));
    }

    #[test]
    fn configured_extensions_are_normalized() {
        let set = ExtensionSet::new([".PNG", "Tiff", ""]);
        assert!(set.matches_key("a.png"));
        assert!(set.matches_key("b.TIFF"));
        assert!(!set.matches_key("c.jpg"));
        assert_eq!(Vec::<String>::from(set), vec!["png".to_string(), "tiff".to_string()]);
    }

    #[test]
    fn content_type_defaults_to_jpeg() {
        assert_eq!(content_type_for(Path::new("a/b.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("b.webp")), "image/webp");
        assert_eq!(content_type_for(Path::new("raw.cr2")), DEFAULT_IMAGE_TYPE);
        assert_eq!(content_type_for(Path::new("noext")), DEFAULT_IMAGE_TYPE);
    }
}
