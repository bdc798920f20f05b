use std::collections::HashSet;
use std::path::{Path, PathBuf};

use imgfeed_core::ExtensionSet;
use tracing::debug;
use walkdir::WalkDir;

/// Detects newly created image files under a root by comparing successive
/// recursive scans.
pub struct Scanner {
    root: PathBuf,
    extensions: ExtensionSet,
    known: HashSet<PathBuf>,
}

impl Scanner {
    /// Takes the baseline scan; files present now are never reported.
    pub fn new(root: impl Into<PathBuf>, extensions: ExtensionSet) -> Self {
        let root = root.into();
        let known = collect_files(&root, &extensions);
        debug!(root = %root.display(), files = known.len(), "baseline scan");
        Self { root, extensions, known }
    }

    /// Image files that appeared since the previous scan, sorted by path.
    /// A file removed and recreated between scans is reported again.
    pub fn scan(&mut self) -> Vec<PathBuf> {
        let current = collect_files(&self.root, &self.extensions);
        let mut created: Vec<PathBuf> = current.difference(&self.known).cloned().collect();
        created.sort();
        self.known = current;
        created
    }
}

fn collect_files(root: &Path, extensions: &ExtensionSet) -> HashSet<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && extensions.matches_path(e.path()))
        .map(|e| e.into_path())
        .collect()
}
