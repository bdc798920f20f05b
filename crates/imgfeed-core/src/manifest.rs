use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::SystemTime;

use crate::layout::{encode_key, file_name};
use crate::types::ObjectMeta;

/// Content type of the persisted manifest object.
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// The published image list. Index 0 is the most recent image.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default)]
    pub images: Vec<String>,
}

impl Manifest {
    pub fn new(images: Vec<String>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// What was found under the manifest key at the start of a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorManifest {
    Missing,
    Corrupt(String),
    Loaded(Manifest),
}

impl PriorManifest {
    pub fn parse(bytes: Option<&[u8]>) -> Self {
        let Some(bytes) = bytes else { return PriorManifest::Missing };
        match serde_json::from_slice::<Manifest>(bytes) {
            Ok(m) => PriorManifest::Loaded(m),
            Err(e) => PriorManifest::Corrupt(e.to_string()),
        }
    }

    /// The manifest to merge against; missing and corrupt both start empty.
    pub fn manifest(&self) -> Manifest {
        match self {
            PriorManifest::Loaded(m) => m.clone(),
            PriorManifest::Missing | PriorManifest::Corrupt(_) => Manifest::default(),
        }
    }
}

impl fmt::Display for PriorManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorManifest::Missing => write!(f, "missing"),
            PriorManifest::Corrupt(_) => write!(f, "corrupt"),
            PriorManifest::Loaded(m) => write!(f, "loaded ({} images)", m.len()),
        }
    }
}

/// How the merged manifest is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderPolicy {
    /// Prior and listed keys together, by trailing file name, descending.
    NameSort,
    /// Listed keys only, by store last-modified time, descending.
    Timestamp,
    /// Prior order kept; keys newer than the newest published entry go in
    /// front, other unseen keys go behind.
    #[default]
    PrependNew,
}

impl fmt::Display for OrderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderPolicy::NameSort => "name-sort",
            OrderPolicy::Timestamp => "timestamp",
            OrderPolicy::PrependNew => "prepend-new",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Merger {
    pub policy: OrderPolicy,
    pub max_images: usize,
}

impl Merger {
    pub fn new(policy: OrderPolicy, max_images: usize) -> Self {
        Self { policy, max_images }
    }

    /// Build the next manifest from the prior one and a complete listing.
    ///
    /// Keys from both inputs are normalized with [`encode_key`] before any
    /// comparison. The result holds no duplicate keys and at most
    /// `max_images` entries, keeping the front of the active ordering.
    pub fn merge(&self, prior: &Manifest, listing: Vec<ObjectMeta>) -> Manifest {
        let prior = dedup(prior.images.iter().map(|k| encode_key(k)));
        let listed: Vec<(String, SystemTime)> = listing
            .into_iter()
            .map(|o| (encode_key(&o.key), o.last_modified))
            .collect();

        let mut images = match self.policy {
            OrderPolicy::NameSort => {
                let all = dedup(prior.into_iter().chain(listed.into_iter().map(|(k, _)| k)));
                sorted_by_name(all)
            }
            OrderPolicy::Timestamp => {
                let mut newest: HashMap<String, SystemTime> = HashMap::new();
                for (k, t) in listed {
                    let slot = newest.entry(k).or_insert(t);
                    if t > *slot {
                        *slot = t;
                    }
                }
                let mut all: Vec<(String, SystemTime)> = newest.into_iter().collect();
                all.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
                all.into_iter().map(|(k, _)| k).collect()
            }
            OrderPolicy::PrependNew => {
                let seen: HashSet<&str> = prior.iter().map(String::as_str).collect();
                let unseen = dedup(
                    listed.into_iter().map(|(k, _)| k).filter(|k| !seen.contains(k.as_str())),
                );
                let watermark = prior.iter().map(|k| name_rank(k)).max();
                let (newer, older): (Vec<String>, Vec<String>) = unseen
                    .into_iter()
                    .partition(|k| watermark.map_or(true, |w| name_rank(k) > w));
                let mut out = sorted_by_name(newer);
                out.extend(prior.iter().cloned());
                out.extend(sorted_by_name(older));
                out
            }
        };
        images.truncate(self.max_images);
        Manifest { images }
    }
}

fn name_rank(key: &str) -> (&str, &str) {
    (file_name(key), key)
}

fn sorted_by_name(mut keys: Vec<String>) -> Vec<String> {
    keys.sort_by(|a, b| name_rank(b).cmp(&name_rank(a)));
    keys
}

fn dedup(keys: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}
