use std::fmt;
use std::time::SystemTime;

/// One object as reported by a store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: SystemTime,
    pub size: u64,
}

impl ObjectMeta {
    pub fn new(key: impl Into<String>, last_modified: SystemTime) -> Self {
        Self { key: key.into(), last_modified, size: 0 }
    }
}

impl fmt::Display for ObjectMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.key, self.size)
    }
}
