pub mod config;
pub mod enumerate;
pub mod layout;
pub mod manifest;
pub mod media;
pub mod refresh;
pub mod store;
pub mod types;
pub mod upload;

pub use config::{AppConfig, ConfigError, ManifestConfig, WatchConfig};
pub use layout::{destination_key, encode_key, file_name};
pub use manifest::{Manifest, Merger, OrderPolicy, PriorManifest};
pub use media::{content_type_for, ExtensionSet};
pub use refresh::{RefreshError, RefreshReport};
pub use store::{ObjectStore, ObjectStream, S3Config, StoreError};
#[cfg(feature = "sdk")]
pub use store::SdkStore;
pub use types::ObjectMeta;
pub use upload::{Dispatcher, UploadError, Uploaded};
