use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::manifest::OrderPolicy;
use crate::media::ExtensionSet;
use crate::store::S3Config;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "IMGFEED_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "imgfeed.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("bad config TOML in {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Key prefixes to scan, one per image source.
    pub prefixes: Vec<String>,
    #[serde(default = "default_manifest_key")]
    pub key: String,
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    #[serde(default)]
    pub extensions: ExtensionSet,
    #[serde(default)]
    pub policy: OrderPolicy,
}

fn default_manifest_key() -> String { "image-list.json".to_string() }
fn default_max_images() -> usize { 36 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub dest_prefix: String,
    #[serde(default = "default_stability_timeout_ms")]
    pub stability_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    /// Extensions eligible for upload; defaults to the common image types.
    #[serde(default)]
    pub extensions: ExtensionSet,
}

fn default_stability_timeout_ms() -> u64 { 10_000 }
fn default_poll_interval_ms() -> u64 { 1_000 }
fn default_scan_interval_ms() -> u64 { 2_000 }

impl WatchConfig {
    pub fn stability_timeout(&self) -> Duration { Duration::from_millis(self.stability_timeout_ms) }
    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }
    pub fn scan_interval(&self) -> Duration { Duration::from_millis(self.scan_interval_ms) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub s3: S3Config,
    #[serde(default)]
    pub manifest: Option<ManifestConfig>,
    #[serde(default)]
    pub watch: Option<WatchConfig>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let cfg: AppConfig = toml::from_str(&s)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Path from `IMGFEED_CONFIG`, falling back to `imgfeed.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.s3.bucket.is_empty() {
            return Err(ConfigError::Invalid("s3.bucket must not be empty".into()));
        }
        if let Some(m) = &self.manifest {
            if m.prefixes.is_empty() {
                return Err(ConfigError::Invalid("manifest.prefixes must name at least one prefix".into()));
            }
            if m.key.is_empty() {
                return Err(ConfigError::Invalid("manifest.key must not be empty".into()));
            }
            if m.extensions.is_empty() {
                return Err(ConfigError::Invalid("manifest.extensions must not be empty".into()));
            }
        }
        if let Some(w) = &self.watch {
            if w.poll_interval_ms == 0 || w.scan_interval_ms == 0 {
                return Err(ConfigError::Invalid("watch intervals must be greater than zero".into()));
            }
            if w.extensions.is_empty() {
                return Err(ConfigError::Invalid("watch.extensions must not be empty".into()));
            }
        }
        Ok(())
    }

    pub fn manifest(&self) -> Result<&ManifestConfig, ConfigError> {
        self.manifest.as_ref().ok_or_else(|| ConfigError::Invalid("[manifest] missing in config".into()))
    }

    pub fn watch(&self) -> Result<&WatchConfig, ConfigError> {
        self.watch.as_ref().ok_or_else(|| ConfigError::Invalid("[watch] missing in config".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
        [s3]
        bucket = "images"
        region = "eu-west-1"

        [manifest]
        prefixes = ["cam-a/", "cam-b/"]
        key = "metadata/image-list.json"
        max_images = 1000
        policy = "timestamp"

        [watch]
        root = "/data/incoming"
        dest_prefix = "cam-a/"
    "#;

    #[test]
    fn parses_full_config_with_defaults() {
        let cfg: AppConfig = toml::from_str(FULL).unwrap();
        cfg.validate().unwrap();
        let m = cfg.manifest().unwrap();
        assert_eq!(m.prefixes, vec!["cam-a/", "cam-b/"]);
        assert_eq!(m.max_images, 1000);
        assert_eq!(m.policy, OrderPolicy::Timestamp);
        assert!(m.extensions.matches_key("x.JPEG"));
        let w = cfg.watch().unwrap();
        assert_eq!(w.stability_timeout(), Duration::from_secs(10));
        assert_eq!(w.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.s3.retry_max_attempts, 3);
    }

    #[test]
    fn example_config_is_valid() {
        let cfg: AppConfig = toml::from_str(include_str!("../../../imgfeed.example.toml")).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.manifest().unwrap().policy, OrderPolicy::PrependNew);
    }

    #[test]
    fn sections_are_optional_until_used() {
        let cfg: AppConfig = toml::from_str("[s3]\nbucket = \"b\"\n").unwrap();
        cfg.validate().unwrap();
        assert!(cfg.manifest().is_err());
        assert!(cfg.watch().is_err());
    }

    #[test]
    fn rejects_empty_prefixes_and_zero_intervals() {
        let cfg: AppConfig = toml::from_str("[s3]\nbucket = \"b\"\n[manifest]\nprefixes = []\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let cfg: AppConfig =
            toml::from_str("[s3]\nbucket = \"b\"\n[watch]\nroot = \"/x\"\npoll_interval_ms = 0\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[s3").unwrap();
        let err = AppConfig::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");

        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(FULL.as_bytes()).unwrap();
        let cfg = AppConfig::load(f.path()).unwrap();
        assert_eq!(cfg.s3.bucket, "images");
    }
}
