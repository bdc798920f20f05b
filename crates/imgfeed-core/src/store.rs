use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

use crate::types::ObjectMeta;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("client error: {0}")]
    Client(String),
    #[error("list error: {0}")]
    List(String),
    #[error("get error: {0}")]
    Get(String),
    #[error("put error: {0}")]
    Put(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    pub bucket: String,
    /// Named profile from the shared AWS config files.
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_initial_backoff_ms")]
    pub retry_initial_backoff_ms: u64,
}

fn default_region() -> String { "us-east-1".to_string() }
fn default_retry_max_attempts() -> u32 { 3 }
fn default_retry_initial_backoff_ms() -> u64 { 100 }

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            bucket: String::new(),
            profile: None,
            access_key_id: None,
            secret_access_key: None,
            retry_max_attempts: default_retry_max_attempts(),
            retry_initial_backoff_ms: default_retry_initial_backoff_ms(),
        }
    }
}

pub type ObjectStream<'a> = Pin<Box<dyn Stream<Item = Result<ObjectMeta, StoreError>> + Send + 'a>>;

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Every object under `prefix`, across all listing pages.
    fn list<'a>(&'a self, prefix: &'a str) -> ObjectStream<'a>;
    /// Full object body, or `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError>;
    fn name(&self) -> &'static str;
}

// SDK-based implementation
#[cfg(feature = "sdk")]
pub mod sdk_impl {
    use super::*;
    use aws_config::BehaviorVersion;
    use aws_sdk_s3::config::{Credentials, Region};
    use aws_sdk_s3::config::http::HttpResponse;
    use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::Client;
    use backoff::future::retry;
    use backoff::ExponentialBackoff;
    use futures::{StreamExt, TryStreamExt};
    use std::sync::Arc;
    use std::time::{Duration, Instant, SystemTime};
    use tracing::{debug, warn};

    pub struct SdkInner {
        client: Client,
        cfg: S3Config,
    }

    #[derive(Clone)]
    pub struct SdkStore(pub Arc<SdkInner>);

    enum Page {
        First,
        Next(String),
        Done,
    }

    impl SdkStore {
        pub async fn new(cfg: S3Config) -> Result<Self, StoreError> {
            if cfg.bucket.is_empty() {
                return Err(StoreError::Client("bucket must not be empty".into()));
            }
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(cfg.region.clone()));
            if let Some(profile) = &cfg.profile {
                loader = loader.profile_name(profile);
            }
            if let (Some(ak), Some(sk)) = (&cfg.access_key_id, &cfg.secret_access_key) {
                loader = loader.credentials_provider(Credentials::new(ak, sk, None, None, "imgfeed"));
            }
            let shared = loader.load().await;

            let mut b = aws_sdk_s3::config::Builder::from(&shared);
            if let Some(endpoint) = &cfg.endpoint {
                b = b.endpoint_url(endpoint).force_path_style(true);
            }
            let client = Client::from_conf(b.build());

            Ok(SdkStore(Arc::new(SdkInner { client, cfg })))
        }

        fn backoff(&self) -> ExponentialBackoff {
            let initial = Duration::from_millis(self.0.cfg.retry_initial_backoff_ms);
            // Bound total retry time so roughly `retry_max_attempts` attempts fit.
            let cap = Duration::from_secs(30);
            let budget = initial
                .checked_mul(2u32.saturating_pow(self.0.cfg.retry_max_attempts.min(16)))
                .unwrap_or(cap);
            ExponentialBackoff {
                initial_interval: initial,
                max_elapsed_time: Some(budget.min(cap)),
                ..Default::default()
            }
        }
    }

    /// Throttling and server-side failures; S3 signals SlowDown as 503.
    pub(crate) fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    pub(crate) fn is_transient<E>(e: &SdkError<E, HttpResponse>) -> bool {
        match e {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => true,
            _ => e.raw_response().is_some_and(|r| is_retryable_status(r.status().as_u16())),
        }
    }

    fn classify(err: StoreError, transient: bool) -> backoff::Error<StoreError> {
        if transient {
            backoff::Error::transient(err)
        } else {
            backoff::Error::permanent(err)
        }
    }

    #[async_trait::async_trait]
    impl ObjectStore for SdkStore {
        fn list<'a>(&'a self, prefix: &'a str) -> ObjectStream<'a> {
            let pages = futures::stream::try_unfold(Page::First, move |page| async move {
                let token = match page {
                    Page::Done => return Ok(None),
                    Page::First => None,
                    Page::Next(t) => Some(t),
                };
                let start = Instant::now();
                let resp = self.0.client.list_objects_v2()
                    .bucket(&self.0.cfg.bucket)
                    .prefix(prefix)
                    .set_continuation_token(token)
                    .send().await
                    .map_err(|e| {
                        let s = DisplayErrorContext(&e).to_string();
                        warn!(prefix, error = %s, "S3 LIST failed");
                        StoreError::List(s)
                    })?;
                let objects: Vec<ObjectMeta> = resp.contents().iter()
                    .filter_map(|o| {
                        let key = o.key()?.to_string();
                        let last_modified = o.last_modified()
                            .and_then(|t| SystemTime::try_from(*t).ok())
                            .unwrap_or(SystemTime::UNIX_EPOCH);
                        Some(ObjectMeta { key, last_modified, size: o.size().unwrap_or(0).max(0) as u64 })
                    })
                    .collect();
                debug!(prefix, count = objects.len(), latency_ms = start.elapsed().as_millis(), "S3 LIST page");
                let next = match (resp.is_truncated(), resp.next_continuation_token()) {
                    (Some(true), Some(t)) => Page::Next(t.to_string()),
                    _ => Page::Done,
                };
                Ok::<_, StoreError>(Some((objects, next)))
            });
            pages
                .map_ok(|objects| futures::stream::iter(objects.into_iter().map(Ok::<_, StoreError>)))
                .try_flatten()
                .boxed()
        }

        async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
            let op = || async {
                let start = Instant::now();
                let res = self.0.client.get_object()
                    .bucket(&self.0.cfg.bucket)
                    .key(key)
                    .send().await;
                match res {
                    Ok(o) => {
                        let body = o.body.collect().await
                            .map_err(|e| backoff::Error::transient(StoreError::Get(e.to_string())))?;
                        debug!(key, latency_ms = start.elapsed().as_millis(), "S3 GET ok");
                        Ok(Some(body.into_bytes()))
                    }
                    Err(e) => {
                        if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                            debug!(key, "S3 GET: no such key");
                            return Ok(None);
                        }
                        let s = DisplayErrorContext(&e).to_string();
                        warn!(key, error = %s, "S3 GET failed");
                        Err(classify(StoreError::Get(s), is_transient(&e)))
                    }
                }
            };
            retry(self.backoff(), op).await
        }

        async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError> {
            let op = || async {
                let start = Instant::now();
                let res = self.0.client.put_object()
                    .bucket(&self.0.cfg.bucket)
                    .key(key)
                    .content_type(content_type)
                    .body(ByteStream::from(body.clone()))
                    .send().await;
                match res {
                    Ok(_) => {
                        debug!(key, bytes = body.len(), latency_ms = start.elapsed().as_millis(), "S3 PUT ok");
                        Ok(())
                    }
                    Err(e) => {
                        let s = DisplayErrorContext(&e).to_string();
                        warn!(key, error = %s, "S3 PUT failed");
                        Err(classify(StoreError::Put(s), is_transient(&e)))
                    }
                }
            };
            retry(self.backoff(), op).await
        }

        fn name(&self) -> &'static str { "sdk" }
    }
}

// Re-export SdkStore at top-level for convenience
#[cfg(feature = "sdk")]
pub use sdk_impl::SdkStore;
