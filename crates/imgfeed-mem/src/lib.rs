use bytes::Bytes;
use imgfeed_core::{store::{ObjectStore, ObjectStream, StoreError}, types::ObjectMeta};
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc, time::SystemTime};

/// In-memory object store. Listings come back in key order.
#[cfg(feature = "mem")]
#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    map: BTreeMap<String, StoredObject>,
    fail: Failures,
}

#[derive(Default, Clone, Copy)]
struct Failures {
    list: bool,
    get: bool,
    put: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub last_modified: SystemTime,
}

#[cfg(feature = "mem")]
impl MemStore {
    pub fn new() -> Self { Self::default() }

    /// Insert an object with an explicit last-modified time.
    pub fn insert_at(&self, key: impl Into<String>, body: impl Into<Bytes>, last_modified: SystemTime) {
        let obj = StoredObject { body: body.into(), content_type: "application/octet-stream".into(), last_modified };
        self.store(key.into(), obj);
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.inner.read().map.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.read().map.keys().cloned().collect()
    }

    /// While offline every operation fails as if the store were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.inner.write().fail = Failures { list: offline, get: offline, put: offline };
    }

    /// Make listings fail while gets and puts keep working.
    pub fn fail_list(&self, fail: bool) {
        self.inner.write().fail.list = fail;
    }

    /// Make puts fail while gets and listings keep working.
    pub fn fail_put(&self, fail: bool) {
        self.inner.write().fail.put = fail;
    }

    fn store(&self, key: String, obj: StoredObject) {
        self.inner.write().map.insert(key, obj);
    }

    fn check(&self, failing: fn(&Failures) -> bool, op: fn(String) -> StoreError) -> Result<(), StoreError> {
        if failing(&self.inner.read().fail) { Err(op("store unavailable".into())) } else { Ok(()) }
    }
}

#[cfg(feature = "mem")]
#[async_trait::async_trait]
impl ObjectStore for MemStore {
    fn list<'a>(&'a self, prefix: &'a str) -> ObjectStream<'a> {
        if let Err(e) = self.check(|f| f.list, StoreError::List) {
            return Box::pin(futures::stream::once(async move { Err::<ObjectMeta, _>(e) }));
        }
        let objects: Vec<Result<ObjectMeta, StoreError>> = self.inner.read().map
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| Ok(ObjectMeta { key: k.clone(), last_modified: v.last_modified, size: v.body.len() as u64 }))
            .collect();
        Box::pin(futures::stream::iter(objects))
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.check(|f| f.get, StoreError::Get)?;
        Ok(self.inner.read().map.get(key).map(|o| o.body.clone()))
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.check(|f| f.put, StoreError::Put)?;
        let obj = StoredObject { body, content_type: content_type.to_string(), last_modified: SystemTime::now() };
        self.store(key.to_string(), obj);
        Ok(())
    }

    fn name(&self) -> &'static str { "mem" }
}
