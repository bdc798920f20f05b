use futures::{future, stream, Stream, StreamExt, TryStreamExt};
use tracing::trace;

use crate::media::ExtensionSet;
use crate::store::{ObjectStore, StoreError};
use crate::types::ObjectMeta;

/// Lazily list every image object under each prefix, in prefix order.
///
/// The same key may appear more than once when prefixes overlap; the merger
/// drops duplicates.
pub fn image_objects<'a>(
    store: &'a dyn ObjectStore,
    prefixes: &'a [String],
    extensions: &'a ExtensionSet,
) -> impl Stream<Item = Result<ObjectMeta, StoreError>> + Send + 'a {
    stream::iter(prefixes)
        .flat_map(move |prefix| store.list(prefix))
        .try_filter(move |o| future::ready(is_image(o, extensions)))
}

/// Drain [`image_objects`] into a vector, failing on the first store error.
pub async fn collect_images(
    store: &dyn ObjectStore,
    prefixes: &[String],
    extensions: &ExtensionSet,
) -> Result<Vec<ObjectMeta>, StoreError> {
    image_objects(store, prefixes, extensions).try_collect().await
}

fn is_image(o: &ObjectMeta, extensions: &ExtensionSet) -> bool {
    if o.key.ends_with('/') || !extensions.matches_key(&o.key) {
        trace!(object = %o, "skipping non-image object");
        return false;
    }
    true
}

