use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

/// Minimal object-storage contract required by the runner.
///
/// Any key/value blob store works; the runner only ever writes whole
/// archives, reads them back, and deletes a batch of keys at the end of a
/// run.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    /// Delete every key in one backend call, best effort.
    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError>;
}
