//! Sink trait

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Durable write target for serialized batches
///
/// Writes to the same name overwrite; writes to different names are
/// independent and may run concurrently.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Store `payload` under `name`
    ///
    /// Fails with `Error::SinkUnavailable` when the write may succeed on
    /// retry, `Error::SinkRejected` when it never will.
    async fn put(&self, name: &str, payload: Bytes) -> Result<()>;

    /// Make sure the destination container is usable
    ///
    /// Called once before the first batch; a failure aborts startup.
    async fn ensure_container_exists(&self) -> Result<()>;

    /// Full location of `name`, for logging
    fn describe(&self, name: &str) -> String {
        name.to_string()
    }
}
