//! In-memory sink

use super::types::Sink;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Sink that keeps every written object in a map
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Content stored under `name`
    pub async fn get(&self, name: &str) -> Option<Bytes> {
        self.objects.read().await.get(name).cloned()
    }

    /// Stored names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.objects.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether nothing has been stored
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn put(&self, name: &str, payload: Bytes) -> Result<()> {
        self.objects.write().await.insert(name.to_string(), payload);
        Ok(())
    }

    async fn ensure_container_exists(&self) -> Result<()> {
        Ok(())
    }

    fn describe(&self, name: &str) -> String {
        format!("memory://{name}")
    }
}
