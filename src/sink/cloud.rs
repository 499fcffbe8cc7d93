//! Cloud storage output support (S3, R2, GCS, Azure)

use super::types::Sink;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Object storage sink parsed from a destination URL
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Bucket, container or local directory
    container: String,
    /// Base path prefix within the bucket/container
    prefix: String,
    /// URL scheme for logging
    scheme: String,
    /// MIME type attached to uploads, where the store keeps one
    content_type: Option<&'static str>,
}

impl ObjectStoreSink {
    /// Parse a destination URL and create appropriate object store
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `az://container/path/` - Azure Blob Storage
    /// - `memory://` - process-local in-memory store
    /// - `/local/path/` or `./path/` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if url.starts_with("s3://") {
            Self::parse_s3(url, false)
        } else if url.starts_with("r2://") {
            Self::parse_s3(url, true)
        } else if url.starts_with("gs://") {
            Self::parse_gcs(url)
        } else if url.starts_with("az://") {
            Self::parse_azure(url)
        } else if url.starts_with("memory://") {
            Ok(Self::in_memory())
        } else {
            // Local filesystem
            Self::parse_local(url)
        }
    }

    /// Wrap an existing object store
    pub fn from_store(store: Arc<dyn ObjectStore>, scheme: impl Into<String>) -> Self {
        Self {
            store,
            container: String::new(),
            prefix: String::new(),
            scheme: scheme.into(),
            content_type: None,
        }
    }

    /// Process-local in-memory store
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemory::new()), "memory")
    }

    /// Parse S3 or R2 URL
    fn parse_s3(url: &str, is_r2: bool) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        let (bucket, prefix) = split_container(url, scheme)?;

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        // R2 endpoint: https://<account_id>.r2.cloudflarestorage.com
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            container: bucket.to_string(),
            prefix,
            scheme: scheme.to_string(),
            content_type: None,
        })
    }

    /// Parse GCS URL
    fn parse_gcs(url: &str) -> Result<Self> {
        let (bucket, prefix) = split_container(url, "gs")?;

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            container: bucket.to_string(),
            prefix,
            scheme: "gs".to_string(),
            content_type: None,
        })
    }

    /// Parse Azure Blob URL
    fn parse_azure(url: &str) -> Result<Self> {
        let (container, prefix) = split_container(url, "az")?;

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            container: container.to_string(),
            prefix,
            scheme: "az".to_string(),
            content_type: None,
        })
    }

    /// Parse local filesystem path
    fn parse_local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);
        if path.is_empty() {
            return Err(Error::config("Empty destination path"));
        }

        // The local store canonicalizes its root, so the directory must exist
        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            container: path.trim_end_matches('/').to_string(),
            prefix: String::new(),
            scheme: "file".to_string(),
            content_type: None,
        })
    }

    /// Check if this is a cloud destination (not local or memory)
    pub fn is_cloud(&self) -> bool {
        !matches!(self.scheme.as_str(), "file" | "memory")
    }

    /// Get the scheme (s3, r2, gs, az, file, memory)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Get the bucket, container or local directory
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Tag uploads with `content_type`
    ///
    /// Local directories have no object metadata and ignore it.
    #[must_use]
    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Fatal error for a bucket or container that does not exist
    fn missing_container(&self) -> Error {
        Error::config(format!(
            "Container {}://{} does not exist; buckets are not created \
             automatically, create it with the provider's tooling first",
            self.scheme, self.container
        ))
    }

    /// Put options carrying the content type
    fn put_options(&self) -> PutOptions {
        let mut attributes = Attributes::new();
        if let Some(content_type) = self.content_type.filter(|_| self.scheme != "file") {
            attributes.insert(Attribute::ContentType, content_type.into());
        }
        attributes.into()
    }

    /// Object path for an artifact name
    pub fn object_path(&self, name: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(name)
        } else {
            ObjectPath::from(format!("{}/{name}", self.prefix.trim_end_matches('/')))
        }
    }
}

#[async_trait]
impl Sink for ObjectStoreSink {
    async fn put(&self, name: &str, payload: Bytes) -> Result<()> {
        let path = self.object_path(name);
        debug!("Writing {} bytes to {}", payload.len(), self.describe(name));

        self.store
            .put_opts(&path, payload.into(), self.put_options())
            .await
            .map(|_| ())
            .map_err(|e| classify_store_error(&path, e))
    }

    async fn ensure_container_exists(&self) -> Result<()> {
        match self.scheme.as_str() {
            "memory" => Ok(()),
            "file" => {
                let dir = PathBuf::from(&self.container);
                std::fs::create_dir_all(&dir).map_err(|e| {
                    Error::config(format!("Failed to create directory {}: {e}", dir.display()))
                })
            }
            _ => {
                let prefix = (!self.prefix.is_empty()).then(|| ObjectPath::from(self.prefix.as_str()));
                match self.store.list_with_delimiter(prefix.as_ref()).await {
                    Ok(_) => Ok(()),
                    Err(object_store::Error::NotFound { .. }) => Err(self.missing_container()),
                    Err(e) => Err(Error::config(format!(
                        "Failed to reach {}://{}: {e}",
                        self.scheme, self.container
                    ))),
                }
            }
        }
    }

    fn describe(&self, name: &str) -> String {
        let path = self.object_path(name);
        if self.container.is_empty() {
            format!("{}://{path}", self.scheme)
        } else {
            format!("{}://{}/{path}", self.scheme, self.container)
        }
    }
}

/// Split `scheme://container/prefix` into container and prefix
fn split_container<'a>(url: &'a str, scheme: &str) -> Result<(&'a str, String)> {
    let without_scheme = url
        .strip_prefix(&format!("{scheme}://"))
        .ok_or_else(|| Error::config(format!("Invalid {scheme} URL: {url}")))?;

    let (container, prefix) = match without_scheme.find('/') {
        Some(idx) => (
            &without_scheme[..idx],
            without_scheme[idx + 1..].to_string(),
        ),
        None => (without_scheme, String::new()),
    };

    if container.is_empty() {
        return Err(Error::config(format!("Missing bucket name in {url}")));
    }
    Ok((container, prefix))
}

/// Map an object store failure onto the transient / permanent split
fn classify_store_error(path: &ObjectPath, err: object_store::Error) -> Error {
    use object_store::Error as E;

    match err {
        E::NotFound { .. }
        | E::PermissionDenied { .. }
        | E::Unauthenticated { .. }
        | E::InvalidPath { .. }
        | E::NotSupported { .. }
        | E::NotImplemented
        | E::AlreadyExists { .. }
        | E::Precondition { .. }
        | E::UnknownConfigurationKey { .. } => {
            Error::sink_rejected(format!("Failed to write {path}: {err}"))
        }
        other => Error::sink_unavailable(format!("Failed to write {path}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_container() {
        let (bucket, prefix) = split_container("gs://my-bucket/a/b/", "gs").unwrap();
        assert_eq!(bucket, "my-bucket");
        assert_eq!(prefix, "a/b/");

        let (bucket, prefix) = split_container("gs://my-bucket", "gs").unwrap();
        assert_eq!(bucket, "my-bucket");
        assert!(prefix.is_empty());

        assert!(split_container("gs:///path", "gs").is_err());
    }

    #[test]
    fn test_parse_local_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().to_str().unwrap();
        let sink = ObjectStoreSink::parse(path).unwrap();
        assert_eq!(sink.scheme(), "file");
        assert!(!sink.is_cloud());
    }

    #[test]
    fn test_parse_memory() {
        let sink = ObjectStoreSink::parse("memory://").unwrap();
        assert_eq!(sink.scheme(), "memory");
        assert!(!sink.is_cloud());
        assert_eq!(sink.describe("bq_exports/batch_0.json"), "memory://bq_exports/batch_0.json");
    }

    #[test]
    fn test_object_path_with_prefix() {
        let sink = ObjectStoreSink {
            prefix: "nightly/".to_string(),
            container: "bucket".to_string(),
            scheme: "gs".to_string(),
            ..ObjectStoreSink::in_memory()
        };
        assert_eq!(
            sink.object_path("bq_exports/batch_3.json").as_ref(),
            "nightly/bq_exports/batch_3.json"
        );
        assert_eq!(
            sink.describe("bq_exports/batch_3.json"),
            "gs://bucket/nightly/bq_exports/batch_3.json"
        );
    }

    #[test]
    fn test_classify_store_error() {
        let path = ObjectPath::from("a.json");
        let err = classify_store_error(&path, object_store::Error::NotImplemented);
        assert!(matches!(err, Error::SinkRejected { .. }));

        // A missing bucket never appears on retry
        let err = classify_store_error(
            &path,
            object_store::Error::NotFound {
                path: "missing-bucket/a.json".to_string(),
                source: "bucket not found".into(),
            },
        );
        assert!(matches!(err, Error::SinkRejected { .. }));
        assert!(!err.is_retryable());

        let err = classify_store_error(
            &path,
            object_store::Error::Generic {
                store: "test",
                source: "connection reset".into(),
            },
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_missing_container_tells_operator_to_create_it() {
        let sink = ObjectStoreSink {
            container: "analytics-exports".to_string(),
            scheme: "gs".to_string(),
            ..ObjectStoreSink::in_memory()
        };
        let message = sink.missing_container().to_string();
        assert!(message.contains("gs://analytics-exports does not exist"));
        assert!(message.contains("create it"));
    }

    #[tokio::test]
    async fn test_in_memory_put_carries_content_type() {
        let sink = ObjectStoreSink::in_memory().with_content_type("application/json");
        sink.put("bq_exports/batch_1.json", Bytes::from_static(b"[1]"))
            .await
            .unwrap();

        let stored = sink
            .store
            .get(&ObjectPath::from("bq_exports/batch_1.json"))
            .await
            .unwrap();
        let content_type: Option<&str> = stored
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.as_ref());
        assert_eq!(content_type, Some("application/json"));
        assert_eq!(stored.bytes().await.unwrap(), Bytes::from_static(b"[1]"));
    }

    #[tokio::test]
    async fn test_local_put_ignores_content_type() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sink = ObjectStoreSink::parse(temp_dir.path().to_str().unwrap())
            .unwrap()
            .with_content_type("application/json");

        sink.put("batch_0.json", Bytes::from_static(b"[]")).await.unwrap();
        assert!(temp_dir.path().join("batch_0.json").is_file());
    }
}
