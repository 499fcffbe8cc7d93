//! Staging area for serialized batches
//!
//! A batch payload is staged between serialization and upload. Staged
//! artifacts are guards: dropping one releases its storage, so cleanup
//! happens on every exit path of the batch step.

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::warn;

/// Where staged payloads live
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StagingMode {
    /// Keep the payload in memory
    #[default]
    Memory,
    /// Write the payload to `dir/batch_{n}.json` and upload from the file
    Disk {
        /// Directory for staged files; a temporary directory when unset
        #[serde(default)]
        dir: Option<PathBuf>,
    },
}

/// Run-scoped staging area
#[derive(Debug)]
pub struct StagingArea {
    dir: Option<PathBuf>,
    // Removed with the area when the run ends
    _temp: Option<TempDir>,
}

impl StagingArea {
    /// Prepare the staging area for a run
    pub fn new(mode: &StagingMode) -> Result<Self> {
        match mode {
            StagingMode::Memory => Ok(Self {
                dir: None,
                _temp: None,
            }),
            StagingMode::Disk { dir: Some(dir) } => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    Error::config(format!(
                        "Failed to create staging directory {}: {e}",
                        dir.display()
                    ))
                })?;
                Ok(Self {
                    dir: Some(dir.clone()),
                    _temp: None,
                })
            }
            StagingMode::Disk { dir: None } => {
                let temp = tempfile::Builder::new()
                    .prefix("batch-export-")
                    .tempdir()
                    .map_err(|e| Error::config(format!("Failed to create staging directory: {e}")))?;
                Ok(Self {
                    dir: Some(temp.path().to_path_buf()),
                    _temp: Some(temp),
                })
            }
        }
    }

    /// Directory of staged files, if staging to disk
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Stage `payload` under `name`
    pub async fn stage(&self, name: &str, payload: Bytes) -> Result<StagedArtifact> {
        match &self.dir {
            None => Ok(StagedArtifact {
                name: name.to_string(),
                content: Staged::Memory(payload),
            }),
            Some(dir) => {
                // Guard first so a partial write is removed too
                let artifact = StagedArtifact {
                    name: name.to_string(),
                    content: Staged::File(dir.join(name)),
                };
                let path = artifact
                    .path()
                    .ok_or_else(|| Error::staging("Staged file has no path"))?;
                tokio::fs::write(path, &payload).await.map_err(|e| {
                    Error::staging(format!("Failed to write {}: {e}", path.display()))
                })?;
                Ok(artifact)
            }
        }
    }
}

#[derive(Debug)]
enum Staged {
    Memory(Bytes),
    File(PathBuf),
}

/// A staged payload; releases its storage when dropped
#[derive(Debug)]
pub struct StagedArtifact {
    name: String,
    content: Staged,
}

impl StagedArtifact {
    /// Artifact name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File backing the artifact, if staged to disk
    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            Staged::File(path) => Some(path),
            Staged::Memory(_) => None,
        }
    }

    /// Read the staged payload back for upload
    pub async fn read(&self) -> Result<Bytes> {
        match &self.content {
            Staged::Memory(bytes) => Ok(bytes.clone()),
            Staged::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| Error::staging(format!("Failed to read {}: {e}", path.display()))),
        }
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if let Staged::File(path) = &self.content {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove staged file {}: {e}", path.display());
                }
            }
        }
    }
}
