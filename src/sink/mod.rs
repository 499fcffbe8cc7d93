//! Sink module
//!
//! Durable write targets for serialized batches.
//!
//! # Overview
//!
//! This module provides:
//! - The [`Sink`] trait: idempotent, independent named writes
//! - `ObjectStoreSink` - cloud storage output (GCS, S3, R2, Azure) and local files
//! - `MemorySink` - in-process map of written objects
//! - Staging: the scoped holding area between serialization and upload

mod cloud;
mod memory;
mod staging;
mod types;

pub use cloud::ObjectStoreSink;
pub use memory::MemorySink;
pub use staging::{StagedArtifact, StagingArea, StagingMode};
pub use types::Sink;
