// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # batch-export
//!
//! Pages a tabular query result into numbered JSON batches and uploads each
//! batch to object storage, one batch at a time or on a bounded worker pool.
//!
//! ## Features
//!
//! - **DuckDB Sources**: DuckDB files, plus PostgreSQL, MySQL and SQLite attached read-only
//! - **Snapshot Paging**: A query is read from a fixed snapshot, page by page
//! - **Typed Serialization**: Timestamps and dates through registered handlers
//! - **Object Storage**: GCS, S3, R2, Azure, local directories and in-memory stores
//! - **Failure Isolation**: A failed batch is recorded and the run carries on
//! - **Cancellation**: Ctrl-C, SIGTERM or a deadline stop the run with a partial summary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use batch_export::pipeline::{BatchExportPipeline, ExportConfig};
//! use batch_export::serialize::JsonSerializer;
//! use batch_export::sink::ObjectStoreSink;
//! use batch_export::source::DuckDbSource;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> batch_export::Result<()> {
//!     let source = DuckDbSource::in_memory()?;
//!     let sink = ObjectStoreSink::parse("gs://analytics-exports")?;
//!
//!     let pipeline = BatchExportPipeline::new(Arc::new(sink), Arc::new(JsonSerializer::new()))
//!         .with_config(ExportConfig::new().with_page_size(50).parallel(10));
//!
//!     let summary = pipeline.run(&source, "SELECT * FROM dummy_users").await?;
//!     println!("{} of {} batches exported", summary.succeeded, summary.attempted);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   pages   ┌──────────────┐  batches  ┌──────────────────┐
//! │  DataSource  │ ────────▶ │   Pipeline   │ ────────▶ │  worker (≤ W)    │
//! │  PageSource  │           │ control task │           │ serialize        │
//! └──────────────┘           └──────┬───────┘           │ stage            │
//!                                   │                   │ upload ──▶ Sink  │
//!                                   ▼                   └────────┬─────────┘
//!                             ┌────────────┐   ExportResult      │
//!                             │ RunSummary │ ◀───────────────────┘
//!                             └────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for batch-export
pub mod error;

/// Records, batches and scheduling modes
pub mod types;

/// Export settings loaded from YAML or JSON
pub mod config;

/// Page sources (DuckDB and in-memory)
pub mod source;

/// Page serializers
pub mod serialize;

/// Sinks and staging
pub mod sink;

/// Batch export pipeline
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ExportSettings;
pub use pipeline::{BatchExportPipeline, ExportConfig, ExportResult, RunOutcome, RunSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
