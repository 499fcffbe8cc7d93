//! Page source module
//!
//! # Overview
//!
//! A [`DataSource`] opens a query and hands back a [`PageSource`]: a lazy,
//! forward-only sequence of pages that covers the result set exactly once.
//!
//! - `DuckDbSource` - DuckDB, natively or attached to PostgreSQL, MySQL, SQLite
//! - `MemorySource` - named in-memory tables

mod engine;
mod memory;
mod types;

pub use engine::{ColumnDef, DuckDbSource, TableSchema};
pub use memory::MemorySource;
pub use types::{DataSource, PageSource};
