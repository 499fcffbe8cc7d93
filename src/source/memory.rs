//! In-memory page source
//!
//! Tables are plain `Vec<Record>`s keyed by name; the query is the table name.

use super::types::{DataSource, PageSource};
use crate::error::{Error, Result};
use crate::types::{Page, Record};
use std::collections::HashMap;
use std::sync::Arc;

/// Named in-memory tables
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, Arc<Vec<Record>>>,
}

impl MemorySource {
    /// Create a source with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table
    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, records: Vec<Record>) -> Self {
        self.tables.insert(name.into(), Arc::new(records));
        self
    }

    /// Number of records in a table
    pub fn row_count(&self, name: &str) -> Option<usize> {
        self.tables.get(name).map(|t| t.len())
    }
}

impl DataSource for MemorySource {
    fn open(&self, query: &str, page_size: usize) -> Result<Box<dyn PageSource>> {
        if page_size == 0 {
            return Err(Error::config("page_size must be greater than zero"));
        }
        let table = self
            .tables
            .get(query.trim())
            .ok_or_else(|| Error::source_error(format!("Unknown table '{query}'")))?;

        Ok(Box::new(MemoryPages {
            records: Arc::clone(table),
            page_size,
            offset: 0,
        }))
    }
}

struct MemoryPages {
    records: Arc<Vec<Record>>,
    page_size: usize,
    offset: usize,
}

impl PageSource for MemoryPages {
    fn next_page(&mut self) -> Result<Option<Page>> {
        if self.offset >= self.records.len() {
            return Ok(None);
        }
        let end = (self.offset + self.page_size).min(self.records.len());
        let page = self.records[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(page))
    }
}
