//! Source traits

use crate::error::Result;
use crate::types::Page;

/// Something a query can be run against
pub trait DataSource {
    /// Open `query` and page through its result `page_size` records at a time
    ///
    /// Fails with `Error::Source` when the query is invalid or the source
    /// cannot be reached.
    fn open(&self, query: &str, page_size: usize) -> Result<Box<dyn PageSource>>;
}

/// Forward-only cursor over the pages of one query result
///
/// Read only by the pipeline's control task; never shared across workers.
pub trait PageSource: Send {
    /// Fetch the next page, or `None` once the result is exhausted
    ///
    /// Returned pages are never empty and hold at most `page_size` records.
    fn next_page(&mut self) -> Result<Option<Page>>;
}
