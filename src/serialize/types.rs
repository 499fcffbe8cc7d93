//! Serializer traits
//!
//! Defines the core serializer abstractions.

use crate::error::Result;
use crate::types::{FieldValue, Record};
use bytes::Bytes;
use std::sync::Arc;

/// Converts a non-primitive value to its string form
pub type TypeHandler = Arc<dyn Fn(&FieldValue) -> Result<String> + Send + Sync>;

/// Trait for rendering a page into a payload
///
/// Implementations must be pure: the pipeline calls `serialize` from any
/// worker without synchronization.
pub trait PageSerializer: Send + Sync {
    /// Render the records of one page
    fn serialize(&self, page: &[Record]) -> Result<Bytes>;

    /// MIME type of the rendered payload
    fn content_type(&self) -> &'static str {
        "application/json"
    }
}
