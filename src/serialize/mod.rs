//! Page serializer module
//!
//! # Overview
//!
//! The serialize module renders a page of records into the byte payload
//! that is staged and uploaded for a batch. Primitive values map directly
//! onto JSON scalars; every other type goes through a handler registered
//! under its type name.

mod json;
mod types;

pub use json::JsonSerializer;
pub use types::{PageSerializer, TypeHandler};
