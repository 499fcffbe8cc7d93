//! JSON page serializer
//!
//! Renders a page as a pretty-printed JSON array with one object per record.

use super::types::{PageSerializer, TypeHandler};
use crate::error::{Error, Result};
use crate::types::{FieldValue, Record};
use bytes::Bytes;
use chrono::SecondsFormat;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// JSON serializer with pluggable handlers for non-primitive types
#[derive(Clone)]
pub struct JsonSerializer {
    handlers: HashMap<String, TypeHandler>,
    pretty: bool,
}

impl JsonSerializer {
    /// Create a serializer with the default `timestamp` and `date` handlers
    pub fn new() -> Self {
        Self::without_handlers()
            .with_handler("timestamp", |value| match value {
                FieldValue::Timestamp(ts) => Ok(ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
                other => Err(Error::serialization(other.type_name())),
            })
            .with_handler("date", |value| match value {
                FieldValue::Date(d) => Ok(d.format("%Y-%m-%d").to_string()),
                other => Err(Error::serialization(other.type_name())),
            })
    }

    /// Create a serializer with no type handlers registered
    pub fn without_handlers() -> Self {
        Self {
            handlers: HashMap::new(),
            pretty: true,
        }
    }

    /// Register (or replace) the handler for a type name
    pub fn register<F>(&mut self, type_name: impl Into<String>, handler: F)
    where
        F: Fn(&FieldValue) -> Result<String> + Send + Sync + 'static,
    {
        self.handlers.insert(type_name.into(), Arc::new(handler));
    }

    /// Builder-style [`JsonSerializer::register`]
    #[must_use]
    pub fn with_handler<F>(mut self, type_name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&FieldValue) -> Result<String> + Send + Sync + 'static,
    {
        self.register(type_name, handler);
        self
    }

    /// Emit compact JSON instead of the 2-space indented form
    #[must_use]
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    /// Whether a handler exists for the type name
    pub fn has_handler(&self, type_name: &str) -> bool {
        self.handlers.contains_key(type_name)
    }

    /// Render a single value
    pub fn render_value(&self, value: &FieldValue) -> Result<Value> {
        let rendered = match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            FieldValue::String(s) => Value::String(s.clone()),
            other => {
                let handler = self
                    .handlers
                    .get(other.type_name())
                    .ok_or_else(|| Error::serialization(other.type_name()))?;
                Value::String(handler(other)?)
            }
        };
        Ok(rendered)
    }

    fn render_record<'a>(&self, record: &'a Record) -> Result<OrderedObject<'a>> {
        record
            .iter()
            .map(|(name, value)| Ok((name, self.render_value(value)?)))
            .collect::<Result<Vec<_>>>()
            .map(OrderedObject)
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JsonSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().collect();
        types.sort();
        f.debug_struct("JsonSerializer")
            .field("handlers", &types)
            .field("pretty", &self.pretty)
            .finish()
    }
}

impl PageSerializer for JsonSerializer {
    fn serialize(&self, page: &[Record]) -> Result<Bytes> {
        let objects = page
            .iter()
            .map(|record| self.render_record(record))
            .collect::<Result<Vec<_>>>()?;

        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&objects)?
        } else {
            serde_json::to_vec(&objects)?
        };
        Ok(Bytes::from(bytes))
    }
}

/// A JSON object that keeps the record's field order
struct OrderedObject<'a>(Vec<(&'a str, Value)>);

impl Serialize for OrderedObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
