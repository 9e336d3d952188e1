//! Row and streaming types for query results.

use crate::error::OgmError;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::pin::Pin;

/// Parameters for Cypher queries.
///
/// A map of parameter names to JSON values that can be passed to queries.
pub type Params = HashMap<String, JsonValue>;

/// A stream of rows from a query result.
///
/// Rows are fetched on-demand, not loaded all at once.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row, OgmError>> + Send + 'a>>;

/// A single row from a query result.
///
/// Contains column values as JSON, with typed extraction via [`Row::get`].
#[derive(Debug, Clone, Default)]
pub struct Row {
    data: HashMap<String, JsonValue>,
}

impl Row {
    /// Creates a new row from a map of column names to values.
    pub fn new(data: HashMap<String, JsonValue>) -> Self {
        Self { data }
    }

    /// Gets a value from the row by column name, deserializing to the requested type.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not found or if deserialization fails.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let node: Node = row.get("n")?;
    /// let count: i64 = row.get("count")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, OgmError> {
        self.data
            .get(key)
            .ok_or_else(|| OgmError::Internal(format!("column not found: {}", key)))
            .and_then(|v| {
                serde_json::from_value(v.clone()).map_err(|e| {
                    OgmError::Internal(format!("failed to deserialize '{}': {}", key, e))
                })
            })
    }

    /// Gets a value from the row, returning `None` if the key doesn't exist or is null.
    ///
    /// Still returns an error if the key exists but deserialization fails.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, OgmError> {
        match self.data.get(key) {
            Some(v) if v.is_null() => Ok(None),
            Some(v) => serde_json::from_value(v.clone())
                .map(Some)
                .map_err(|e| OgmError::Internal(format!("failed to deserialize '{}': {}", key, e))),
            None => Ok(None),
        }
    }
}
