//! Filter, ordering and pagination parameters for find operations.

use std::fmt;
use std::str::FromStr;

use serde_json::Value as JsonValue;

use crate::error::OgmError;
use crate::metadata::NodeEntityMetadata;

/// Equality filters combined with AND.
///
/// Keys are entity field names. Setting a field twice keeps the last value.
/// A `null` value never matches, as in Cypher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    entries: Vec<(String, JsonValue)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `field` to equal `value`.
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fails with `UnknownProperty` on the first field not mapped by `metadata`.
    pub fn validate(&self, metadata: &NodeEntityMetadata) -> Result<(), OgmError> {
        for (field, _) in &self.entries {
            metadata.property_key(field)?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Criteria::new(), |criteria, (k, v)| criteria.equals(k, v))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

impl Order {
    /// The Cypher keyword for this direction.
    pub fn as_cypher(&self) -> &'static str {
        match self {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cypher())
    }
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Order::Ascending),
            "desc" | "descending" => Ok(Order::Descending),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Ordered list of sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBy {
    keys: Vec<(String, Order)>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sort key. Re-adding a field changes its direction in place.
    pub fn then(mut self, field: impl Into<String>, order: Order) -> Self {
        let field = field.into();
        match self.keys.iter_mut().find(|(f, _)| *f == field) {
            Some(key) => key.1 = order,
            None => self.keys.push((field, order)),
        }
        self
    }

    pub fn asc(self, field: impl Into<String>) -> Self {
        self.then(field, Order::Ascending)
    }

    pub fn desc(self, field: impl Into<String>) -> Self {
        self.then(field, Order::Descending)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Order)> {
        self.keys.iter().map(|(f, o)| (f.as_str(), *o))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn validate(&self, metadata: &NodeEntityMetadata) -> Result<(), OgmError> {
        for (field, _) in &self.keys {
            metadata.property_key(field)?;
        }
        Ok(())
    }
}

/// Result window: skip `first` results, return at most `max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub first: Option<u64>,
    pub max: Option<u64>,
}

impl Pagination {
    pub const fn new() -> Self {
        Self {
            first: None,
            max: None,
        }
    }

    pub const fn first(mut self, first: u64) -> Self {
        self.first = Some(first);
        self
    }

    pub const fn max(mut self, max: u64) -> Self {
        self.max = Some(max);
        self
    }

    /// Builds a window from the `limit` / `offset` pair used by `find_by`.
    pub const fn from_limit_offset(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self {
            first: offset,
            max: limit,
        }
    }

    pub const fn is_unbounded(&self) -> bool {
        self.first.is_none() && self.max.is_none()
    }
}
