//! Flat result rows and the executor boundary.
//!
//! The core never talks to a driver directly; it hands SQL text plus bound
//! [`Value`]s to an [`Executor`] and gets named-column [`ResultRow`]s back.
//! Driver errors propagate unchanged, retries belong to the caller.

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::error::Result;

#[cfg(feature = "rusqlite")]
mod rusqlite;
#[cfg(feature = "rusqlite")]
pub use rusqlite::RusqliteExecutor;

/// A database value, driver-neutral.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Bool(bool),
    /// Only used to bind an identifier sequence on dialects with array
    /// parameters; never read back from a row.
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(v) => serde_json::Value::from(*v),
            Value::Real(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(v) => serde_json::Value::from(v.as_str()),
            Value::Blob(v) => serde_json::Value::from(v.clone()),
            Value::Bool(v) => serde_json::Value::from(*v),
            Value::Array(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One flat row keyed by projection alias.
#[derive(Clone, Debug, Default)]
pub struct ResultRow {
    columns: HashMap<CompactString, Value>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<CompactString>, value: Value) {
        self.columns.insert(name.into(), value);
    }

    /// Builder-style insert, convenient for adapters and tests.
    #[must_use]
    pub fn with(mut self, name: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Statement execution boundary. One call, one statement, blocking.
pub trait Executor: Send + Sync {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<ResultRow>>;
}
