//! Supported renderer targets and their capability differences.

use std::borrow::Cow;

use crate::row::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    SQLite,
    PostgreSQL,
}

impl Dialect {
    /// Renders a placeholder with the given 1-based index.
    ///
    /// Returns `Cow::Borrowed("?")` for SQLite (zero allocation), `Cow::Owned`
    /// for PostgreSQL numbered placeholders.
    pub fn placeholder(&self, index: usize) -> Cow<'static, str> {
        match self {
            Dialect::SQLite => Cow::Borrowed("?"),
            Dialect::PostgreSQL => Cow::Owned(format!("${index}")),
        }
    }

    /// Binds an identifier sequence as the single parameter of the by-id-set
    /// shape.
    ///
    /// SQLite has no array parameters, so the sequence travels as a JSON
    /// array consumed by `json_each`. PostgreSQL binds a real array matched
    /// with `= ANY($1)`.
    pub fn id_list_param(&self, ids: &[Value]) -> Value {
        match self {
            Dialect::SQLite => {
                let json = serde_json::Value::Array(ids.iter().map(Value::to_json).collect());
                Value::Text(json.to_string())
            }
            Dialect::PostgreSQL => Value::Array(ids.to_vec()),
        }
    }
}
