//! rusqlite-backed [`Executor`].

use std::sync::Mutex;

use compact_str::CompactString;

use crate::error::{Result, RowfoldError};
use crate::row::{Executor, ResultRow, Value};

/// Executes statements against a [`rusqlite::Connection`].
///
/// The connection is wrapped in a mutex because `Connection` is not `Sync`;
/// execution itself stays single-statement and blocking.
pub struct RusqliteExecutor {
    conn: Mutex<::rusqlite::Connection>,
}

impl RusqliteExecutor {
    pub fn new(conn: ::rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl Executor for RusqliteExecutor {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<ResultRow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RowfoldError::Execution("connection mutex poisoned".to_string()))?;
        let mut stmt = conn.prepare(sql)?;

        let names: Vec<CompactString> = stmt
            .column_names()
            .into_iter()
            .map(CompactString::from)
            .collect();

        let bound: Vec<::rusqlite::types::Value> = params
            .iter()
            .map(to_sqlite_value)
            .collect::<Result<_>>()?;

        let mut rows = stmt.query(::rusqlite::params_from_iter(bound))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut out = ResultRow::new();
            for (index, name) in names.iter().enumerate() {
                out.insert(name.clone(), from_sqlite_ref(row.get_ref(index)?)?);
            }
            result.push(out);
        }
        Ok(result)
    }
}

fn to_sqlite_value(value: &Value) -> Result<::rusqlite::types::Value> {
    use ::rusqlite::types::Value as Sqlite;
    Ok(match value {
        Value::Null => Sqlite::Null,
        Value::Integer(v) => Sqlite::Integer(*v),
        Value::Real(v) => Sqlite::Real(*v),
        Value::Text(v) => Sqlite::Text(v.clone()),
        Value::Blob(v) => Sqlite::Blob(v.clone()),
        Value::Bool(v) => Sqlite::Integer(i64::from(*v)),
        Value::Array(_) => {
            return Err(RowfoldError::Execution(
                "array parameters are not supported by the sqlite driver".to_string(),
            ));
        }
    })
}

fn from_sqlite_ref(value: ::rusqlite::types::ValueRef<'_>) -> Result<Value> {
    use ::rusqlite::types::ValueRef;
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(bytes) => Value::Text(
            core::str::from_utf8(bytes)
                .map_err(|e| RowfoldError::Execution(e.to_string()))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    })
}
