//! # Rowfold
//!
//! Single-statement aggregate loading: given runtime metadata describing an
//! aggregate root (nested entities, embedded value objects, ordered
//! collections, maps), generate one analytic SQL query that fetches the whole
//! aggregate in a single round trip, then fold the flat rows back into the
//! nested object graph.
//!
//! ## Quick Start
//!
//! ```rust
//! use rowfold::{Aggregate, Dialect, Entity, RusqliteExecutor, SingleSelectDataAccessStrategy, Value};
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Deserialize)]
//! struct Order {
//!     id: i64,
//!     note: Option<String>,
//! }
//!
//! impl Aggregate for Order {
//!     fn entity() -> Arc<Entity> {
//!         Entity::builder("order").id("id").scalar("note").build()
//!     }
//! }
//!
//! # fn main() -> rowfold::Result<()> {
//! let conn = rusqlite::Connection::open_in_memory()?;
//! conn.execute_batch("CREATE TABLE \"order\" (id INTEGER PRIMARY KEY, note TEXT);")?;
//! let strategy = SingleSelectDataAccessStrategy::new(
//!     Dialect::SQLite,
//!     Arc::new(RusqliteExecutor::new(conn)),
//! );
//!
//! let missing: Option<Order> = strategy.find_by_id(&Value::Integer(1))?;
//! assert!(missing.is_none());
//! # Ok(())
//! # }
//! ```
//!
//! The heavy lifting lives in `rowfold-core`; this crate re-exports it.

pub use rowfold_core::*;
