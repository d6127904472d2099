pub mod dialect;
pub mod error;
pub mod factory;
pub mod generator;
pub mod path;
pub mod reader;
pub mod render;
pub mod row;
pub mod schema;
pub mod select;
pub mod strategy;
pub mod structure;

// Re-export key types and traits
pub use dialect::Dialect;
pub use error::{Result, RowfoldError};
pub use factory::{Aggregate, AggregateReaderFactory};
pub use generator::AnalyticSqlGenerator;
pub use path::AggregatePath;
pub use reader::AggregateReader;
pub use render::SqlRenderer;
pub use row::{Executor, ResultRow, Value};
#[cfg(feature = "rusqlite")]
pub use row::RusqliteExecutor;
pub use schema::{Entity, EntityBuilder, Multiplicity, Property};
pub use select::{Predicate, Select, StructureToSelect};
pub use strategy::{PageRequest, Query, SingleSelectDataAccessStrategy, Sort, SortDirection};
pub use structure::{AnalyticStructureBuilder, NodeKind, StructureNode};
