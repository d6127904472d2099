//! [`SingleSelectDataAccessStrategy`]: the narrow loading facade.
//!
//! Only whole-aggregate loads are answered with the single-select plan;
//! every shaped read (sorting, paging, criteria) fails fast so callers can
//! fall back to a row-per-table strategy instead of getting silently wrong
//! results.

use std::sync::Arc;

use crate::dialect::Dialect;
use crate::error::{Result, RowfoldError};
use crate::factory::{Aggregate, AggregateReaderFactory};
use crate::row::{Executor, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Requested result ordering. Carried for API shape only; this strategy
/// never applies it.
#[derive(Clone, Debug)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

/// Requested result page. Carried for API shape only; this strategy never
/// applies it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

/// Opaque criteria placeholder. No criteria are evaluated here.
#[derive(Clone, Debug, Default)]
pub struct Query {
    _private: (),
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct SingleSelectDataAccessStrategy {
    factory: AggregateReaderFactory,
}

impl SingleSelectDataAccessStrategy {
    pub fn new(dialect: Dialect, executor: Arc<dyn Executor>) -> Self {
        Self {
            factory: AggregateReaderFactory::new(dialect, executor),
        }
    }

    pub fn factory(&self) -> &AggregateReaderFactory {
        &self.factory
    }

    pub fn find_by_id<T: Aggregate>(&self, id: &Value) -> Result<Option<T>> {
        self.factory.reader_for::<T>()?.find_by_id(id)
    }

    pub fn find_all<T: Aggregate>(&self) -> Result<Vec<T>> {
        self.factory.reader_for::<T>()?.find_all()
    }

    pub fn find_all_by_id<T: Aggregate>(&self, _ids: &[Value]) -> Result<Vec<T>> {
        Err(RowfoldError::Unsupported(
            "loading by identifier set is not answered by the single-select strategy",
        ))
    }

    pub fn find_all_sorted<T: Aggregate>(&self, _sort: &Sort) -> Result<Vec<T>> {
        Err(RowfoldError::Unsupported(
            "sorted loading is not answered by the single-select strategy",
        ))
    }

    pub fn find_all_paged<T: Aggregate>(&self, _page: PageRequest) -> Result<Vec<T>> {
        Err(RowfoldError::Unsupported(
            "paged loading is not answered by the single-select strategy",
        ))
    }

    pub fn find_all_by_query<T: Aggregate>(&self, _query: &Query) -> Result<Vec<T>> {
        Err(RowfoldError::Unsupported(
            "criteria loading is not answered by the single-select strategy",
        ))
    }

    pub fn find_all_by_query_paged<T: Aggregate>(
        &self,
        _query: &Query,
        _page: PageRequest,
    ) -> Result<Vec<T>> {
        Err(RowfoldError::Unsupported(
            "paged criteria loading is not answered by the single-select strategy",
        ))
    }

    /// Criteria lookups always come back empty rather than failing, so a
    /// composed strategy can try this one first without special-casing.
    pub fn find_one<T: Aggregate>(&self, _query: &Query) -> Result<Option<T>> {
        Ok(None)
    }
}
