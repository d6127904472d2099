//! Reader construction and caching.
//!
//! Building an [`AggregateReader`] walks the whole entity graph and renders
//! three SQL strings, so the factory memoizes readers per aggregate type.

use std::any::{Any, TypeId};
use std::sync::{Arc, RwLock};

use hashbrown::HashMap;
use serde::de::DeserializeOwned;

use crate::dialect::Dialect;
use crate::error::{Result, RowfoldError};
use crate::reader::AggregateReader;
use crate::row::Executor;
use crate::schema::Entity;

/// A type loadable as an aggregate root. Implementors describe their own
/// relational shape; the returned metadata must be stable for the lifetime
/// of the process.
pub trait Aggregate: DeserializeOwned + 'static {
    fn entity() -> Arc<Entity>;
}

/// Hands out shared [`AggregateReader`]s, building each at most once.
pub struct AggregateReaderFactory {
    dialect: Dialect,
    executor: Arc<dyn Executor>,
    readers: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl AggregateReaderFactory {
    pub fn new(dialect: Dialect, executor: Arc<dyn Executor>) -> Self {
        Self {
            dialect,
            executor,
            readers: RwLock::new(HashMap::new()),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the cached reader for `T`, building it on first use.
    pub fn reader_for<T: Aggregate>(&self) -> Result<Arc<AggregateReader<T>>> {
        let key = TypeId::of::<T>();

        {
            let readers = self
                .readers
                .read()
                .map_err(|_| RowfoldError::Execution("reader cache lock poisoned".to_string()))?;
            if let Some(cached) = readers.get(&key) {
                return downcast::<T>(cached);
            }
        }

        let mut readers = self
            .readers
            .write()
            .map_err(|_| RowfoldError::Execution("reader cache lock poisoned".to_string()))?;
        // another caller may have built it while we waited for the write lock
        if let Some(cached) = readers.get(&key) {
            return downcast::<T>(cached);
        }

        let entity = T::entity();
        let reader = Arc::new(AggregateReader::<T>::new(
            self.dialect,
            &entity,
            Arc::clone(&self.executor),
        )?);
        let erased: Arc<dyn Any + Send + Sync> = reader.clone();
        readers.insert(key, erased);

        tracing::debug!(
            entity = entity.name(),
            aggregate = std::any::type_name::<T>(),
            "built aggregate reader"
        );
        Ok(reader)
    }
}

fn downcast<T: Aggregate>(cached: &Arc<dyn Any + Send + Sync>) -> Result<Arc<AggregateReader<T>>> {
    Arc::clone(cached).downcast::<AggregateReader<T>>().map_err(|_| {
        RowfoldError::Execution("reader cache holds a mismatched reader type".to_string())
    })
}
