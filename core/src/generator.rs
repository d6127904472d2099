//! [`AnalyticSqlGenerator`]: entity metadata plus dialect in, three SQL
//! strings out.
//!
//! Everything is computed once at construction, so a generator is a pure
//! value of (root entity, dialect) and safe to cache indefinitely.

use std::sync::Arc;

use compact_str::CompactString;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::render::SqlRenderer;
use crate::schema::Entity;
use crate::select::{Predicate, StructureToSelect};
use crate::structure::{AnalyticStructureBuilder, StructureNode};

#[derive(Debug)]
pub struct AnalyticSqlGenerator {
    dialect: Dialect,
    structure: StructureNode,
    find_all: CompactString,
    find_by_id: CompactString,
    find_all_by_id: CompactString,
}

impl AnalyticSqlGenerator {
    /// Fails with a configuration error when the root entity has no
    /// identifier or its graph is cyclic or nested too deeply.
    pub fn new(dialect: Dialect, entity: &Arc<Entity>) -> Result<Self> {
        entity.required_id_property()?;

        let structure = AnalyticStructureBuilder::build(entity)?;
        let select = StructureToSelect::create_select(&structure)?;
        let renderer = SqlRenderer::new(dialect);

        let find_all = renderer.render(&select);
        let find_by_id = renderer.render(&select.with_predicate(Predicate::ById));
        let find_all_by_id = renderer.render(&select.with_predicate(Predicate::ByIds));

        tracing::debug!(
            entity = entity.name(),
            ?dialect,
            columns = select.aliases().len(),
            "generated single-select SQL"
        );

        Ok(Self {
            dialect,
            structure,
            find_all,
            find_by_id,
            find_all_by_id,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn structure(&self) -> &StructureNode {
        &self.structure
    }

    pub fn find_all(&self) -> &str {
        &self.find_all
    }

    pub fn find_by_id(&self) -> &str {
        &self.find_by_id
    }

    pub fn find_all_by_id(&self) -> &str {
        &self.find_all_by_id
    }
}
