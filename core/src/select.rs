//! Dialect-neutral SELECT representation and the lowering from the analytic
//! structure tree into it.
//!
//! The three query shapes (all, by id, by id set) share one lowered value and
//! differ only in [`Predicate`], so the projected column set and its aliases
//! are byte-identical across shapes. Aliases are derived from dot paths with a
//! `__rn` / `__key` suffix for the synthetic columns, which keeps the reader
//! query-shape-agnostic.

use compact_str::{CompactString, format_compact};

use crate::error::{Result, RowfoldError};
use crate::path::AggregatePath;
use crate::structure::{NodeKind, StructureNode};

/// Name of the row-number column inside a partitioned derived table.
pub(crate) const ROW_NUMBER_COLUMN: &str = "__rn";

/// Alias of a plain column projection.
pub(crate) fn column_alias(path: &AggregatePath) -> CompactString {
    path.to_dot_path().into()
}

/// Alias of a partition's synthetic row-number projection.
pub(crate) fn row_number_alias(path: &AggregatePath) -> CompactString {
    format_compact!("{}__rn", path.to_dot_path())
}

/// Alias of a partition's qualifier (list index / map key) projection.
pub(crate) fn key_alias(path: &AggregatePath) -> CompactString {
    format_compact!("{}__key", path.to_dot_path())
}

/// The only thing distinguishing the three query shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Predicate {
    All,
    ById,
    ByIds,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRef {
    pub(crate) table: CompactString,
    pub(crate) column: CompactString,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Projection {
    pub(crate) source: ColumnRef,
    pub(crate) alias: CompactString,
}

/// Window spec of a partitioned derived table: row numbers per back-reference
/// value, ordered by the qualifier column when the branch is ordered.
#[derive(Clone, Debug)]
pub struct PartitionSpec {
    pub(crate) partition_by: CompactString,
    pub(crate) order_by: Option<CompactString>,
}

#[derive(Clone, Debug)]
pub struct TableSource {
    pub(crate) table: CompactString,
    pub(crate) alias: CompactString,
    pub(crate) partition: Option<PartitionSpec>,
}

#[derive(Clone, Debug)]
pub struct JoinClause {
    pub(crate) source: TableSource,
    pub(crate) on_left: ColumnRef,
    pub(crate) on_right: ColumnRef,
}

/// Immutable, dialect-neutral SELECT over one aggregate.
#[derive(Clone, Debug)]
pub struct Select {
    pub(crate) projections: Vec<Projection>,
    pub(crate) from: TableSource,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) root_id: ColumnRef,
    pub(crate) predicate: Predicate,
}

impl Select {
    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    /// Same projection layout, different predicate.
    pub fn with_predicate(&self, predicate: Predicate) -> Select {
        Select {
            predicate,
            ..self.clone()
        }
    }

    /// Projected aliases in projection order.
    pub fn aliases(&self) -> Vec<&str> {
        self.projections.iter().map(|p| p.alias.as_str()).collect()
    }
}

/// Lowers a structure tree into a [`Select`] with [`Predicate::All`].
pub struct StructureToSelect;

impl StructureToSelect {
    pub fn create_select(structure: &StructureNode) -> Result<Select> {
        let root_id = structure.id_column().ok_or_else(|| {
            RowfoldError::Configuration(format!(
                "entity `{}` has no identifier property",
                structure.table()
            ))
        })?;

        let mut counter = 0usize;
        let root_alias = next_alias(&mut counter);
        let mut projections = Vec::new();
        let mut joins = Vec::new();
        lower_node(structure, &root_alias, &mut counter, &mut projections, &mut joins)?;

        Ok(Select {
            projections,
            from: TableSource {
                table: structure.table().into(),
                alias: root_alias.clone(),
                partition: None,
            },
            joins,
            root_id: ColumnRef {
                table: root_alias,
                column: root_id.column().into(),
            },
            predicate: Predicate::All,
        })
    }
}

fn next_alias(counter: &mut usize) -> CompactString {
    let alias = format_compact!("t{counter}");
    *counter += 1;
    alias
}

fn lower_node(
    node: &StructureNode,
    alias: &CompactString,
    counter: &mut usize,
    projections: &mut Vec<Projection>,
    joins: &mut Vec<JoinClause>,
) -> Result<()> {
    // synthetic columns lead, so every partition's bookkeeping is grouped
    if let NodeKind::Partition { .. } = node.kind() {
        projections.push(Projection {
            source: ColumnRef {
                table: alias.clone(),
                column: ROW_NUMBER_COLUMN.into(),
            },
            alias: row_number_alias(node.path()),
        });
        if let Some(key) = node.key_column() {
            projections.push(Projection {
                source: ColumnRef {
                    table: alias.clone(),
                    column: key.into(),
                },
                alias: key_alias(node.path()),
            });
        }
    }

    if let Some(id) = node.id_column() {
        projections.push(Projection {
            source: ColumnRef {
                table: alias.clone(),
                column: id.column().into(),
            },
            alias: column_alias(id.path()),
        });
    }

    for leaf in node.columns() {
        projections.push(Projection {
            source: ColumnRef {
                table: alias.clone(),
                column: leaf.column().into(),
            },
            alias: column_alias(leaf.path()),
        });
    }

    for child in node.children() {
        let child_alias = next_alias(counter);
        let back_ref = child.back_ref().ok_or_else(|| {
            RowfoldError::Configuration(format!(
                "node `{}` is missing its back reference column",
                child.path()
            ))
        })?;
        let parent_id = node.id_column().ok_or_else(|| {
            RowfoldError::Configuration(format!(
                "node `{}` joins children but has no identifier column",
                node.path()
            ))
        })?;

        let partition = match child.kind() {
            NodeKind::Partition { ordered, .. } => Some(PartitionSpec {
                partition_by: back_ref.into(),
                order_by: ordered.then(|| child.key_column()).flatten().map(Into::into),
            }),
            _ => None,
        };

        joins.push(JoinClause {
            source: TableSource {
                table: child.table().into(),
                alias: child_alias.clone(),
                partition,
            },
            on_left: ColumnRef {
                table: child_alias.clone(),
                column: back_ref.into(),
            },
            on_right: ColumnRef {
                table: alias.clone(),
                column: parent_id.column().into(),
            },
        });

        lower_node(child, &child_alias, counter, projections, joins)?;
    }

    Ok(())
}
