//! Builds the analytic structure tree: one node per joined table, mirroring
//! the aggregate's property graph before any SQL exists.
//!
//! Embedded properties contribute prefixed columns to their enclosing node.
//! Single-valued associations become [`NodeKind::Join`] children. Collections
//! and maps become [`NodeKind::Partition`] children, which later lower into
//! derived tables with a synthetic row-number column.

use std::sync::Arc;

use compact_str::{CompactString, format_compact};

use crate::error::{Result, RowfoldError};
use crate::path::AggregatePath;
use crate::schema::{Entity, Multiplicity, Property};

/// Hard bound on aggregate nesting. Exceeding it fails structure building
/// instead of silently truncating the graph.
pub(crate) const MAX_DEPTH: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    /// Single-valued association, lowered to a LEFT OUTER JOIN.
    Join,
    /// Multi-valued branch, lowered to a row-numbered derived table.
    Partition { ordered: bool, map: bool },
}

/// A scalar leaf projected by a node, with its physical column name on the
/// node's table. Embedded leaves carry the accumulated prefix.
#[derive(Clone, Debug)]
pub struct ColumnLeaf {
    pub(crate) path: AggregatePath,
    pub(crate) column: CompactString,
}

impl ColumnLeaf {
    pub fn path(&self) -> &AggregatePath {
        &self.path
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

/// One node of the analytic structure tree.
#[derive(Clone, Debug)]
pub struct StructureNode {
    path: AggregatePath,
    kind: NodeKind,
    table: CompactString,
    back_ref: Option<CompactString>,
    key_column: Option<CompactString>,
    id_column: Option<ColumnLeaf>,
    columns: Vec<ColumnLeaf>,
    children: Vec<StructureNode>,
}

impl StructureNode {
    pub fn path(&self) -> &AggregatePath {
        &self.path
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column on this node's table pointing back at the owning entity.
    /// `None` for the root.
    pub fn back_ref(&self) -> Option<&str> {
        self.back_ref.as_deref()
    }

    /// Qualifier column (list index or map key), present for qualified
    /// partitions only.
    pub fn key_column(&self) -> Option<&str> {
        self.key_column.as_deref()
    }

    pub fn id_column(&self) -> Option<&ColumnLeaf> {
        self.id_column.as_ref()
    }

    pub fn columns(&self) -> &[ColumnLeaf] {
        &self.columns
    }

    pub fn children(&self) -> &[StructureNode] {
        &self.children
    }

    /// Partitions over plain value tables have no identifier of their own;
    /// their single column is the element value itself.
    pub(crate) fn is_scalar_element(&self) -> bool {
        matches!(self.kind, NodeKind::Partition { .. }) && self.id_column.is_none()
    }
}

/// Turns a root entity's full reachable path set into a structure tree.
pub struct AnalyticStructureBuilder;

impl AnalyticStructureBuilder {
    pub fn build(root: &Arc<Entity>) -> Result<StructureNode> {
        let path = AggregatePath::root(root.clone());
        let mut stack: Vec<CompactString> = vec![root.name().into()];
        Self::entity_node(path, NodeKind::Root, root, None, None, &mut stack, 0)
    }

    fn entity_node(
        path: AggregatePath,
        kind: NodeKind,
        entity: &Arc<Entity>,
        back_ref: Option<CompactString>,
        key_column: Option<CompactString>,
        stack: &mut Vec<CompactString>,
        depth: usize,
    ) -> Result<StructureNode> {
        let id_column = entity.id_property().map(|id| ColumnLeaf {
            path: path.append(id.clone()),
            column: id.column_name().into(),
        });

        let mut node = StructureNode {
            path: path.clone(),
            kind,
            table: entity.table_name().into(),
            back_ref,
            key_column,
            id_column,
            columns: Vec::new(),
            children: Vec::new(),
        };
        Self::populate(&mut node, &path, entity, "", stack, depth)?;
        Ok(node)
    }

    /// Collects the columns and children contributed by `entity` at `base`.
    /// Recurses through embedded properties with a grown column prefix; the
    /// node itself stays the same.
    fn populate(
        node: &mut StructureNode,
        base: &AggregatePath,
        entity: &Arc<Entity>,
        prefix: &str,
        stack: &mut Vec<CompactString>,
        depth: usize,
    ) -> Result<()> {
        let is_id = |p: &Property| entity.id_property().is_some_and(|id| id.name() == p.name());

        for property in entity.properties() {
            // the identifier is projected separately, ahead of the other columns
            if is_id(property) {
                continue;
            }
            let path = base.append(property.clone());

            match property.multiplicity() {
                Multiplicity::Scalar => node.columns.push(ColumnLeaf {
                    path,
                    column: format_compact!("{prefix}{}", property.column_name()),
                }),
                Multiplicity::Embedded => {
                    let target = require_target(&path, property)?;
                    enter(stack, depth, &path, target)?;
                    let nested = format_compact!("{prefix}{}_", property.column_name());
                    Self::populate(node, &path, target, &nested, stack, depth + 1)?;
                    stack.pop();
                }
                Multiplicity::One => {
                    let target = require_target(&path, property)?;
                    require_joinable_id(&path, target)?;
                    enter(stack, depth, &path, target)?;
                    let child = Self::entity_node(
                        path.clone(),
                        NodeKind::Join,
                        target,
                        Some(back_ref_column(&node.table)),
                        None,
                        stack,
                        depth + 1,
                    )?;
                    stack.pop();
                    node.children.push(child);
                }
                Multiplicity::List | Multiplicity::Set | Multiplicity::Map => {
                    // row-number partitioning needs an enclosing entity with an
                    // identifier to key on
                    let enclosing = path.required_parent()?.filter(|p| {
                        p.leaf_entity().is_some_and(|e| e.id_property().is_some())
                    });
                    if enclosing.is_none() {
                        return Err(RowfoldError::Configuration(format!(
                            "collection `{path}` has no enclosing entity with an identifier"
                        )));
                    }

                    let kind = NodeKind::Partition {
                        ordered: path.is_ordered(),
                        map: path.is_map(),
                    };
                    let key_column = path.is_qualified().then(|| property.key_column());
                    let back_ref = back_ref_column(&node.table);

                    match property.target() {
                        Some(target) => {
                            require_joinable_id(&path, target)?;
                            enter(stack, depth, &path, target)?;
                            let child = Self::entity_node(
                                path.clone(),
                                kind,
                                target,
                                Some(back_ref),
                                key_column,
                                stack,
                                depth + 1,
                            )?;
                            stack.pop();
                            node.children.push(child);
                        }
                        None => {
                            // plain values live in a dedicated value table
                            let table = format_compact!("{}_{}", node.table, property.name());
                            let value = ColumnLeaf {
                                path: path.clone(),
                                column: property.column_name().into(),
                            };
                            node.children.push(StructureNode {
                                path,
                                kind,
                                table,
                                back_ref: Some(back_ref),
                                key_column,
                                id_column: None,
                                columns: vec![value],
                                children: Vec::new(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Physical name of the column a child table uses to point back at the
/// table owning it.
fn back_ref_column(table: &str) -> CompactString {
    format_compact!("{table}_id")
}

fn enter(
    stack: &mut Vec<CompactString>,
    depth: usize,
    path: &AggregatePath,
    entity: &Arc<Entity>,
) -> Result<()> {
    if depth + 1 > MAX_DEPTH {
        return Err(RowfoldError::Configuration(format!(
            "aggregate nesting exceeds the depth bound of {MAX_DEPTH} at `{path}`"
        )));
    }
    if stack.iter().any(|name| name.as_str() == entity.name()) {
        return Err(RowfoldError::Configuration(format!(
            "cyclic entity graph: `{}` is reachable from itself at `{path}`",
            entity.name()
        )));
    }
    stack.push(entity.name().into());
    Ok(())
}

fn require_target<'p>(path: &AggregatePath, property: &'p Property) -> Result<&'p Arc<Entity>> {
    property.target().ok_or_else(|| {
        RowfoldError::Configuration(format!("property `{path}` must reference a target entity"))
    })
}

fn require_joinable_id(path: &AggregatePath, target: &Arc<Entity>) -> Result<()> {
    if target.id_property().is_none() {
        return Err(RowfoldError::Configuration(format!(
            "entity `{}` joined at `{path}` has no identifier property",
            target.name()
        )));
    }
    Ok(())
}
