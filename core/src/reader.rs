//! [`AggregateReader`]: executes the generated single-select SQL and folds
//! the flat rows back into one nested object graph per root identifier.
//!
//! Reconstruction builds a `serde_json::Value` tree and finishes with a serde
//! deserialization into the target type, the same pairing the relation data
//! takes through JSON in comparable query APIs. All grouping state lives on
//! the call stack; a reader is safe to share between callers.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value as Json};
use smallvec::SmallVec;

use crate::dialect::Dialect;
use crate::error::{Result, RowfoldError};
use crate::generator::AnalyticSqlGenerator;
use crate::row::{Executor, ResultRow, Value};
use crate::schema::Entity;
use crate::select::{column_alias, key_alias, row_number_alias};
use crate::structure::{NodeKind, StructureNode};

pub struct AggregateReader<T> {
    generator: AnalyticSqlGenerator,
    executor: Arc<dyn Executor>,
    _aggregate: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> AggregateReader<T> {
    pub fn new(dialect: Dialect, entity: &Arc<Entity>, executor: Arc<dyn Executor>) -> Result<Self> {
        Ok(Self {
            generator: AnalyticSqlGenerator::new(dialect, entity)?,
            executor,
            _aggregate: PhantomData,
        })
    }

    pub fn find_by_id(&self, id: &Value) -> Result<Option<T>> {
        let rows = self
            .executor
            .execute(self.generator.find_by_id(), std::slice::from_ref(id))?;
        let mut found = self.read_aggregates(&rows)?;
        if found.len() > 1 {
            return Err(RowfoldError::DataIntegrity(
                "multiple aggregates returned for a single identifier".to_string(),
            ));
        }
        Ok(found.pop())
    }

    pub fn find_all(&self) -> Result<Vec<T>> {
        let rows = self.executor.execute(self.generator.find_all(), &[])?;
        self.read_aggregates(&rows)
    }

    pub fn find_all_by_id(&self, ids: &[Value]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let param = self.generator.dialect().id_list_param(ids);
        let rows = self
            .executor
            .execute(self.generator.find_all_by_id(), std::slice::from_ref(&param))?;
        self.read_aggregates(&rows)
    }

    /// Groups rows by root identifier and materializes one aggregate per
    /// group, in first-seen group order.
    fn read_aggregates(&self, rows: &[ResultRow]) -> Result<Vec<T>> {
        let root = self.generator.structure();
        let id_alias = column_alias(
            root.id_column()
                .ok_or_else(|| {
                    RowfoldError::Configuration(
                        "root structure node has no identifier column".to_string(),
                    )
                })?
                .path(),
        );

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<&ResultRow>> = HashMap::new();
        for row in rows {
            let id = required_value(row, &id_alias)?;
            if id.is_null() {
                return Err(RowfoldError::DataIntegrity(format!(
                    "NULL root identifier in column `{id_alias}`"
                )));
            }
            let key = id.to_json().to_string();
            groups
                .entry(key)
                .or_insert_with_key(|key| {
                    order.push(key.clone());
                    Vec::new()
                })
                .push(row);
        }

        tracing::debug!(rows = rows.len(), aggregates = order.len(), "regrouped result set");

        order
            .iter()
            .map(|key| {
                let group = groups.get(key.as_str()).ok_or_else(|| {
                    RowfoldError::DataIntegrity("row group vanished while reading".to_string())
                })?;
                let json = self.materialize(root, group)?;
                serde_json::from_value(json).map_err(|e| {
                    RowfoldError::Mapping(format!("cannot map aggregate onto target type: {e}"))
                })
            })
            .collect()
    }

    /// Materializes one entity node from its row subset. The first row stands
    /// in for all single-valued columns; multi-valued children pick their own
    /// rows out of the subset.
    fn materialize(&self, node: &StructureNode, rows: &[&ResultRow]) -> Result<Json> {
        let row: &ResultRow = rows.first().ok_or_else(|| {
            RowfoldError::DataIntegrity("cannot materialize an entity from zero rows".to_string())
        })?;
        let node_len = node.path().len();
        let mut object = JsonMap::new();

        if let Some(id) = node.id_column() {
            let alias = column_alias(id.path());
            let value = required_value(row, &alias)?;
            if value.is_null() {
                return Err(RowfoldError::DataIntegrity(format!(
                    "NULL identifier in column `{alias}` for a present entity"
                )));
            }
            insert_nested(&mut object, relative(id.path(), node_len), value.to_json());
        }

        for leaf in node.columns() {
            let alias = column_alias(leaf.path());
            let value = required_value(row, &alias)?;
            insert_nested(&mut object, relative(leaf.path(), node_len), value.to_json());
        }

        let mut child_paths: Vec<SmallVec<[&str; 8]>> = Vec::new();
        for child in node.children() {
            let value = match child.kind() {
                NodeKind::Root => {
                    return Err(RowfoldError::DataIntegrity(
                        "root node nested inside the structure tree".to_string(),
                    ));
                }
                NodeKind::Join => {
                    let id = child.id_column().ok_or_else(|| {
                        RowfoldError::DataIntegrity(format!(
                            "join node `{}` has no identifier column",
                            child.path()
                        ))
                    })?;
                    let alias = column_alias(id.path());
                    if required_value(row, &alias)?.is_null() {
                        Json::Null
                    } else {
                        self.materialize(child, rows)?
                    }
                }
                NodeKind::Partition { map, .. } => self.materialize_partition(child, map, rows)?,
            };
            let rel = relative(child.path(), node_len);
            child_paths.push(rel.clone());
            insert_nested(&mut object, rel, value);
        }

        // an embedded value object with NULL leaves and absent children was absent
        collapse_absent_embedded(&mut object, &child_paths);

        Ok(Json::Object(object))
    }

    /// Sub-groups a multi-valued branch by row number, de-duplicating rows
    /// the sibling flattening multiplied, in ascending row-number order.
    fn materialize_partition(
        &self,
        node: &StructureNode,
        is_map: bool,
        rows: &[&ResultRow],
    ) -> Result<Json> {
        let rn_alias = row_number_alias(node.path());

        let mut elements: BTreeMap<i64, &ResultRow> = BTreeMap::new();
        for row in rows {
            match required_value(row, &rn_alias)? {
                Value::Null => {}
                Value::Integer(rn) => {
                    elements.entry(*rn).or_insert(row);
                }
                other => {
                    return Err(RowfoldError::DataIntegrity(format!(
                        "row-number column `{rn_alias}` holds {other:?}"
                    )));
                }
            }
        }

        if is_map {
            let key_alias = key_alias(node.path());
            let mut map = JsonMap::new();
            for element_row in elements.into_values() {
                let key = match required_value(element_row, &key_alias)? {
                    Value::Text(key) => key.clone(),
                    Value::Integer(key) => key.to_string(),
                    Value::Null => {
                        return Err(RowfoldError::DataIntegrity(format!(
                            "NULL map key in column `{key_alias}`"
                        )));
                    }
                    other => {
                        return Err(RowfoldError::DataIntegrity(format!(
                            "unsupported map key {other:?} in column `{key_alias}`"
                        )));
                    }
                };
                map.insert(key, self.materialize_element(node, element_row, rows)?);
            }
            Ok(Json::Object(map))
        } else {
            let mut list = Vec::with_capacity(elements.len());
            for element_row in elements.into_values() {
                list.push(self.materialize_element(node, element_row, rows)?);
            }
            Ok(Json::Array(list))
        }
    }

    fn materialize_element(
        &self,
        node: &StructureNode,
        element_row: &ResultRow,
        rows: &[&ResultRow],
    ) -> Result<Json> {
        if node.is_scalar_element() {
            let leaf = node.columns().first().ok_or_else(|| {
                RowfoldError::DataIntegrity(format!(
                    "value partition `{}` has no value column",
                    node.path()
                ))
            })?;
            return Ok(required_value(element_row, &column_alias(leaf.path()))?.to_json());
        }

        let id = node.id_column().ok_or_else(|| {
            RowfoldError::DataIntegrity(format!(
                "partition node `{}` has no identifier column",
                node.path()
            ))
        })?;
        let id_alias = column_alias(id.path());
        let element_id = required_value(element_row, &id_alias)?;
        if element_id.is_null() {
            return Err(RowfoldError::DataIntegrity(format!(
                "row number present without identifier in column `{id_alias}`"
            )));
        }

        let subset: Vec<&ResultRow> = rows
            .iter()
            .copied()
            .filter(|r| r.get(&id_alias) == Some(element_id))
            .collect();
        self.materialize(node, &subset)
    }
}

fn required_value<'r>(row: &'r ResultRow, alias: &str) -> Result<&'r Value> {
    row.get(alias).ok_or_else(|| {
        RowfoldError::DataIntegrity(format!("result row is missing column `{alias}`"))
    })
}

/// Path segments below the owning node, for nesting embedded leaves.
fn relative<'p>(path: &'p crate::path::AggregatePath, node_len: usize) -> SmallVec<[&'p str; 8]> {
    let mut names = path.segment_names();
    names.drain(..node_len);
    names
}

fn insert_nested(object: &mut JsonMap<String, Json>, segments: SmallVec<[&str; 8]>, value: Json) {
    insert_nested_slice(object, &segments, value);
}

fn insert_nested_slice(object: &mut JsonMap<String, Json>, segments: &[&str], value: Json) {
    match segments {
        [] => {}
        [leaf] => {
            object.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = object
                .entry((*head).to_string())
                .or_insert_with(|| Json::Object(JsonMap::new()));
            if !entry.is_object() {
                *entry = Json::Object(JsonMap::new());
            }
            if let Json::Object(nested) = entry {
                insert_nested_slice(nested, rest, value);
            }
        }
    }
}

/// Collapses embedded value objects that were wholly absent: every scalar
/// leaf NULL, every entity child absent, every nested collection empty.
///
/// `children` holds the relative paths where join and partition values were
/// attached. Those values are opaque here: a join object or a map result must
/// never be mistaken for an embedded object and recursed into, it only counts
/// towards the absence check of the embedded object enclosing it.
fn collapse_absent_embedded(object: &mut JsonMap<String, Json>, children: &[SmallVec<[&str; 8]>]) {
    for (key, value) in object.iter_mut() {
        let Json::Object(nested) = value else { continue };
        if children.iter().any(|path| path.len() == 1 && path[0] == key.as_str()) {
            continue;
        }

        let stripped: Vec<SmallVec<[&str; 8]>> = children
            .iter()
            .filter(|path| path.len() > 1 && path[0] == key.as_str())
            .map(|path| path[1..].iter().copied().collect())
            .collect();
        collapse_absent_embedded(nested, &stripped);

        let absent = nested.iter().all(|(nested_key, nested_value)| {
            if stripped
                .iter()
                .any(|path| path.len() == 1 && path[0] == nested_key.as_str())
            {
                is_absent_branch(nested_value)
            } else {
                nested_value.is_null()
            }
        });
        if absent {
            *value = Json::Null;
        }
    }
}

/// Whether a join or partition value stands for "nothing there".
fn is_absent_branch(value: &Json) -> bool {
    match value {
        Json::Null => true,
        Json::Array(elements) => elements.is_empty(),
        Json::Object(entries) => entries.is_empty(),
        _ => false,
    }
}
