//! [`AggregatePath`]: an addressable position inside an aggregate's property
//! graph, from the root entity down to a leaf property.
//!
//! Paths are immutable values linked through a parent back-reference, so a
//! child path never owns its siblings and walking towards the root is a plain
//! pointer chase. Two paths are equal when their property sequences are equal;
//! `to_dot_path` is the stable string form used for column aliasing.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{Result, RowfoldError};
use crate::schema::{Entity, Multiplicity, Property};

#[derive(Clone)]
pub struct AggregatePath {
    inner: Arc<Inner>,
}

struct Inner {
    root: Arc<Entity>,
    parent: Option<AggregatePath>,
    property: Option<Property>,
    length: usize,
}

impl AggregatePath {
    /// The empty path addressing the aggregate root itself.
    pub fn root(entity: Arc<Entity>) -> Self {
        Self {
            inner: Arc::new(Inner {
                root: entity,
                parent: None,
                property: None,
                length: 0,
            }),
        }
    }

    /// Extends this path by one property of the current leaf entity.
    pub fn append(&self, property: Property) -> Self {
        debug_assert!(
            self.leaf_entity()
                .is_some_and(|e| e.property(property.name()).is_some()),
            "appended property must belong to the leaf entity"
        );
        Self {
            inner: Arc::new(Inner {
                root: self.inner.root.clone(),
                parent: Some(self.clone()),
                property: Some(property),
                length: self.inner.length + 1,
            }),
        }
    }

    pub fn is_root(&self) -> bool {
        self.inner.property.is_none()
    }

    /// Number of property segments; zero for the root path.
    pub fn len(&self) -> usize {
        self.inner.length
    }

    pub fn is_empty(&self) -> bool {
        self.inner.length == 0
    }

    pub fn root_entity(&self) -> &Arc<Entity> {
        &self.inner.root
    }

    pub fn parent(&self) -> Option<&AggregatePath> {
        self.inner.parent.as_ref()
    }

    pub fn required_parent(&self) -> Result<&AggregatePath> {
        self.parent().ok_or_else(|| {
            RowfoldError::Configuration("the root path has no parent".to_string())
        })
    }

    pub fn leaf_property(&self) -> Option<&Property> {
        self.inner.property.as_ref()
    }

    pub fn required_leaf_property(&self) -> Result<&Property> {
        self.leaf_property().ok_or_else(|| {
            RowfoldError::Configuration("the root path has no leaf property".to_string())
        })
    }

    /// The entity at the end of this path: the root entity for the root path,
    /// otherwise the leaf property's target entity, if any.
    pub fn leaf_entity(&self) -> Option<&Arc<Entity>> {
        match self.inner.property.as_ref() {
            None => Some(&self.inner.root),
            Some(property) => property.target(),
        }
    }

    pub fn required_leaf_entity(&self) -> Result<&Arc<Entity>> {
        self.leaf_entity().ok_or_else(|| {
            RowfoldError::Configuration(format!("path `{self}` does not resolve to an entity"))
        })
    }

    /// Identifier property of the leaf entity.
    pub fn required_id_property(&self) -> Result<&Property> {
        self.required_leaf_entity()?.required_id_property()
    }

    /// Path addressing the identifier of the leaf entity.
    pub fn id_path(&self) -> Result<AggregatePath> {
        let id = self.required_id_property()?.clone();
        Ok(self.append(id))
    }

    /// `true` for the root path and for any path whose leaf resolves to an
    /// entity type.
    pub fn is_entity(&self) -> bool {
        self.leaf_entity().is_some()
    }

    pub fn is_embedded(&self) -> bool {
        self.leaf_multiplicity() == Some(Multiplicity::Embedded)
    }

    /// `true` when any segment of the path is a collection or a map, not just
    /// the leaf.
    pub fn is_multi_valued(&self) -> bool {
        let mut current = Some(self);
        while let Some(path) = current {
            if path
                .leaf_property()
                .is_some_and(|p| p.multiplicity().is_multi_valued())
            {
                return true;
            }
            current = path.parent();
        }
        false
    }

    pub fn is_map(&self) -> bool {
        self.leaf_multiplicity() == Some(Multiplicity::Map)
    }

    /// `true` when the leaf carries a qualifier column, i.e. a list index or
    /// a map key.
    pub fn is_qualified(&self) -> bool {
        self.leaf_multiplicity().is_some_and(Multiplicity::is_qualified)
    }

    pub fn is_collection_like(&self) -> bool {
        self.leaf_multiplicity()
            .is_some_and(Multiplicity::is_collection_like)
    }

    pub fn is_ordered(&self) -> bool {
        self.leaf_property().is_some_and(Property::is_ordered)
    }

    /// Walks from this path up through its parents to the root, returning the
    /// first segment satisfying the predicate. Returns `None` when nothing
    /// matches, the root included.
    pub fn filter(&self, predicate: impl Fn(&AggregatePath) -> bool) -> Option<AggregatePath> {
        let mut current = Some(self);
        while let Some(path) = current {
            if predicate(path) {
                return Some(path.clone());
            }
            current = path.parent();
        }
        None
    }

    /// Stable dotted form of the property sequence, empty for the root path.
    pub fn to_dot_path(&self) -> String {
        self.segment_names().join(".")
    }

    fn leaf_multiplicity(&self) -> Option<Multiplicity> {
        self.leaf_property().map(Property::multiplicity)
    }

    /// Property names in root-to-leaf order.
    pub(crate) fn segment_names(&self) -> SmallVec<[&str; 8]> {
        let mut names: SmallVec<[&str; 8]> = SmallVec::new();
        let mut current = Some(self);
        while let Some(path) = current {
            if let Some(property) = path.leaf_property() {
                names.push(property.name());
            }
            current = path.parent();
        }
        names.reverse();
        names
    }
}

impl PartialEq for AggregatePath {
    fn eq(&self, other: &Self) -> bool {
        self.inner.root.name() == other.inner.root.name()
            && self.segment_names() == other.segment_names()
    }
}

impl Eq for AggregatePath {}

impl Hash for AggregatePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.root.name().hash(state);
        for name in self.segment_names() {
            name.hash(state);
        }
    }
}

impl fmt::Display for AggregatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("(root)")
        } else {
            f.write_str(&self.to_dot_path())
        }
    }
}

impl fmt::Debug for AggregatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggregatePath({self})")
    }
}
