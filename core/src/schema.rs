//! Runtime entity metadata: what an aggregate looks like before any SQL exists.
//!
//! Entities are described by the caller through [`Entity::builder`] and shared
//! as `Arc<Entity>` values. The description is immutable once built; everything
//! downstream (paths, structure, SQL) is derived from it and cached.

use std::sync::Arc;

use compact_str::{CompactString, format_compact};

use crate::error::{Result, RowfoldError};

/// How many values a property holds, and how they relate to the owning table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Multiplicity {
    /// A single column on the owning table.
    Scalar,
    /// A value object whose leaves are inlined into the owning table.
    Embedded,
    /// A single-valued association stored in its own table.
    One,
    /// Zero or more values keyed by a positional index.
    List,
    /// Zero or more values without order or key.
    Set,
    /// Zero or more values keyed by a map key.
    Map,
}

impl Multiplicity {
    pub const fn is_multi_valued(self) -> bool {
        matches!(self, Self::List | Self::Set | Self::Map)
    }

    /// List and Map elements carry a qualifier (index or key) column.
    pub const fn is_qualified(self) -> bool {
        matches!(self, Self::List | Self::Map)
    }

    pub const fn is_collection_like(self) -> bool {
        matches!(self, Self::List | Self::Set)
    }
}

/// A single mapped property of an [`Entity`].
#[derive(Clone, Debug)]
pub struct Property {
    name: CompactString,
    multiplicity: Multiplicity,
    ordered: bool,
    target: Option<Arc<Entity>>,
}

impl Property {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    /// Whether the declared order of the values is meaningful. Only lists can
    /// be ordered.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// The entity this property points at. `None` for scalars and for
    /// collections or maps of plain values.
    pub fn target(&self) -> Option<&Arc<Entity>> {
        self.target.as_ref()
    }

    /// Whether the property resolves to an entity type.
    pub fn is_entity(&self) -> bool {
        self.target.is_some()
    }

    /// Physical column name on the owning table. Identical to the property
    /// name; embedded leaves get prefixed during structure building.
    pub fn column_name(&self) -> &str {
        &self.name
    }

    /// Physical name of the qualifier column (list index or map key) on the
    /// value table.
    pub fn key_column(&self) -> CompactString {
        format_compact!("{}_key", self.name)
    }
}

/// A mapped aggregate type: identifier plus an ordered set of properties.
#[derive(Debug)]
pub struct Entity {
    name: CompactString,
    id: Option<CompactString>,
    properties: Vec<Property>,
}

impl Entity {
    pub fn builder(name: impl Into<CompactString>) -> EntityBuilder {
        EntityBuilder {
            name: name.into(),
            id: None,
            properties: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical table name. Derived from the entity name.
    pub fn table_name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn id_property(&self) -> Option<&Property> {
        let id = self.id.as_deref()?;
        self.property(id)
    }

    pub fn required_id_property(&self) -> Result<&Property> {
        self.id_property().ok_or_else(|| {
            RowfoldError::Configuration(format!(
                "entity `{}` has no identifier property",
                self.name
            ))
        })
    }
}

/// Builder for [`Entity`] values.
///
/// Property order is preserved and determines column order in the generated
/// query.
pub struct EntityBuilder {
    name: CompactString,
    id: Option<CompactString>,
    properties: Vec<Property>,
}

impl EntityBuilder {
    /// Adds a scalar property and marks it as the identifier.
    pub fn id(mut self, name: impl Into<CompactString>) -> Self {
        let name = name.into();
        self.id = Some(name.clone());
        self.properties.push(Property {
            name,
            multiplicity: Multiplicity::Scalar,
            ordered: false,
            target: None,
        });
        self
    }

    pub fn scalar(mut self, name: impl Into<CompactString>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::Scalar,
            ordered: false,
            target: None,
        });
        self
    }

    pub fn embedded(mut self, name: impl Into<CompactString>, target: Arc<Entity>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::Embedded,
            ordered: false,
            target: Some(target),
        });
        self
    }

    /// Single-valued association to another entity.
    pub fn one(mut self, name: impl Into<CompactString>, target: Arc<Entity>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::One,
            ordered: false,
            target: Some(target),
        });
        self
    }

    /// List of entities without meaningful order.
    pub fn list(mut self, name: impl Into<CompactString>, target: Arc<Entity>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::List,
            ordered: false,
            target: Some(target),
        });
        self
    }

    /// List of entities whose declared order must survive a round trip.
    pub fn ordered_list(mut self, name: impl Into<CompactString>, target: Arc<Entity>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::List,
            ordered: true,
            target: Some(target),
        });
        self
    }

    pub fn set(mut self, name: impl Into<CompactString>, target: Arc<Entity>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::Set,
            ordered: false,
            target: Some(target),
        });
        self
    }

    pub fn map(mut self, name: impl Into<CompactString>, target: Arc<Entity>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::Map,
            ordered: false,
            target: Some(target),
        });
        self
    }

    /// List of plain values stored in a dedicated value table.
    pub fn scalar_list(mut self, name: impl Into<CompactString>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::List,
            ordered: false,
            target: None,
        });
        self
    }

    /// Ordered list of plain values.
    pub fn ordered_scalar_list(mut self, name: impl Into<CompactString>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::List,
            ordered: true,
            target: None,
        });
        self
    }

    /// Map of plain values keyed by the qualifier column.
    pub fn scalar_map(mut self, name: impl Into<CompactString>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            multiplicity: Multiplicity::Map,
            ordered: false,
            target: None,
        });
        self
    }

    pub fn build(self) -> Arc<Entity> {
        Arc::new(Entity {
            name: self.name,
            id: self.id,
            properties: self.properties,
        })
    }
}
