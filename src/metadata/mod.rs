//! Entity metadata collaborator.
//!
//! The translator treats metadata as a capability interface
//! ([`MetadataProvider`]): labels for an entity, its ordered
//! inheritance-aware property list, whether a property maps to a
//! server-side primitive, and the database type name. How the metadata is
//! populated (conventions, attributes, external catalogs) is out of scope;
//! the in-memory [`GraphModel`] implementation exists so the crate is
//! testable stand-alone.
//!
//! Inheritance follows single-table layout: a derived entity shares the
//! labels of its hierarchy root and its effective property list is
//! base-first (inherited properties precede declared ones).

pub mod errors;

pub use errors::MetadataError;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server-side type of a persisted property.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum PropertyType {
    Integer,
    Float,
    Boolean,
    Text,
    /// Not mappable to a server primitive; always evaluated client-side.
    Opaque,
}

impl PropertyType {
    /// Whether values of this type can appear in a generated statement.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, PropertyType::Opaque)
    }

    /// Target database type name, when server-mappable.
    pub fn db_type(&self) -> Option<&'static str> {
        match self {
            PropertyType::Integer => Some("Int64"),
            PropertyType::Float => Some("Float64"),
            PropertyType::Boolean => Some("Bool"),
            PropertyType::Text => Some("String"),
            PropertyType::Opaque => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub value_type: PropertyType,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, value_type: PropertyType) -> Self {
        PropertyDef {
            name: name.into(),
            value_type,
        }
    }
}

/// One entity type. `properties` holds only the members declared on this
/// type; inherited members are resolved through the `base` chain.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    pub labels: Vec<String>,
    pub base: Option<String>,
    pub is_abstract: bool,
    pub properties: Vec<PropertyDef>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        EntityDef {
            labels: vec![name.clone()],
            name,
            base: None,
            is_abstract: false,
            properties: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value_type: PropertyType) -> Self {
        self.properties.push(PropertyDef::new(name, value_type));
        self
    }
}

/// Capability interface the translation core calls into.
pub trait MetadataProvider {
    fn entity(&self, name: &str) -> Result<&EntityDef, MetadataError>;

    /// Labels the graph pattern for this entity must match. For derived
    /// types these are the labels of the hierarchy root.
    fn labels(&self, entity: &str) -> Result<Vec<String>, MetadataError>;

    /// Persisted properties in effective order: base-type properties
    /// first, then declared ones, following the inheritance chain.
    fn properties(&self, entity: &str) -> Result<Vec<&PropertyDef>, MetadataError>;

    /// Concrete (non-abstract) types in the hierarchy rooted at `entity`,
    /// including `entity` itself when concrete. Deterministic order.
    fn concrete_types(&self, entity: &str) -> Result<Vec<&EntityDef>, MetadataError>;
}

/// In-memory metadata model. Built once, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphModel {
    entities: HashMap<String, EntityDef>,
}

impl GraphModel {
    /// Validates base references and label presence, then freezes the model.
    pub fn build(entities: Vec<EntityDef>) -> Result<Self, MetadataError> {
        let map: HashMap<String, EntityDef> = entities
            .into_iter()
            .map(|e| (e.name.clone(), e))
            .collect();

        for entity in map.values() {
            if let Some(base) = &entity.base {
                if !map.contains_key(base) {
                    return Err(MetadataError::UnknownBaseType {
                        entity: entity.name.clone(),
                        base: base.clone(),
                    });
                }
            }
            if entity.labels.is_empty() {
                return Err(MetadataError::MissingLabels(entity.name.clone()));
            }
        }

        let model = GraphModel { entities: map };
        // Walking every chain up front surfaces cycles at build time
        // instead of during query compilation.
        for name in model.entities.keys() {
            model.base_chain(name)?;
        }
        Ok(model)
    }

    /// Inheritance chain root-first, ending with `entity` itself.
    fn base_chain(&self, entity: &str) -> Result<Vec<&EntityDef>, MetadataError> {
        let mut chain = Vec::new();
        let mut current = self.entity(entity)?;
        loop {
            if chain.iter().any(|e: &&EntityDef| e.name == current.name) {
                return Err(MetadataError::InheritanceCycle(entity.to_string()));
            }
            chain.push(current);
            match &current.base {
                Some(base) => current = self.entity(base)?,
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }

    /// Root of the inheritance hierarchy containing `entity`.
    pub fn hierarchy_root(&self, entity: &str) -> Result<&EntityDef, MetadataError> {
        let chain = self.base_chain(entity)?;
        // base_chain never returns an empty list
        Ok(chain[0])
    }

    fn descends_from(&self, entity: &EntityDef, ancestor: &str) -> Result<bool, MetadataError> {
        Ok(self
            .base_chain(&entity.name)?
            .iter()
            .any(|e| e.name == ancestor))
    }
}

impl MetadataProvider for GraphModel {
    fn entity(&self, name: &str) -> Result<&EntityDef, MetadataError> {
        self.entities
            .get(name)
            .ok_or_else(|| MetadataError::UnknownEntity(name.to_string()))
    }

    fn labels(&self, entity: &str) -> Result<Vec<String>, MetadataError> {
        Ok(self.hierarchy_root(entity)?.labels.clone())
    }

    fn properties(&self, entity: &str) -> Result<Vec<&PropertyDef>, MetadataError> {
        let mut properties = Vec::new();
        for entity in self.base_chain(entity)? {
            properties.extend(entity.properties.iter());
        }
        Ok(properties)
    }

    fn concrete_types(&self, entity: &str) -> Result<Vec<&EntityDef>, MetadataError> {
        // Existence check first so unknown names fail with UnknownEntity.
        self.entity(entity)?;
        let mut concrete: Vec<&EntityDef> = Vec::new();
        for candidate in self.entities.values() {
            if !candidate.is_abstract && self.descends_from(candidate, entity)? {
                concrete.push(candidate);
            }
        }
        // HashMap iteration order is not stable; sort for determinism.
        concrete.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(concrete)
    }
}
