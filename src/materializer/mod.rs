//! Entity materialization: reconstructing typed instances from flat rows.
//!
//! Given an entity type and a resolver that maps persisted properties to
//! return-item positions, the factory produces a pure function from one
//! flat row of scalar values to one constructed instance. Single-table
//! inheritance is honored: the index mapping covers inherited properties
//! first, in the metadata provider's declared order.

use std::collections::HashMap;

use crate::cypher_ir::ReadOnlyQuery;
use crate::metadata::{MetadataProvider, PropertyDef};
use crate::query_model::Value;
use crate::translator::TranslationError;

/// A constructed instance: the concrete entity type plus its property
/// values in effective declaration order.
#[derive(Debug, PartialEq, Clone)]
pub struct EntityInstance {
    pub entity_type: String,
    pub values: Vec<(String, Value)>,
}

impl EntityInstance {
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }
}

/// Pure row → instance function.
pub type Materializer = Box<dyn Fn(&[Value]) -> EntityInstance + Send + Sync>;

/// Ordered array, one entry per persisted property of a concrete type;
/// entry `i` holds the return-item position supplying property `i`.
#[derive(Debug, PartialEq, Clone)]
pub struct IndexMapping(pub Vec<usize>);

/// Build a materializer for `entity`.
///
/// `resolver` is asked once per persisted property, in base-first order,
/// to add or find the return item supplying that property's value in
/// `query`. Exactly one concrete type may exist in the hierarchy; type
/// discrimination among several is unimplemented and fails loudly rather
/// than silently defaulting to the wrong type.
pub fn build(
    entity: &str,
    metadata: &dyn MetadataProvider,
    query: &mut ReadOnlyQuery,
    mut resolver: impl FnMut(&PropertyDef, &mut ReadOnlyQuery) -> Result<usize, TranslationError>,
) -> Result<(Materializer, Option<HashMap<String, IndexMapping>>), TranslationError> {
    let concrete = metadata.concrete_types(entity)?;
    let target = match concrete.len() {
        0 => {
            return Err(TranslationError::Internal(format!(
                "entity type '{}' has no concrete type in its hierarchy",
                entity
            )))
        }
        1 => concrete[0],
        _ => {
            return Err(TranslationError::Internal(format!(
                "type discrimination among multiple concrete types of '{}' is not implemented",
                entity
            )))
        }
    };

    let properties = metadata.properties(&target.name)?;
    let mut mapping = Vec::with_capacity(properties.len());
    for property in &properties {
        mapping.push(resolver(*property, query)?);
    }

    let names: Vec<String> = properties.iter().map(|p| p.name.clone()).collect();
    let type_name = target.name.clone();
    let positions = mapping.clone();
    let materializer: Materializer = Box::new(move |row: &[Value]| EntityInstance {
        entity_type: type_name.clone(),
        values: names
            .iter()
            .zip(&positions)
            .map(|(name, index)| {
                (
                    name.clone(),
                    row.get(*index).cloned().unwrap_or(Value::Null),
                )
            })
            .collect(),
    });

    // A concrete hierarchy root needs no discrimination map; a single
    // concrete leaf below an abstract root still reports its own mapping.
    let is_root = target.base.is_none();
    let type_mappings = if is_root {
        None
    } else {
        let mut map = HashMap::new();
        map.insert(target.name.clone(), IndexMapping(mapping));
        Some(map)
    };

    Ok((materializer, type_mappings))
}
