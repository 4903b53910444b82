use crate::model::EntityType;

/// Metadata for a raw collected value.
///
/// A field may be entity-scoped (one answer per brand, per brand and
/// product, ...). Its entity types are kept sorted by identifier, matching
/// the order of [`EntityValueCombination`](crate::model::EntityValueCombination).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFieldDescriptor {
    name: String,
    entity_types: Vec<EntityType>,
}

impl ResponseFieldDescriptor {
    pub fn new(
        name: impl Into<String>,
        entity_types: impl IntoIterator<Item = EntityType>,
    ) -> Self {
        let mut entity_types: Vec<EntityType> = entity_types.into_iter().collect();
        entity_types.sort();
        entity_types.dedup();
        Self {
            name: name.into(),
            entity_types,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_types(&self) -> &[EntityType] {
        &self.entity_types
    }
}
