use std::sync::Arc;

use hashbrown::HashMap;

use crate::model::EntityType;

/// Source of entity types and their known instances.
///
/// Omitted dimensions in `response.Field(...)` calls expand over
/// [`instance_ids`](EntityRepository::instance_ids).
pub trait EntityRepository: Send + Sync {
    /// Looks up an entity type by name, ignoring case.
    fn entity_type(&self, name: &str) -> Option<EntityType>;

    /// Every known instance id of `entity_type`, in ascending order.
    fn instance_ids(&self, entity_type: &EntityType) -> Arc<[i32]>;
}

#[derive(Debug, Default)]
pub struct InMemoryEntityRepository {
    types: HashMap<String, (EntityType, Arc<[i32]>)>,
}

impl InMemoryEntityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_type(mut self, name: &str, ids: impl IntoIterator<Item = i32>) -> Self {
        self.add_entity_type(name, ids);
        self
    }

    pub fn add_entity_type(
        &mut self,
        name: &str,
        ids: impl IntoIterator<Item = i32>,
    ) -> EntityType {
        let mut ids: Vec<i32> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        let entity_type = EntityType::new(name);
        self.types
            .insert(name.to_lowercase(), (entity_type.clone(), ids.into()));
        entity_type
    }
}

impl EntityRepository for InMemoryEntityRepository {
    fn entity_type(&self, name: &str) -> Option<EntityType> {
        self.types
            .get(&name.to_lowercase())
            .map(|(entity_type, _)| entity_type.clone())
    }

    fn instance_ids(&self, entity_type: &EntityType) -> Arc<[i32]> {
        self.types
            .get(&entity_type.identifier().to_lowercase())
            .map(|(_, ids)| ids.clone())
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }
}
