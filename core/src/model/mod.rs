//! Survey data model: entity types and combinations, field metadata, and the
//! repository and profile seams the engine reads through.

mod entity;
mod field;
mod profile;
mod repository;

pub use entity::{EntityType, EntityValue, EntityValueCombination};
pub use field::ResponseFieldDescriptor;
pub use profile::{EmptyProfile, InMemoryProfile, Profile};
pub use repository::{EntityRepository, InMemoryEntityRepository};
