use core::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::api::EvalError;

/// A named axis responses can be segmented along (Brand, Product, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType {
    identifier: Arc<str>,
}

impl EntityType {
    pub fn new(identifier: impl Into<Arc<str>>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Names in expressions (`result.brand`, `brand=`) ignore case.
    pub fn matches_name(&self, name: &str) -> bool {
        self.identifier.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

/// One instance of an entity type, e.g. `Brand=3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityValue {
    pub entity_type: EntityType,
    pub id: i32,
}

impl EntityValue {
    pub fn new(entity_type: EntityType, id: i32) -> Self {
        Self { entity_type, id }
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.entity_type, self.id)
    }
}

/// A concrete evaluation context: at most one value per entity type, kept
/// sorted by entity type identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EntityValueCombination {
    values: SmallVec<[EntityValue; 4]>,
}

impl EntityValueCombination {
    pub fn new(values: impl IntoIterator<Item = EntityValue>) -> Result<Self, EvalError> {
        let mut values: SmallVec<[EntityValue; 4]> = values.into_iter().collect();
        values.sort_by(|a, b| a.entity_type.cmp(&b.entity_type));
        if let Some(pair) = values
            .windows(2)
            .find(|pair| pair[0].entity_type == pair[1].entity_type)
        {
            return Err(EvalError::DuplicateDimension {
                entity_type: pair[0].entity_type.to_string(),
            });
        }
        Ok(Self { values })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &[EntityValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, entity_type: &EntityType) -> Option<i32> {
        self.values
            .binary_search_by(|v| v.entity_type.cmp(entity_type))
            .ok()
            .map(|index| self.values[index].id)
    }

    pub fn contains_all(&self, entity_types: &[EntityType]) -> bool {
        entity_types.iter().all(|t| self.get(t).is_some())
    }

    /// First of `entity_types` this combination has no value for.
    pub fn first_missing<'t>(&self, entity_types: &'t [EntityType]) -> Option<&'t EntityType> {
        entity_types.iter().find(|t| self.get(t).is_none())
    }

    /// The sub-combination over exactly `entity_types`.
    pub fn restrict_to(&self, entity_types: &[EntityType]) -> Result<Self, EvalError> {
        let mut values = SmallVec::with_capacity(entity_types.len());
        for entity_type in entity_types {
            let id = self
                .get(entity_type)
                .ok_or_else(|| self.mismatch(entity_type))?;
            values.push(EntityValue::new(entity_type.clone(), id));
        }
        values.sort_by(|a: &EntityValue, b: &EntityValue| a.entity_type.cmp(&b.entity_type));
        Ok(Self { values })
    }

    /// Overwrites the id at `index` in sorted order. Used to walk cartesian
    /// products without rebuilding the combination.
    pub fn set_id_at(&mut self, index: usize, id: i32) {
        self.values[index].id = id;
    }

    pub(crate) fn mismatch(&self, entity_type: &EntityType) -> EvalError {
        EvalError::DimensionMismatch {
            entity_type: entity_type.to_string(),
            context: self.to_string(),
        }
    }
}

impl fmt::Display for EntityValueCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn brand() -> EntityType {
        EntityType::new("Brand")
    }

    fn product() -> EntityType {
        EntityType::new("Product")
    }

    #[test]
    fn combination_is_sorted_by_identifier() {
        let combo = EntityValueCombination::new([
            EntityValue::new(product(), 5),
            EntityValue::new(brand(), 3),
        ])
        .unwrap();
        assert_eq!(combo.to_string(), "{Brand=3, Product=5}");
        assert_eq!(combo.get(&brand()), Some(3));
        assert_eq!(combo.get(&EntityType::new("Gender")), None);
    }

    #[test]
    fn duplicate_entity_types_are_rejected() {
        let err = EntityValueCombination::new([
            EntityValue::new(brand(), 3),
            EntityValue::new(brand(), 4),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            EvalError::DuplicateDimension {
                entity_type: "Brand".to_string()
            }
        );
    }

    #[test]
    fn restrict_to_requires_every_type() {
        let combo = EntityValueCombination::new([
            EntityValue::new(brand(), 3),
            EntityValue::new(product(), 5),
        ])
        .unwrap();
        let only_brand = combo.restrict_to(&[brand()]).unwrap();
        assert_eq!(only_brand.to_string(), "{Brand=3}");

        let err = only_brand.restrict_to(&[brand(), product()]).unwrap_err();
        assert_eq!(
            err,
            EvalError::DimensionMismatch {
                entity_type: "Product".to_string(),
                context: "{Brand=3}".to_string(),
            }
        );
        assert!(combo.contains_all(&[product(), brand()]));
        assert_eq!(only_brand.first_missing(&[brand(), product()]), Some(&product()));
    }

    #[test]
    fn names_match_case_insensitively() {
        assert!(brand().matches_name("bRaNd"));
        assert!(!brand().matches_name("brands"));
    }
}
