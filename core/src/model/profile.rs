use hashbrown::HashMap;

use crate::model::{EntityValueCombination, ResponseFieldDescriptor};
use crate::values::Numeric;

/// One respondent's answers.
pub trait Profile {
    /// The stored answer for `field` at exactly `combination`, which spans the
    /// field's own entity types. Unanswered combinations are null.
    fn field_value(
        &self,
        field: &ResponseFieldDescriptor,
        combination: &EntityValueCombination,
    ) -> Numeric;
}

/// A respondent who answered nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProfile;

impl Profile for EmptyProfile {
    fn field_value(&self, _: &ResponseFieldDescriptor, _: &EntityValueCombination) -> Numeric {
        Numeric::NULL
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryProfile {
    id: i64,
    answers: HashMap<String, HashMap<EntityValueCombination, i32>>,
}

impl InMemoryProfile {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            answers: HashMap::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn with_answer(
        mut self,
        field: &ResponseFieldDescriptor,
        combination: EntityValueCombination,
        value: i32,
    ) -> Self {
        self.set_answer(field.name(), combination, value);
        self
    }

    pub fn set_answer(
        &mut self,
        field_name: &str,
        combination: EntityValueCombination,
        value: i32,
    ) {
        self.answers
            .entry(field_name.to_string())
            .or_default()
            .insert(combination, value);
    }
}

impl Profile for InMemoryProfile {
    fn field_value(
        &self,
        field: &ResponseFieldDescriptor,
        combination: &EntityValueCombination,
    ) -> Numeric {
        self.answers
            .get(field.name())
            .and_then(|by_combination| by_combination.get(combination))
            .copied()
            .into()
    }
}
