//! Compiled variables and their evaluators.

mod evaluator;
mod registry;

use core::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::api::{EvalError, RunOptions, RunOptionsOverride};
use crate::model::{
    EntityRepository, EntityType, EntityValue, EntityValueCombination, Profile,
    ResponseFieldDescriptor,
};
use crate::reducer::{EntitiesReducer, ReducerValue, lift1, map};
use crate::resolve::Dependencies;
use crate::values::Numeric;

pub use evaluator::{ContextEvaluator, SingleDimensionMatcher};
pub use registry::{DeclaredItem, Registry};

/// A compiled expression together with everything it depends on.
///
/// `T` is [`Numeric`] for metric variables and `bool` for filters. Compiled
/// variables are immutable and can be shared across threads; evaluation goes
/// through a [`ContextEvaluator`] obtained from
/// [`specialize_for_context`](Self::specialize_for_context).
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fieldexpr_core::api::{Engine, EngineOptions};
/// use fieldexpr_core::model::{EmptyProfile, EntityValueCombination, InMemoryEntityRepository};
///
/// let engine = Engine::new(EngineOptions::default(), Arc::new(InMemoryEntityRepository::new()));
/// let variable = engine.parse_numeric_or_null("2 ** 10").unwrap().unwrap();
///
/// let mut evaluator = variable
///     .specialize_for_context(&EntityValueCombination::empty())
///     .unwrap();
/// assert_eq!(evaluator.evaluate(&EmptyProfile).unwrap().value(), Some(1024));
/// ```
#[derive(Clone)]
pub struct CompiledVariable<T> {
    identifier: String,
    expression: String,
    reducer: EntitiesReducer<T>,
    fields: Vec<Arc<ResponseFieldDescriptor>>,
    variable_dependencies: Vec<String>,
    entity_types: Vec<EntityType>,
    result_entity_types: Vec<EntityType>,
    repository: Arc<dyn EntityRepository>,
    run_options: RunOptions,
}

impl<T: ReducerValue> CompiledVariable<T> {
    pub(crate) fn new(
        identifier: impl Into<String>,
        expression: impl Into<String>,
        reducer: EntitiesReducer<T>,
        dependencies: Dependencies,
        repository: Arc<dyn EntityRepository>,
        run_options: RunOptions,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            expression: expression.into(),
            reducer,
            fields: dependencies.fields,
            variable_dependencies: dependencies.variable_dependencies,
            entity_types: dependencies.entity_types,
            result_entity_types: dependencies.result_entity_types,
            repository,
            run_options,
        }
    }

    /// A variable with no dependencies that always yields `value`.
    pub(crate) fn constant(
        identifier: impl Into<String>,
        value: T,
        repository: Arc<dyn EntityRepository>,
        run_options: RunOptions,
    ) -> Self {
        Self::new(
            identifier,
            "",
            EntitiesReducer::Constant(value),
            Dependencies::default(),
            repository,
            run_options,
        )
    }

    /// Declared name; empty for anonymous expressions such as filters.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn reducer(&self) -> &EntitiesReducer<T> {
        &self.reducer
    }

    /// Response fields read directly or through other variables.
    pub fn fields(&self) -> &[Arc<ResponseFieldDescriptor>] {
        &self.fields
    }

    /// Identifiers of every variable this one reads, transitively.
    pub fn variable_dependencies(&self) -> &[String] {
        &self.variable_dependencies
    }

    /// Entity types the value varies over, sorted. A context must provide a
    /// value for each of them.
    pub fn entity_types(&self) -> &[EntityType] {
        &self.entity_types
    }

    /// Entity types referenced as `result.X`.
    pub fn result_entity_types(&self) -> &[EntityType] {
        &self.result_entity_types
    }

    /// The value, when it depends on neither context nor respondent.
    pub fn constant_value(&self) -> Option<&T> {
        self.reducer.as_constant()
    }

    pub fn is_single_dimension(&self) -> bool {
        self.entity_types.len() == 1
    }

    pub fn depends_on(&self, identifier: &str) -> bool {
        self.variable_dependencies
            .iter()
            .any(|dependency| dependency.eq_ignore_ascii_case(identifier))
    }

    /// Prepares evaluation for one context. The context may carry more entity
    /// types than the variable needs but not fewer.
    pub fn specialize_for_context(
        &self,
        combination: &EntityValueCombination,
    ) -> Result<ContextEvaluator<T>, EvalError> {
        self.specialize_for_context_with(combination, &RunOptionsOverride::default())
    }

    pub fn specialize_for_context_with(
        &self,
        combination: &EntityValueCombination,
        options_override: &RunOptionsOverride,
    ) -> Result<ContextEvaluator<T>, EvalError> {
        if let Some(missing) = combination.first_missing(&self.entity_types) {
            return Err(combination.mismatch(missing));
        }
        trace!(
            expression = %self.expression,
            context = %combination,
            "Specializing for context"
        );
        let mut options = self.run_options.clone();
        options.override_with(options_override);
        let reducer = self.reducer.for_context(combination)?;
        Ok(ContextEvaluator::new(reducer, options.max_pooled_values))
    }
}

impl CompiledVariable<Numeric> {
    /// The same variable read as a filter: truthy values become `true`.
    pub(crate) fn into_boolean(self) -> CompiledVariable<bool> {
        let reducer = lift1(self.reducer, |r| map(r, |_, value: Numeric| Ok(value.is_truthy())));
        CompiledVariable {
            identifier: self.identifier,
            expression: self.expression,
            reducer,
            fields: self.fields,
            variable_dependencies: self.variable_dependencies,
            entity_types: self.entity_types,
            result_entity_types: self.result_entity_types,
            repository: self.repository,
            run_options: self.run_options,
        }
    }
}

impl<T: ReducerValue + Default + PartialEq> CompiledVariable<T> {
    /// Specializes once per instance of the single entity type.
    pub fn single_dimension_matcher(&self) -> Result<SingleDimensionMatcher<T>, EvalError> {
        let [entity_type] = self.entity_types.as_slice() else {
            return Err(EvalError::NotSingleDimension {
                expression: self.expression.clone(),
            });
        };
        let ids = self.repository.instance_ids(entity_type);
        let mut instances = Vec::with_capacity(ids.len());
        for &id in ids.iter() {
            let combination =
                EntityValueCombination::new([EntityValue::new(entity_type.clone(), id)])?;
            instances.push((id, self.reducer.for_context(&combination)?));
        }
        Ok(SingleDimensionMatcher::new(
            entity_type.clone(),
            instances,
            self.run_options.max_pooled_values,
        ))
    }

    /// Instances of the single entity type for which `profile` yields a
    /// non-default value accepted by `predicate`.
    pub fn matching_instances_for_single_dimension(
        &self,
        profile: &dyn Profile,
        predicate: impl Fn(&T) -> bool,
    ) -> Result<Vec<i32>, EvalError> {
        self.single_dimension_matcher()?.matches(profile, predicate)
    }
}

impl<T: fmt::Debug> fmt::Debug for CompiledVariable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledVariable")
            .field("identifier", &self.identifier)
            .field("expression", &self.expression)
            .field("reducer", &self.reducer)
            .field("entity_types", &self.entity_types)
            .field("variable_dependencies", &self.variable_dependencies)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(CompiledVariable<Numeric>: Send, Sync);
static_assertions::assert_impl_all!(CompiledVariable<bool>: Send, Sync);
static_assertions::assert_impl_all!(ContextEvaluator<Numeric>: Send);
