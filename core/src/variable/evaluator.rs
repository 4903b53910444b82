use crate::api::EvalError;
use crate::memory::MemoryPool;
use crate::model::{EntityType, Profile};
use crate::reducer::{EvalContext, ReducerValue, RespondentReducer};

/// A compiled variable specialized for one entity context.
///
/// Owns the scratch pool used for list values, so one evaluator should be
/// used per thread. Evaluating is allocation-free once the pool has grown to
/// the size the expression needs.
#[derive(Debug)]
pub struct ContextEvaluator<T> {
    reducer: RespondentReducer<T>,
    pool: MemoryPool,
}

impl<T: ReducerValue> ContextEvaluator<T> {
    pub(crate) fn new(reducer: RespondentReducer<T>, max_pooled_values: usize) -> Self {
        Self {
            reducer,
            pool: MemoryPool::new(max_pooled_values),
        }
    }

    /// Evaluates for one respondent. Resets the scratch pool first.
    pub fn evaluate(&mut self, profile: &dyn Profile) -> Result<T, EvalError> {
        self.pool.free_all();
        let mut ctx = EvalContext::new(profile, &mut self.pool);
        self.reducer.evaluate(&mut ctx)
    }

    /// Evaluates with caller-provided state. The caller owns pool resets.
    pub fn evaluate_with(&self, ctx: &mut EvalContext<'_>) -> Result<T, EvalError> {
        self.reducer.evaluate(ctx)
    }

    /// The value for every respondent, if the context fixed it.
    pub fn constant_value(&self) -> Option<&T> {
        self.reducer.as_constant()
    }

    pub fn reducer(&self) -> &RespondentReducer<T> {
        &self.reducer
    }
}

/// Evaluates a variable with exactly one entity type across every instance of
/// that type, reusing the per-instance specializations.
pub struct SingleDimensionMatcher<T> {
    entity_type: EntityType,
    instances: Vec<(i32, RespondentReducer<T>)>,
    pool: MemoryPool,
}

impl<T: ReducerValue + Default + PartialEq> SingleDimensionMatcher<T> {
    pub(crate) fn new(
        entity_type: EntityType,
        instances: Vec<(i32, RespondentReducer<T>)>,
        max_pooled_values: usize,
    ) -> Self {
        Self {
            entity_type,
            instances,
            pool: MemoryPool::new(max_pooled_values),
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Instance ids whose value is not the default (null, false) and
    /// satisfies `predicate`, in repository order.
    pub fn matches(
        &mut self,
        profile: &dyn Profile,
        predicate: impl Fn(&T) -> bool,
    ) -> Result<Vec<i32>, EvalError> {
        let mut matched = Vec::new();
        for (id, reducer) in &self.instances {
            self.pool.free_all();
            let mut ctx = EvalContext::new(profile, &mut self.pool);
            let value = reducer.evaluate(&mut ctx)?;
            if value != T::default() && predicate(&value) {
                matched.push(*id);
            }
        }
        Ok(matched)
    }
}
