//! Two-stage curried reducers.
//!
//! A compiled expression is an [`EntitiesReducer`]: given an entity context
//! it yields a [`RespondentReducer`], which given a respondent yields a value.
//! Both stages keep a `Constant` variant so that work which does not depend
//! on the context runs once at compile time, and work which does not depend
//! on the respondent runs once per context.

mod combinators;

use core::fmt;
use std::sync::Arc;

use crate::api::EvalError;
use crate::memory::{Memory, MemoryPool};
use crate::model::{EntityValueCombination, Profile};
use crate::values::Numeric;

pub use combinators::{and, fold, lift1, lift2, lift3, lift_all, map, or, ternary, zip2};

/// Per-respondent evaluation state.
pub struct EvalContext<'a> {
    pub profile: &'a dyn Profile,
    pub pool: &'a mut MemoryPool,
    /// Value bound to the comprehension variable currently in scope.
    pub arg0: Numeric,
}

impl<'a> EvalContext<'a> {
    pub fn new(profile: &'a dyn Profile, pool: &'a mut MemoryPool) -> Self {
        Self {
            profile,
            pool,
            arg0: Numeric::NULL,
        }
    }
}

pub type RespondentFn<T> =
    Arc<dyn Fn(&mut EvalContext<'_>) -> Result<T, EvalError> + Send + Sync>;

pub type EntitiesFn<T> = Arc<
    dyn Fn(&EntityValueCombination) -> Result<RespondentReducer<T>, EvalError> + Send + Sync,
>;

/// Values a reducer can produce.
pub trait ReducerValue: Clone + Send + Sync + 'static {
    /// Makes the value independent of `pool`, so it can be kept as a constant
    /// after the pool is reset.
    fn detach(self, _pool: &MemoryPool) -> Self {
        self
    }
}

impl ReducerValue for Numeric {}

impl ReducerValue for bool {}

impl ReducerValue for Memory {
    fn detach(self, pool: &MemoryPool) -> Self {
        self.into_shared(pool)
    }
}

/// Second stage: a value, or a function of one respondent.
#[derive(Clone)]
pub enum RespondentReducer<T> {
    Constant(T),
    Func(RespondentFn<T>),
}

impl<T: ReducerValue> RespondentReducer<T> {
    pub fn func(
        f: impl Fn(&mut EvalContext<'_>) -> Result<T, EvalError> + Send + Sync + 'static,
    ) -> Self {
        RespondentReducer::Func(Arc::new(f))
    }

    /// A reducer that fails with `error` for every respondent.
    pub fn failing(error: EvalError) -> Self {
        RespondentReducer::func(move |_| Err(error.clone()))
    }

    #[inline]
    pub fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<T, EvalError> {
        match self {
            RespondentReducer::Constant(value) => Ok(value.clone()),
            RespondentReducer::Func(f) => f(ctx),
        }
    }

    pub fn as_constant(&self) -> Option<&T> {
        match self {
            RespondentReducer::Constant(value) => Some(value),
            RespondentReducer::Func(_) => None,
        }
    }
}

/// First stage: a value, a function of the respondent only, or a function
/// of the entity context that returns the second stage.
#[derive(Clone)]
pub enum EntitiesReducer<T> {
    Constant(T),
    ForRespondent(RespondentFn<T>),
    ForEntities(EntitiesFn<T>),
}

impl<T: ReducerValue> EntitiesReducer<T> {
    pub fn for_respondent(
        f: impl Fn(&mut EvalContext<'_>) -> Result<T, EvalError> + Send + Sync + 'static,
    ) -> Self {
        EntitiesReducer::ForRespondent(Arc::new(f))
    }

    pub fn for_entities(
        f: impl Fn(&EntityValueCombination) -> Result<RespondentReducer<T>, EvalError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        EntitiesReducer::ForEntities(Arc::new(f))
    }

    pub fn from_respondent(reducer: RespondentReducer<T>) -> Self {
        match reducer {
            RespondentReducer::Constant(value) => EntitiesReducer::Constant(value),
            RespondentReducer::Func(f) => EntitiesReducer::ForRespondent(f),
        }
    }

    /// Specializes for one entity context.
    pub fn for_context(
        &self,
        combination: &EntityValueCombination,
    ) -> Result<RespondentReducer<T>, EvalError> {
        match self {
            EntitiesReducer::Constant(value) => Ok(RespondentReducer::Constant(value.clone())),
            EntitiesReducer::ForRespondent(f) => Ok(RespondentReducer::Func(f.clone())),
            EntitiesReducer::ForEntities(f) => f(combination),
        }
    }

    /// The second stage, when it does not depend on the context.
    pub fn context_free(&self) -> Option<RespondentReducer<T>> {
        match self {
            EntitiesReducer::Constant(value) => Some(RespondentReducer::Constant(value.clone())),
            EntitiesReducer::ForRespondent(f) => Some(RespondentReducer::Func(f.clone())),
            EntitiesReducer::ForEntities(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&T> {
        match self {
            EntitiesReducer::Constant(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RespondentReducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespondentReducer::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            RespondentReducer::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for EntitiesReducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitiesReducer::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            EntitiesReducer::ForRespondent(_) => f.write_str("ForRespondent(..)"),
            EntitiesReducer::ForEntities(_) => f.write_str("ForEntities(..)"),
        }
    }
}

static_assertions::assert_impl_all!(EntitiesReducer<Numeric>: Send, Sync);
static_assertions::assert_impl_all!(RespondentReducer<Memory>: Send, Sync);
