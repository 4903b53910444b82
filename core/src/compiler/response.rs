//! `response.X(dim=value, ...)`: raw answers of a field or values of a
//! variable across a cartesian product of entity instances.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use smallvec::{SmallVec, smallvec};

use super::{Compiler, Shape, shape};
use crate::api::options::DEFAULT_MAX_POOLED_VALUES;
use crate::api::{Error, EvalError};
use crate::memory::{Memory, MemoryPool};
use crate::model::{
    EntityRepository, EntityType, EntityValue, EntityValueCombination, ResponseFieldDescriptor,
};
use crate::parser::{Argument, Expr};
use crate::reducer::{EntitiesReducer, EvalContext, RespondentReducer, lift1, lift_all, map};
use crate::resolve::{ParsingNameContext, Resolved, Usage};
use crate::values::Numeric;
use crate::variable::CompiledVariable;

impl<'a> Compiler<'a> {
    pub(super) fn response_call(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
        attr: &'a str,
        args: &'a [Argument<'a>],
    ) -> Result<EntitiesReducer<Memory>, Error> {
        let source = match names.lookup(attr, Usage::ResponseSource) {
            Resolved::Field(field) => Source::Field(field),
            Resolved::Variable(variable) => Source::Variable(variable),
            Resolved::BoundVariable => {
                return Err(self.error(
                    expr,
                    format!("'{attr}' is a comprehension variable, not a response field"),
                ));
            }
            Resolved::Unresolved(message) => return Ok(self.unresolved(names, expr, message)),
        };
        let entity_types = source.entity_types().to_vec();

        let mut selections: Vec<Option<EntitiesReducer<Memory>>> = vec![None; entity_types.len()];
        for arg in args {
            let Some(name) = arg.name else {
                return Err(self.error(
                    arg.value,
                    format!(
                        "Arguments to response.{attr}() must name an entity type, e.g. response.{attr}(brand=1)"
                    ),
                ));
            };
            let Some(index) = entity_types.iter().position(|t| t.matches_name(name)) else {
                return Err(self.error(
                    arg.value,
                    format!("response.{attr}() has no entity type '{name}'"),
                ));
            };
            if selections[index].is_some() {
                return Err(self.error(
                    arg.value,
                    format!("Entity type '{name}' is given more than once"),
                ));
            }
            selections[index] = Some(self.selection(names, arg.value)?);
        }

        let repository = names.repository();
        let selections: Vec<EntitiesReducer<Memory>> = selections
            .into_iter()
            .zip(&entity_types)
            .map(|(selection, entity_type)| {
                selection.unwrap_or_else(|| all_instances(repository, entity_type))
            })
            .collect();
        let template = EntityValueCombination::new(
            entity_types
                .iter()
                .map(|entity_type| EntityValue::new(entity_type.clone(), 0)),
        )?;

        Ok(match source {
            Source::Field(field) => lift_all(selections, move |selections| {
                read_field(field.clone(), template.clone(), selections)
            }),
            Source::Variable(variable) => lift_all(selections, move |selections| {
                read_variable(&variable, &template, selections)
            }),
        })
    }

    /// Instance ids chosen for one entity type: a single id or a list.
    fn selection(
        &self,
        names: &mut dyn ParsingNameContext,
        value: &'a Expr<'a>,
    ) -> Result<EntitiesReducer<Memory>, Error> {
        match shape(value) {
            Shape::Enumerable => self.enumerable(names, value),
            Shape::Numeric => {
                let id = self.numeric(names, value)?;
                Ok(lift1(id, |r| map(r, single)))
            }
            Shape::Dictionary => Err(self.error(
                value,
                "Dictionary literals can only be used with '.get', e.g. {1: [2, 3]}.get(Field1)",
            )),
        }
    }
}

enum Source {
    Field(Arc<ResponseFieldDescriptor>),
    Variable(Arc<CompiledVariable<Numeric>>),
}

impl Source {
    fn entity_types(&self) -> &[EntityType] {
        match self {
            Source::Field(field) => field.entity_types(),
            Source::Variable(variable) => variable.entity_types(),
        }
    }
}

fn single(ctx: &mut EvalContext<'_>, id: Numeric) -> Result<Memory, EvalError> {
    if id.is_null() {
        return Ok(Memory::empty());
    }
    let slot = ctx.pool.rent(1)?;
    ctx.pool.slice_mut(slot)[0] = id;
    Ok(Memory::Pooled(slot))
}

fn all_instances(
    repository: &dyn EntityRepository,
    entity_type: &EntityType,
) -> EntitiesReducer<Memory> {
    let ids = repository.instance_ids(entity_type);
    EntitiesReducer::Constant(Memory::from_values(ids.iter().map(|&id| Numeric::new(id))))
}

fn product_len(selections: &[Memory], limit: usize) -> Result<usize, EvalError> {
    selections
        .iter()
        .try_fold(1usize, |total, selection| total.checked_mul(selection.len()))
        .filter(|total| *total <= limit)
        .ok_or(EvalError::ResourceExceeded { limit })
}

/// Walks the cartesian product of the selections, last entity type fastest.
struct Odometer {
    index: SmallVec<[usize; 4]>,
    done: bool,
}

impl Odometer {
    fn new(selections: &[Memory]) -> Self {
        Self {
            index: smallvec![0; selections.len()],
            done: selections.iter().any(Memory::is_empty),
        }
    }

    /// Writes the current ids into `combination`. False when one is null.
    fn load(
        &self,
        selections: &[Memory],
        pool: &MemoryPool,
        combination: &mut EntityValueCombination,
    ) -> bool {
        for (position, (selection, &index)) in selections.iter().zip(&self.index).enumerate() {
            match selection.get(index, pool).value() {
                Some(id) => combination.set_id_at(position, id),
                None => return false,
            }
        }
        true
    }

    fn advance(&mut self, selections: &[Memory]) {
        for position in (0..self.index.len()).rev() {
            self.index[position] += 1;
            if self.index[position] < selections[position].len() {
                return;
            }
            self.index[position] = 0;
        }
        self.done = true;
    }
}

fn evaluate_selections(
    ctx: &mut EvalContext<'_>,
    selections: &[RespondentReducer<Memory>],
) -> Result<SmallVec<[Memory; 4]>, EvalError> {
    let mut memories = SmallVec::with_capacity(selections.len());
    for selection in selections {
        memories.push(selection.evaluate(ctx)?);
    }
    Ok(memories)
}

// Unanswered combinations are skipped.
fn read_field(
    field: Arc<ResponseFieldDescriptor>,
    template: EntityValueCombination,
    selections: Vec<RespondentReducer<Memory>>,
) -> RespondentReducer<Memory> {
    RespondentReducer::func(move |ctx| {
        let memories = evaluate_selections(ctx, &selections)?;
        let out = ctx.pool.rent(product_len(&memories, ctx.pool.capacity())?)?;
        let profile = ctx.profile;
        let mut combination = template.clone();
        let mut odometer = Odometer::new(&memories);
        let mut written = 0;
        while !odometer.done {
            if odometer.load(&memories, ctx.pool, &mut combination) {
                let value = profile.field_value(&field, &combination);
                if !value.is_null() {
                    ctx.pool.slice_mut(out)[written] = value;
                    written += 1;
                }
            }
            odometer.advance(&memories);
        }
        Ok(Memory::Pooled(ctx.pool.shrink(out, written)))
    })
}

// Null values are skipped like unanswered fields.
fn read_variable(
    variable: &Arc<CompiledVariable<Numeric>>,
    template: &EntityValueCombination,
    selections: Vec<RespondentReducer<Memory>>,
) -> RespondentReducer<Memory> {
    let constant: Option<Vec<Memory>> = selections
        .iter()
        .map(|selection| selection.as_constant().cloned())
        .collect();
    if let Some(memories) = constant {
        return specialize_each(variable, template, &memories);
    }

    let variable = variable.clone();
    let template = template.clone();
    let specialized = Specialized::default();
    RespondentReducer::func(move |ctx| {
        let memories = evaluate_selections(ctx, &selections)?;
        let out = ctx.pool.rent(product_len(&memories, ctx.pool.capacity())?)?;
        let mut combination = template.clone();
        let mut odometer = Odometer::new(&memories);
        let mut written = 0;
        while !odometer.done {
            if odometer.load(&memories, ctx.pool, &mut combination) {
                let value = specialized.get(&variable, &combination)?.evaluate(ctx)?;
                if !value.is_null() {
                    ctx.pool.slice_mut(out)[written] = value;
                    written += 1;
                }
            }
            odometer.advance(&memories);
        }
        Ok(Memory::Pooled(ctx.pool.shrink(out, written)))
    })
}

const MAX_SPECIALIZED_COMBINATIONS: usize = 1024;

/// Specializations of one variable, shared by every respondent evaluated in
/// the same context.
#[derive(Default)]
struct Specialized {
    reducers: Mutex<ReducersByCombination>,
}

type ReducersByCombination = HashMap<EntityValueCombination, RespondentReducer<Numeric>>;

impl Specialized {
    fn get(
        &self,
        variable: &CompiledVariable<Numeric>,
        combination: &EntityValueCombination,
    ) -> Result<RespondentReducer<Numeric>, EvalError> {
        if let Some(reducer) = self.lock().get(combination) {
            return Ok(reducer.clone());
        }
        let reducer = variable.reducer().for_context(combination)?;
        let mut reducers = self.lock();
        if reducers.len() < MAX_SPECIALIZED_COMBINATIONS {
            reducers.insert(combination.clone(), reducer.clone());
        }
        Ok(reducer)
    }

    fn lock(&self) -> MutexGuard<'_, ReducersByCombination> {
        self.reducers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Every combination is known up front, so the variable is specialized for
/// each one now rather than per respondent.
fn specialize_each(
    variable: &CompiledVariable<Numeric>,
    template: &EntityValueCombination,
    memories: &[Memory],
) -> RespondentReducer<Memory> {
    if let Err(error) = product_len(memories, DEFAULT_MAX_POOLED_VALUES) {
        return RespondentReducer::failing(error);
    }
    let shared = MemoryPool::new(0);
    let mut combination = template.clone();
    let mut odometer = Odometer::new(memories);
    let mut reducers = Vec::new();
    while !odometer.done {
        if odometer.load(memories, &shared, &mut combination) {
            reducers.push(
                variable
                    .reducer()
                    .for_context(&combination)
                    .unwrap_or_else(RespondentReducer::failing),
            );
        }
        odometer.advance(memories);
    }

    let constants: Option<Vec<Numeric>> = reducers
        .iter()
        .map(|reducer| reducer.as_constant().copied())
        .collect();
    if let Some(values) = constants {
        return RespondentReducer::Constant(Memory::from_values(
            values.into_iter().filter(|value| !value.is_null()),
        ));
    }
    RespondentReducer::func(move |ctx| {
        let out = ctx.pool.rent(reducers.len())?;
        let mut written = 0;
        for reducer in &reducers {
            let value = reducer.evaluate(ctx)?;
            if !value.is_null() {
                ctx.pool.slice_mut(out)[written] = value;
                written += 1;
            }
        }
        Ok(Memory::Pooled(ctx.pool.shrink(out, written)))
    })
}
