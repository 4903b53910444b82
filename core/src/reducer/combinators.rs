use crate::api::EvalError;
use crate::api::options::DEFAULT_MAX_POOLED_VALUES;
use crate::memory::MemoryPool;
use crate::model::EmptyProfile;
use crate::reducer::{EntitiesReducer, EvalContext, ReducerValue, RespondentReducer};
use crate::values::Numeric;

/// Evaluates `f` now, on scratch memory with no respondent.
///
/// Only call this with closures whose inputs are all constants. A failure is
/// kept and replayed for every respondent instead of failing compilation.
pub fn fold<U: ReducerValue>(
    f: impl FnOnce(&mut EvalContext<'_>) -> Result<U, EvalError>,
) -> RespondentReducer<U> {
    let mut pool = MemoryPool::new(DEFAULT_MAX_POOLED_VALUES);
    let result = {
        let mut ctx = EvalContext::new(&EmptyProfile, &mut pool);
        f(&mut ctx)
    };
    match result {
        Ok(value) => RespondentReducer::Constant(value.detach(&pool)),
        Err(error) => RespondentReducer::failing(error),
    }
}

pub fn map<A, U>(
    a: RespondentReducer<A>,
    f: impl Fn(&mut EvalContext<'_>, A) -> Result<U, EvalError> + Send + Sync + 'static,
) -> RespondentReducer<U>
where
    A: ReducerValue,
    U: ReducerValue,
{
    match a {
        RespondentReducer::Constant(value) => fold(|ctx| f(ctx, value)),
        RespondentReducer::Func(get) => RespondentReducer::func(move |ctx| {
            let value = get(ctx)?;
            f(ctx, value)
        }),
    }
}

pub fn zip2<A, B, U>(
    a: RespondentReducer<A>,
    b: RespondentReducer<B>,
    f: impl Fn(&mut EvalContext<'_>, A, B) -> Result<U, EvalError> + Send + Sync + 'static,
) -> RespondentReducer<U>
where
    A: ReducerValue,
    B: ReducerValue,
    U: ReducerValue,
{
    match (a, b) {
        (RespondentReducer::Constant(x), RespondentReducer::Constant(y)) => {
            fold(|ctx| f(ctx, x, y))
        }
        (a, b) => RespondentReducer::func(move |ctx| {
            let x = a.evaluate(ctx)?;
            let y = b.evaluate(ctx)?;
            f(ctx, x, y)
        }),
    }
}

/// Applies `build` once if `a` ignores the context, otherwise once per context.
pub fn lift1<A, U>(
    a: EntitiesReducer<A>,
    build: impl Fn(RespondentReducer<A>) -> RespondentReducer<U> + Send + Sync + 'static,
) -> EntitiesReducer<U>
where
    A: ReducerValue,
    U: ReducerValue,
{
    match a.context_free() {
        Some(ra) => EntitiesReducer::from_respondent(build(ra)),
        None => EntitiesReducer::for_entities(move |combo| Ok(build(a.for_context(combo)?))),
    }
}

pub fn lift2<A, B, U>(
    a: EntitiesReducer<A>,
    b: EntitiesReducer<B>,
    build: impl Fn(RespondentReducer<A>, RespondentReducer<B>) -> RespondentReducer<U>
    + Send
    + Sync
    + 'static,
) -> EntitiesReducer<U>
where
    A: ReducerValue,
    B: ReducerValue,
    U: ReducerValue,
{
    match (a.context_free(), b.context_free()) {
        (Some(ra), Some(rb)) => EntitiesReducer::from_respondent(build(ra, rb)),
        _ => EntitiesReducer::for_entities(move |combo| {
            Ok(build(a.for_context(combo)?, b.for_context(combo)?))
        }),
    }
}

pub fn lift3<A, B, C, U>(
    a: EntitiesReducer<A>,
    b: EntitiesReducer<B>,
    c: EntitiesReducer<C>,
    build: impl Fn(
        RespondentReducer<A>,
        RespondentReducer<B>,
        RespondentReducer<C>,
    ) -> RespondentReducer<U>
    + Send
    + Sync
    + 'static,
) -> EntitiesReducer<U>
where
    A: ReducerValue,
    B: ReducerValue,
    C: ReducerValue,
    U: ReducerValue,
{
    match (a.context_free(), b.context_free(), c.context_free()) {
        (Some(ra), Some(rb), Some(rc)) => EntitiesReducer::from_respondent(build(ra, rb, rc)),
        _ => EntitiesReducer::for_entities(move |combo| {
            Ok(build(
                a.for_context(combo)?,
                b.for_context(combo)?,
                c.for_context(combo)?,
            ))
        }),
    }
}

pub fn lift_all<A, U>(
    items: Vec<EntitiesReducer<A>>,
    build: impl Fn(Vec<RespondentReducer<A>>) -> RespondentReducer<U> + Send + Sync + 'static,
) -> EntitiesReducer<U>
where
    A: ReducerValue,
    U: ReducerValue,
{
    let context_free: Option<Vec<_>> = items.iter().map(EntitiesReducer::context_free).collect();
    match context_free {
        Some(reducers) => EntitiesReducer::from_respondent(build(reducers)),
        None => EntitiesReducer::for_entities(move |combo| {
            let reducers = items
                .iter()
                .map(|item| item.for_context(combo))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(build(reducers))
        }),
    }
}

/// `a and b`: yields `a` when it is falsy, otherwise `b`.
pub fn and(a: EntitiesReducer<Numeric>, b: EntitiesReducer<Numeric>) -> EntitiesReducer<Numeric> {
    short_circuit(a, b, |v| !v.is_truthy())
}

/// `a or b`: yields `a` when it is truthy, otherwise `b`.
pub fn or(a: EntitiesReducer<Numeric>, b: EntitiesReducer<Numeric>) -> EntitiesReducer<Numeric> {
    short_circuit(a, b, Numeric::is_truthy)
}

// `b` is only specialized or evaluated when `a` does not decide the result.
fn short_circuit(
    a: EntitiesReducer<Numeric>,
    b: EntitiesReducer<Numeric>,
    decides: fn(Numeric) -> bool,
) -> EntitiesReducer<Numeric> {
    if let EntitiesReducer::Constant(value) = a {
        return if decides(value) {
            EntitiesReducer::Constant(value)
        } else {
            b
        };
    }
    if let (Some(ra), Some(rb)) = (a.context_free(), b.context_free()) {
        return EntitiesReducer::from_respondent(respondent_short_circuit(ra, rb, decides));
    }
    EntitiesReducer::for_entities(move |combo| {
        let ra = a.for_context(combo)?;
        match ra {
            RespondentReducer::Constant(value) if decides(value) => Ok(ra),
            RespondentReducer::Constant(_) => b.for_context(combo),
            RespondentReducer::Func(_) => Ok(respondent_short_circuit(
                ra,
                b.for_context(combo)?,
                decides,
            )),
        }
    })
}

fn respondent_short_circuit(
    a: RespondentReducer<Numeric>,
    b: RespondentReducer<Numeric>,
    decides: fn(Numeric) -> bool,
) -> RespondentReducer<Numeric> {
    match a {
        RespondentReducer::Constant(value) if decides(value) => a,
        RespondentReducer::Constant(_) => b,
        RespondentReducer::Func(get) => RespondentReducer::func(move |ctx| {
            let value = get(ctx)?;
            if decides(value) {
                Ok(value)
            } else {
                b.evaluate(ctx)
            }
        }),
    }
}

/// `then if cond else otherwise`; only the chosen branch is evaluated.
pub fn ternary<T: ReducerValue>(
    cond: EntitiesReducer<Numeric>,
    then: EntitiesReducer<T>,
    otherwise: EntitiesReducer<T>,
) -> EntitiesReducer<T> {
    if let EntitiesReducer::Constant(c) = cond {
        return if c.is_truthy() { then } else { otherwise };
    }
    if let (Some(rc), Some(rt), Some(re)) = (
        cond.context_free(),
        then.context_free(),
        otherwise.context_free(),
    ) {
        return EntitiesReducer::from_respondent(respondent_ternary(rc, rt, re));
    }
    EntitiesReducer::for_entities(move |combo| {
        let rc = cond.for_context(combo)?;
        if let RespondentReducer::Constant(c) = rc {
            return if c.is_truthy() {
                then.for_context(combo)
            } else {
                otherwise.for_context(combo)
            };
        }
        Ok(respondent_ternary(
            rc,
            then.for_context(combo)?,
            otherwise.for_context(combo)?,
        ))
    })
}

fn respondent_ternary<T: ReducerValue>(
    cond: RespondentReducer<Numeric>,
    then: RespondentReducer<T>,
    otherwise: RespondentReducer<T>,
) -> RespondentReducer<T> {
    match cond {
        RespondentReducer::Constant(c) => {
            if c.is_truthy() {
                then
            } else {
                otherwise
            }
        }
        RespondentReducer::Func(get) => RespondentReducer::func(move |ctx| {
            if get(ctx)?.is_truthy() {
                then.evaluate(ctx)
            } else {
                otherwise.evaluate(ctx)
            }
        }),
    }
}
