//! Aggregates over list values.

use crate::api::EvalError;
use crate::values::Numeric;

pub fn len(values: &[Numeric]) -> Result<Numeric, EvalError> {
    i32::try_from(values.len())
        .map(Numeric::new)
        .map_err(|_| EvalError::domain("list is too long for len()"))
}

/// Smallest element, or `default` when `values` is empty.
pub fn min(values: &[Numeric], default: Option<Numeric>) -> Result<Numeric, EvalError> {
    extreme(values, default, "min", |candidate, best| candidate < best)
}

/// Largest element, or `default` when `values` is empty.
pub fn max(values: &[Numeric], default: Option<Numeric>) -> Result<Numeric, EvalError> {
    extreme(values, default, "max", |candidate, best| candidate > best)
}

fn extreme(
    values: &[Numeric],
    default: Option<Numeric>,
    function: &'static str,
    better: fn(i32, i32) -> bool,
) -> Result<Numeric, EvalError> {
    let mut best: Option<i32> = None;
    for value in values {
        let Some(v) = value.value() else {
            return Err(EvalError::domain(format!(
                "{}() is not supported between None and an integer",
                function
            )));
        };
        best = match best {
            Some(b) if !better(v, b) => Some(b),
            _ => Some(v),
        };
    }
    match (best, default) {
        (Some(b), _) => Ok(Numeric::new(b)),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(EvalError::EmptyAggregate { function }),
    }
}

pub fn sum(values: &[Numeric]) -> Result<Numeric, EvalError> {
    let mut total: i32 = 0;
    for value in values {
        let v = value
            .value()
            .ok_or_else(|| EvalError::domain("unsupported operand None for 'sum'"))?;
        total = total
            .checked_add(v)
            .ok_or_else(|| EvalError::domain("integer overflow in 'sum'"))?;
    }
    Ok(Numeric::new(total))
}

/// True when any element is truthy; null and zero are not.
pub fn any(values: &[Numeric]) -> Numeric {
    Numeric::from_bool(values.iter().any(|v| v.is_truthy()))
}

/// Number of elements equal to `target`, null included.
pub fn count(values: &[Numeric], target: Numeric) -> Result<Numeric, EvalError> {
    let n = values.iter().filter(|v| **v == target).count();
    i32::try_from(n)
        .map(Numeric::new)
        .map_err(|_| EvalError::domain("list is too long for count()"))
}

pub fn contains(values: &[Numeric], target: Numeric) -> bool {
    values.contains(&target)
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod aggregate_test;
