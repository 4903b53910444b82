//! Tests for the list aggregates

use super::*;
use pretty_assertions::assert_eq;

fn nums(values: &[Option<i32>]) -> Vec<Numeric> {
    values.iter().copied().map(Numeric::from).collect()
}

#[test]
fn test_len_counts_nulls() {
    assert_eq!(len(&nums(&[Some(1), None, Some(3)])), Ok(Numeric::new(3)));
    assert_eq!(len(&[]), Ok(Numeric::new(0)));
}

#[test]
fn test_min_max() {
    let values = nums(&[Some(4), Some(-2), Some(9)]);
    assert_eq!(min(&values, None), Ok(Numeric::new(-2)));
    assert_eq!(max(&values, None), Ok(Numeric::new(9)));
    assert_eq!(max(&values, Some(Numeric::new(100))), Ok(Numeric::new(9)));
}

#[test]
fn test_min_max_empty_needs_default() {
    assert_eq!(
        min(&[], None),
        Err(EvalError::EmptyAggregate { function: "min" })
    );
    assert_eq!(max(&[], Some(Numeric::NULL)), Ok(Numeric::NULL));
    assert_eq!(min(&[], Some(Numeric::new(0))), Ok(Numeric::new(0)));
}

#[test]
fn test_min_rejects_null_elements() {
    assert!(min(&nums(&[Some(1), None]), None).is_err());
}

#[test]
fn test_sum() {
    assert_eq!(sum(&nums(&[Some(1), Some(2), Some(3)])), Ok(Numeric::new(6)));
    assert_eq!(sum(&[]), Ok(Numeric::new(0)));
    assert_eq!(
        sum(&nums(&[Some(1), None])),
        Err(EvalError::domain("unsupported operand None for 'sum'"))
    );
    assert!(sum(&nums(&[Some(i32::MAX), Some(1)])).is_err());
}

#[test]
fn test_any_uses_truthiness() {
    assert_eq!(any(&nums(&[None, Some(0)])), Numeric::FALSE);
    assert_eq!(any(&nums(&[None, Some(2)])), Numeric::TRUE);
    assert_eq!(any(&[]), Numeric::FALSE);
}

#[test]
fn test_count_and_contains() {
    let values = nums(&[Some(1), None, Some(1), Some(2)]);
    assert_eq!(count(&values, Numeric::new(1)), Ok(Numeric::new(2)));
    assert_eq!(count(&values, Numeric::NULL), Ok(Numeric::new(1)));
    assert!(contains(&values, Numeric::new(2)));
    assert!(!contains(&values, Numeric::new(5)));
}
