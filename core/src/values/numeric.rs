//! Nullable 32-bit integer with Python-flavoured arithmetic.

use core::fmt;

use crate::api::EvalError;
use crate::parser::{BinaryOp, ComparisonOp};

/// A nullable integer, the only scalar type in the expression language.
///
/// `None` literals and unanswered fields are represented by [`Numeric::NULL`].
/// Booleans are encoded as `1`/`0`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Numeric(Option<i32>);

static_assertions::assert_eq_size!(Numeric, u64);

impl Numeric {
    pub const NULL: Numeric = Numeric(None);
    pub const TRUE: Numeric = Numeric(Some(1));
    pub const FALSE: Numeric = Numeric(Some(0));

    pub const fn new(value: i32) -> Self {
        Numeric(Some(value))
    }

    pub const fn from_option(value: Option<i32>) -> Self {
        Numeric(value)
    }

    pub const fn from_bool(value: bool) -> Self {
        if value { Self::TRUE } else { Self::FALSE }
    }

    pub const fn value(self) -> Option<i32> {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0.is_none()
    }

    /// Non-null and non-zero.
    pub const fn is_truthy(self) -> bool {
        matches!(self.0, Some(v) if v != 0)
    }

    pub fn negate(self) -> Result<Numeric, EvalError> {
        let v = self.require("-")?;
        v.checked_neg()
            .map(Numeric::new)
            .ok_or_else(|| EvalError::domain("integer overflow in '-'"))
    }

    pub fn invert(self) -> Result<Numeric, EvalError> {
        Ok(Numeric::new(!self.require("~")?))
    }

    /// Unary `+` is the identity but still rejects null like the other operators.
    pub fn positive(self) -> Result<Numeric, EvalError> {
        self.require("+").map(Numeric::new)
    }

    pub fn binary(self, op: BinaryOp, rhs: Numeric) -> Result<Numeric, EvalError> {
        let (a, b) = match (self.0, rhs.0) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(EvalError::domain(format!(
                    "unsupported operand None for '{}'",
                    op
                )));
            }
        };
        let overflow = || EvalError::domain(format!("integer overflow in '{}'", op));
        let result = match op {
            BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
            BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
            BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
            BinaryOp::Div | BinaryOp::FloorDiv => floor_div(a, b, op)?,
            BinaryOp::Mod => python_mod(a, b)?,
            BinaryOp::Pow => {
                if b < 0 {
                    return Err(EvalError::domain(
                        "negative exponents are not supported for integers",
                    ));
                }
                a.checked_pow(b as u32).ok_or_else(overflow)?
            }
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            BinaryOp::BitXor => a ^ b,
            BinaryOp::Shl => {
                if b < 0 {
                    return Err(EvalError::domain("negative shift count"));
                }
                if a == 0 {
                    0
                } else if b >= 32 {
                    return Err(overflow());
                } else {
                    i32::try_from((a as i64) << b).map_err(|_| overflow())?
                }
            }
            BinaryOp::Shr => {
                if b < 0 {
                    return Err(EvalError::domain("negative shift count"));
                }
                a >> b.min(31)
            }
        };
        Ok(Numeric::new(result))
    }

    /// Scalar comparison. Equality tolerates null, ordering does not.
    ///
    /// `in`/`not in` are handled by the caller since their right operand is a list.
    pub fn compare(self, op: ComparisonOp, rhs: Numeric) -> Result<bool, EvalError> {
        match op {
            ComparisonOp::Eq | ComparisonOp::Is => Ok(self == rhs),
            ComparisonOp::Neq | ComparisonOp::IsNot => Ok(self != rhs),
            ComparisonOp::Lt | ComparisonOp::Le | ComparisonOp::Gt | ComparisonOp::Ge => {
                let (Some(a), Some(b)) = (self.0, rhs.0) else {
                    return Err(EvalError::domain(format!(
                        "'{}' is not supported between None and an integer",
                        op
                    )));
                };
                Ok(match op {
                    ComparisonOp::Lt => a < b,
                    ComparisonOp::Le => a <= b,
                    ComparisonOp::Gt => a > b,
                    _ => a >= b,
                })
            }
            ComparisonOp::In | ComparisonOp::NotIn => Err(EvalError::domain(format!(
                "'{}' requires a list on the right-hand side",
                op
            ))),
        }
    }

    fn require(self, op: &str) -> Result<i32, EvalError> {
        self.0
            .ok_or_else(|| EvalError::domain(format!("unsupported operand None for '{}'", op)))
    }
}

fn floor_div(a: i32, b: i32, op: BinaryOp) -> Result<i32, EvalError> {
    if b == 0 {
        return Err(EvalError::domain("division by zero"));
    }
    let q = a
        .checked_div(b)
        .ok_or_else(|| EvalError::domain(format!("integer overflow in '{}'", op)))?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

// Result takes the sign of the divisor.
fn python_mod(a: i32, b: i32) -> Result<i32, EvalError> {
    if b == 0 {
        return Err(EvalError::domain("modulo by zero"));
    }
    let r = a.checked_rem(b).unwrap_or(0);
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

impl From<i32> for Numeric {
    fn from(value: i32) -> Self {
        Numeric::new(value)
    }
}

impl From<Option<i32>> for Numeric {
    fn from(value: Option<i32>) -> Self {
        Numeric(value)
    }
}

impl From<bool> for Numeric {
    fn from(value: bool) -> Self {
        Numeric::from_bool(value)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => f.write_str("None"),
        }
    }
}

impl fmt::Debug for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bin(a: i32, op: BinaryOp, b: i32) -> Result<Numeric, EvalError> {
        Numeric::new(a).binary(op, Numeric::new(b))
    }

    #[test]
    fn floor_division_rounds_towards_negative_infinity() {
        assert_eq!(bin(7, BinaryOp::FloorDiv, 2), Ok(Numeric::new(3)));
        assert_eq!(bin(-7, BinaryOp::FloorDiv, 2), Ok(Numeric::new(-4)));
        assert_eq!(bin(7, BinaryOp::Div, -2), Ok(Numeric::new(-4)));
        assert_eq!(bin(-8, BinaryOp::Div, 2), Ok(Numeric::new(-4)));
    }

    #[test]
    fn modulo_takes_sign_of_divisor() {
        assert_eq!(bin(7, BinaryOp::Mod, 3), Ok(Numeric::new(1)));
        assert_eq!(bin(-7, BinaryOp::Mod, 3), Ok(Numeric::new(2)));
        assert_eq!(bin(7, BinaryOp::Mod, -3), Ok(Numeric::new(-2)));
    }

    #[test]
    fn division_by_zero_is_domain_error() {
        assert!(matches!(
            bin(1, BinaryOp::Div, 0),
            Err(EvalError::Domain { .. })
        ));
        assert!(matches!(
            bin(1, BinaryOp::Mod, 0),
            Err(EvalError::Domain { .. })
        ));
    }

    #[test]
    fn overflow_is_domain_error() {
        assert!(bin(i32::MAX, BinaryOp::Add, 1).is_err());
        assert!(bin(i32::MIN, BinaryOp::FloorDiv, -1).is_err());
        assert!(bin(2, BinaryOp::Pow, 40).is_err());
        assert!(bin(1, BinaryOp::Shl, 40).is_err());
        assert!(Numeric::new(i32::MIN).negate().is_err());
    }

    #[test]
    fn power_and_shifts() {
        assert_eq!(bin(2, BinaryOp::Pow, 10), Ok(Numeric::new(1024)));
        assert_eq!(bin(0, BinaryOp::Pow, 0), Ok(Numeric::new(1)));
        assert!(bin(2, BinaryOp::Pow, -1).is_err());
        assert_eq!(bin(1, BinaryOp::Shl, 4), Ok(Numeric::new(16)));
        assert_eq!(bin(-16, BinaryOp::Shr, 2), Ok(Numeric::new(-4)));
        assert_eq!(bin(-1, BinaryOp::Shr, 40), Ok(Numeric::new(-1)));
        assert!(bin(1, BinaryOp::Shr, -1).is_err());
    }

    #[test]
    fn null_operands() {
        assert!(Numeric::NULL.binary(BinaryOp::Add, Numeric::new(1)).is_err());
        assert_eq!(Numeric::NULL.compare(ComparisonOp::Eq, Numeric::NULL), Ok(true));
        assert_eq!(
            Numeric::NULL.compare(ComparisonOp::Neq, Numeric::new(0)),
            Ok(true)
        );
        assert!(Numeric::NULL.compare(ComparisonOp::Lt, Numeric::new(0)).is_err());
    }

    #[test]
    fn truthiness() {
        assert!(!Numeric::NULL.is_truthy());
        assert!(!Numeric::new(0).is_truthy());
        assert!(Numeric::new(-3).is_truthy());
        assert_eq!(Numeric::from(true), Numeric::new(1));
    }

    #[test]
    fn display() {
        assert_eq!(Numeric::NULL.to_string(), "None");
        assert_eq!(Numeric::new(-12).to_string(), "-12");
    }
}
