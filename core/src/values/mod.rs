//! Runtime values produced by compiled expressions.

pub mod numeric;

pub use numeric::Numeric;
