//! Expression front-end: pest grammar, Pratt precedence and complexity limits.

mod error;
mod limits;
mod parsed_expr;
#[allow(clippy::module_inception)]
mod parser;
mod syntax;

pub use error::{ParseError, ParseErrorKind};
pub use limits::{
    ComplexityLimit, DEFAULT_MAX_DEPTH, DEFAULT_MAX_EXPRESSION_LENGTH, DEFAULT_MAX_NODES,
    ParseLimits,
};
pub use parsed_expr::{
    Argument, BinaryOp, BoolOp, ComparisonOp, ComprehensionKind, Expr, Literal, ParsedExpr,
    UnaryOp,
};
pub use parser::{ExpressionParser, Rule, parse, parse_with_limits};
pub use syntax::{AnnotatedSource, Span};
