//! Lowers parsed expressions into reducers.
//!
//! Every sub-expression is either numeric (a nullable integer per respondent)
//! or enumerable (a list of them, held in [`Memory`](crate::memory::Memory)).
//! Which one is decided syntactically by [`shape`]; a list where a number is
//! expected, or the other way round, is a compile error.

mod enumerable;
mod numeric;
mod response;

use core::cell::Cell;

use crate::api::{CompileOptions, Diagnostic, Error, EvalError};
use crate::parser::{AnnotatedSource, Argument, ComplexityLimit, Expr, ParsedExpr};
use crate::reducer::{EntitiesReducer, ReducerValue};
use crate::resolve::ParsingNameContext;
use crate::stdlib::Method;
use crate::values::Numeric;

const COMPILE_ERROR: &str = "C001";
const UNRESOLVED: &str = "E002";

/// Compiles a parsed expression into a numeric reducer.
///
/// Unresolved identifiers do not fail compilation; they are reported to
/// `names` and compiled into reducers that fail when evaluated.
pub fn compile<'a>(
    parsed: &ParsedExpr<'a>,
    names: &mut dyn ParsingNameContext,
    options: &CompileOptions,
) -> Result<EntitiesReducer<Numeric>, Error> {
    Compiler::new(parsed.ann, options).numeric(names, parsed.expr)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Numeric,
    Enumerable,
    Dictionary,
}

/// Classifies `expr` without resolving any names.
pub(crate) fn shape<'a>(expr: &'a Expr<'a>) -> Shape {
    match *expr.ungrouped() {
        Expr::List(_) | Expr::Comprehension { .. } => Shape::Enumerable,
        Expr::Dict(_) => Shape::Dictionary,
        Expr::If {
            then_branch,
            else_branch,
            ..
        } => {
            if shape(then_branch) == Shape::Enumerable || shape(else_branch) == Shape::Enumerable {
                Shape::Enumerable
            } else {
                Shape::Numeric
            }
        }
        Expr::Call { callable, args } => match *callable.ungrouped() {
            Expr::Attribute { value, .. } if is_name(value, "response") => Shape::Enumerable,
            Expr::Attribute { value, attr } if Method::from_name(attr) == Some(Method::Get) => {
                lookup_shape(value, args)
            }
            _ => Shape::Numeric,
        },
        _ => Shape::Numeric,
    }
}

// `{...}.get(key, default)` yields lists when any value or the default does.
fn lookup_shape<'a>(receiver: &'a Expr<'a>, args: &'a [Argument<'a>]) -> Shape {
    let values_enumerable = match *receiver.ungrouped() {
        Expr::Dict(entries) => entries
            .iter()
            .any(|&(_, value)| shape(value) == Shape::Enumerable),
        _ => false,
    };
    let default_enumerable = args
        .get(1)
        .is_some_and(|arg| shape(arg.value) == Shape::Enumerable);
    if values_enumerable || default_enumerable {
        Shape::Enumerable
    } else {
        Shape::Numeric
    }
}

pub(crate) fn is_name(expr: &Expr<'_>, name: &str) -> bool {
    matches!(*expr.ungrouped(), Expr::Ident(ident) if ident == name)
}

pub(crate) struct Compiler<'a> {
    ann: &'a AnnotatedSource<'a, Expr<'a>>,
    max_numeric_depth: usize,
    depth: Cell<usize>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(ann: &'a AnnotatedSource<'a, Expr<'a>>, options: &CompileOptions) -> Self {
        Self {
            ann,
            max_numeric_depth: options.max_numeric_depth,
            depth: Cell::new(0),
        }
    }

    /// Compile error located at `expr`.
    fn error(&self, expr: &'a Expr<'a>, message: impl Into<String>) -> Error {
        let span = self.ann.span_of(expr).unwrap_or_default();
        Error::syntax(
            Diagnostic::error(message, span, COMPILE_ERROR),
            self.ann.source,
        )
    }

    fn list_where_number_expected(&self, expr: &'a Expr<'a>) -> Error {
        self.error(
            expr,
            "This part of the expression returns a list but should return a single number. \
             Use a list function such as 'max' or 'len'.",
        )
    }

    fn enter(&self) -> Result<usize, Error> {
        let depth = self.depth.get() + 1;
        if depth > self.max_numeric_depth {
            return Err(Error::TooComplex {
                limit: ComplexityLimit::NumericDepth {
                    max: self.max_numeric_depth,
                },
                expression: self.ann.source.to_string(),
            });
        }
        self.depth.set(depth);
        Ok(depth)
    }

    fn leave(&self, depth: usize) {
        self.depth.set(depth - 1);
    }

    /// Reports `message` and returns a placeholder that fails when evaluated.
    fn unresolved<T: ReducerValue>(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
        message: String,
    ) -> EntitiesReducer<T> {
        let span = self.ann.span_of(expr).unwrap_or_default();
        names.report_unresolved(
            Diagnostic::error(message.clone(), span, UNRESOLVED)
                .with_help("Check the spelling, or declare it before using it"),
        );
        let error = EvalError::Unresolved { message };
        EntitiesReducer::for_respondent(move |_| Err(error.clone()))
    }
}
