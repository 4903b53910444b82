//! Command implementations.
//!
//! Each subcommand has its own module with a `run` function.

pub mod check;
pub mod eval;
pub mod instances;

use fieldexpr::{CompiledVariable, Engine, Numeric};

use crate::cli::ExpressionArgs;
use crate::common::{CliError, CliResult};

/// Snippet name for the expression given on the command line.
pub const EXPRESSION_NAME: &str = "<expression>";

/// The command-line expression, compiled as a filter or as a metric.
pub enum Compiled {
    Filter(CompiledVariable<bool>),
    /// `None` for a blank metric.
    Metric(Option<CompiledVariable<Numeric>>),
}

pub fn compile(engine: &Engine, args: &ExpressionArgs) -> CliResult<Compiled> {
    let compiled = if args.boolean {
        engine
            .parse_boolean(&args.expression)
            .map(Compiled::Filter)
    } else {
        engine
            .parse_numeric_or_null(&args.expression)
            .map(Compiled::Metric)
    };
    compiled.map_err(|error| CliError::expression(EXPRESSION_NAME, error))
}

pub fn format_bool(value: &bool) -> String {
    if *value { "True" } else { "False" }.to_string()
}

pub fn format_numeric(value: &Numeric) -> String {
    value.to_string()
}
