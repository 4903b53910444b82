//! The `eval` command - evaluate an expression for each respondent.

use fieldexpr::{ContextEvaluator, EmptyProfile, EvalError, InMemoryProfile, Numeric, Profile};
use fieldexpr_core::reducer::ReducerValue;
use tracing::debug;

use super::{Compiled, compile, format_bool, format_numeric};
use crate::cli::EvalArgs;
use crate::common::survey::{Survey, parse_context};
use crate::common::{CliError, CliResult};

/// Run the eval command.
///
/// Without respondents the expression is evaluated once against an empty
/// profile and only the value is printed.
pub fn run(args: EvalArgs) -> CliResult<()> {
    let loaded = Survey::read(args.expression.survey.as_deref())?.load()?;
    let context = parse_context(loaded.engine.repository().as_ref(), &args.context)?;
    let respondents = select(&loaded.respondents, args.respondent)?;
    debug!(context = %context, respondents = respondents.len(), "Evaluating");

    match compile(&loaded.engine, &args.expression)? {
        Compiled::Filter(variable) => report(
            variable.specialize_for_context(&context)?,
            &respondents,
            format_bool,
        ),
        Compiled::Metric(Some(variable)) => report(
            variable.specialize_for_context(&context)?,
            &respondents,
            format_numeric,
        ),
        Compiled::Metric(None) => {
            let blank = Numeric::NULL;
            print_all(&respondents, |_| Ok(format_numeric(&blank)))
        }
    }
}

fn select(
    respondents: &[InMemoryProfile],
    only: Option<i64>,
) -> CliResult<Vec<&InMemoryProfile>> {
    let Some(id) = only else {
        return Ok(respondents.iter().collect());
    };
    respondents
        .iter()
        .find(|respondent| respondent.id() == id)
        .map(|respondent| vec![respondent])
        .ok_or_else(|| CliError::survey(format!("no respondent with id {}", id)))
}

fn report<T: ReducerValue>(
    mut evaluator: ContextEvaluator<T>,
    respondents: &[&InMemoryProfile],
    format: fn(&T) -> String,
) -> CliResult<()> {
    print_all(respondents, |profile| {
        evaluator.evaluate(profile).map(|value| format(&value))
    })
}

fn print_all(
    respondents: &[&InMemoryProfile],
    mut evaluate: impl FnMut(&dyn Profile) -> Result<String, EvalError>,
) -> CliResult<()> {
    if respondents.is_empty() {
        println!("{}", evaluate(&EmptyProfile)?);
        return Ok(());
    }
    for respondent in respondents {
        let id = respondent.id();
        let value = evaluate(*respondent).map_err(|error| CliError::Respondent { id, error })?;
        println!("respondent {}: {}", id, value);
    }
    Ok(())
}
