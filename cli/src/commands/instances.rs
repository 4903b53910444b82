//! The `instances` command - for an expression over exactly one entity type,
//! list the instances each respondent's value holds for.

use fieldexpr::{CompiledVariable, InMemoryProfile};
use fieldexpr_core::reducer::ReducerValue;

use super::{Compiled, compile};
use crate::cli::InstancesArgs;
use crate::common::survey::Survey;
use crate::common::{CliError, CliResult};

/// Run the instances command.
pub fn run(args: InstancesArgs) -> CliResult<()> {
    let loaded = Survey::read(args.expression.survey.as_deref())?.load()?;
    match compile(&loaded.engine, &args.expression)? {
        Compiled::Filter(variable) => report(&variable, &loaded.respondents),
        Compiled::Metric(Some(variable)) => report(&variable, &loaded.respondents),
        Compiled::Metric(None) => Err(CliError::survey("a blank expression has no instances")),
    }
}

fn report<T: ReducerValue + Default + PartialEq>(
    variable: &CompiledVariable<T>,
    respondents: &[InMemoryProfile],
) -> CliResult<()> {
    let mut matcher = variable.single_dimension_matcher()?;
    println!("{}", matcher.entity_type());
    for respondent in respondents {
        let id = respondent.id();
        let matched = matcher
            .matches(respondent, |_| true)
            .map_err(|error| CliError::Respondent { id, error })?;
        let matched = if matched.is_empty() {
            "-".to_string()
        } else {
            matched
                .iter()
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("respondent {}: {}", id, matched);
    }
    Ok(())
}
