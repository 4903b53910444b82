//! The `check` command - compile an expression without evaluating it.

use fieldexpr::{CompiledVariable, EntityType};
use fieldexpr_core::reducer::ReducerValue;

use super::{Compiled, compile, format_bool, format_numeric};
use crate::cli::CheckArgs;
use crate::common::CliResult;
use crate::common::survey::Survey;

/// Run the check command.
pub fn run(args: CheckArgs) -> CliResult<()> {
    let loaded = Survey::read(args.expression.survey.as_deref())?.load()?;
    match compile(&loaded.engine, &args.expression)? {
        Compiled::Filter(variable) => print_summary(&variable, format_bool),
        Compiled::Metric(Some(variable)) => print_summary(&variable, format_numeric),
        Compiled::Metric(None) => println!("OK (blank)"),
    }
    Ok(())
}

fn print_summary<T: ReducerValue>(variable: &CompiledVariable<T>, format: fn(&T) -> String) {
    let fields: Vec<&str> = variable.fields().iter().map(|field| field.name()).collect();
    let variables: Vec<&str> = variable
        .variable_dependencies()
        .iter()
        .map(String::as_str)
        .collect();

    println!("OK");
    println!("entity types: {}", list(&names(variable.entity_types())));
    println!(
        "result entity types: {}",
        list(&names(variable.result_entity_types()))
    );
    println!("fields: {}", list(&fields));
    println!("variables: {}", list(&variables));
    if let Some(value) = variable.constant_value() {
        println!("constant: {}", format(value));
    }
}

fn names(entity_types: &[EntityType]) -> Vec<&str> {
    entity_types.iter().map(EntityType::identifier).collect()
}

fn list(items: &[&str]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
