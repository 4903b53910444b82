//! Command-line interface definitions.
//!
//! This module contains only clap struct definitions - no business logic.
//! All command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// fieldexpr - compile and evaluate survey field expressions
#[derive(Parser, Debug)]
#[command(name = "fieldexpr", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile an expression and report what it depends on
    Check(CheckArgs),

    /// Evaluate an expression for every respondent in a survey
    Eval(EvalArgs),

    /// List the instances a single-dimension expression holds for
    Instances(InstancesArgs),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ExpressionArgs {
    /// Expression to compile
    pub expression: String,

    /// JSON survey definition: entity types, fields, variables, respondents
    #[arg(long, short)]
    pub survey: Option<PathBuf>,

    /// Compile as a filter instead of a metric
    #[arg(long)]
    pub boolean: bool,
}

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub expression: ExpressionArgs,
}

/// Arguments for the `eval` command.
#[derive(Args, Debug)]
pub struct EvalArgs {
    #[command(flatten)]
    pub expression: ExpressionArgs,

    /// Entity context to evaluate in, e.g. `Brand=3,Product=5`
    #[arg(long, short, value_delimiter = ',')]
    pub context: Vec<String>,

    /// Only evaluate this respondent
    #[arg(long)]
    pub respondent: Option<i64>,
}

/// Arguments for the `instances` command.
#[derive(Args, Debug)]
pub struct InstancesArgs {
    #[command(flatten)]
    pub expression: ExpressionArgs,
}
