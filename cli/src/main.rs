//! fieldexpr CLI - compile and evaluate survey field expressions.

mod cli;
mod commands;
mod common;

use clap::Parser;
use cli::{Cli, Command};

fn main() {
    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG controls the log level, WARN by default.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check(args) => commands::check::run(args),
        Command::Eval(args) => commands::eval::run(args),
        Command::Instances(args) => commands::instances::run(args),
    };

    // --no-color only affects how errors are rendered.
    if let Err(e) = result {
        common::error::render_and_exit(e, cli.no_color);
    }
}
