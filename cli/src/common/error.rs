//! Error handling utilities for the CLI.

use fieldexpr::{Error, EvalError, RenderConfig, render_error_to};
use thiserror::Error as ThisError;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, ThisError)]
pub enum CliError {
    /// An expression failed to compile. `name` labels the snippet.
    #[error("{error}")]
    Expression { name: String, error: Error },

    #[error("{0}")]
    Survey(String),

    #[error("respondent {id}: {error}")]
    Respondent { id: i64, error: EvalError },

    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

impl CliError {
    pub fn survey(message: impl Into<String>) -> Self {
        CliError::Survey(message.into())
    }

    pub fn expression(name: impl Into<String>, error: Error) -> Self {
        CliError::Expression {
            name: name.into(),
            error,
        }
    }
}

/// Render an error to stderr and exit with code 1.
pub fn render_and_exit(error: CliError, no_color: bool) -> ! {
    match &error {
        CliError::Expression { name, error } => {
            let config = RenderConfig {
                color: !no_color,
                filename: Some(name.as_str()),
                ..Default::default()
            };
            render_error_to(error, &mut std::io::stderr(), &config).ok();
        }
        other => eprintln!("error: {}", other),
    }
    std::process::exit(1);
}
