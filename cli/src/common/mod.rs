//! Common utilities shared across CLI commands.

pub mod error;
pub mod survey;

pub use error::{CliError, CliResult};
