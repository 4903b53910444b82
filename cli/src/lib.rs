//! fieldexpr CLI library.
//!
//! This crate provides the command-line interface for survey field expressions.
//! The public modules are primarily exposed for testing purposes.

pub mod cli;
pub mod commands;
pub mod common;
