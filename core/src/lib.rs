//! Compiler and evaluation engine for survey field expressions.
//!
//! Expressions are written in a small Python-like language and compiled into
//! two-stage reducers: one stage specializes on an entity context (for
//! example `Brand=3`), the other evaluates per respondent.

// The pest derive refers to `::alloc`.
extern crate alloc;

pub mod api;
pub mod compiler;
pub mod memory;
pub mod model;
pub mod parser;
pub mod reducer;
pub mod resolve;
pub mod stdlib;
pub mod values;
pub mod variable;
