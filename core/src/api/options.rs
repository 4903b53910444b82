//! Engine, compile and run options.
//!
//! Options follow a defaults-plus-override scheme: the engine holds default
//! [`CompileOptions`] and [`RunOptions`], and each call may pass an
//! `*Override` whose `Some` fields replace the defaults for that call only.

use serde::{Deserialize, Serialize};

use crate::parser::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_EXPRESSION_LENGTH, DEFAULT_MAX_NODES, ParseLimits,
};

pub const DEFAULT_MAX_NUMERIC_DEPTH: usize = 150;
pub const DEFAULT_MAX_POOLED_VALUES: usize = 1_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub default_compile_options: CompileOptions,
    pub default_run_options: RunOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Longest accepted expression text, in bytes.
    pub max_expression_length: usize,
    /// Deepest accepted syntax tree.
    pub max_depth: usize,
    /// Largest accepted syntax tree.
    pub max_nodes: usize,
    /// Deepest chain of numeric sub-expressions the compiler will recurse into.
    pub max_numeric_depth: usize,
    /// Compile unresolved identifiers into reducers that fail when evaluated
    /// instead of rejecting the expression.
    pub allow_unresolved: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_expression_length: DEFAULT_MAX_EXPRESSION_LENGTH,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
            max_numeric_depth: DEFAULT_MAX_NUMERIC_DEPTH,
            allow_unresolved: false,
        }
    }
}

impl CompileOptions {
    pub fn override_with(&mut self, other: &CompileOptionsOverride) {
        if let Some(v) = other.max_expression_length {
            self.max_expression_length = v;
        }
        if let Some(v) = other.max_depth {
            self.max_depth = v;
        }
        if let Some(v) = other.max_nodes {
            self.max_nodes = v;
        }
        if let Some(v) = other.max_numeric_depth {
            self.max_numeric_depth = v;
        }
        if let Some(v) = other.allow_unresolved {
            self.allow_unresolved = v;
        }
    }

    pub fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            max_length: self.max_expression_length,
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptionsOverride {
    pub max_expression_length: Option<usize>,
    pub max_depth: Option<usize>,
    pub max_nodes: Option<usize>,
    pub max_numeric_depth: Option<usize>,
    pub allow_unresolved: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Capacity of each evaluator's scratch pool.
    pub max_pooled_values: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_pooled_values: DEFAULT_MAX_POOLED_VALUES,
        }
    }
}

impl RunOptions {
    pub fn override_with(&mut self, other: &RunOptionsOverride) {
        if let Some(v) = other.max_pooled_values {
            self.max_pooled_values = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptionsOverride {
    pub max_pooled_values: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn override_replaces_only_given_fields() {
        let mut options = CompileOptions::default();
        options.override_with(&CompileOptionsOverride {
            max_depth: Some(10),
            allow_unresolved: Some(true),
            ..Default::default()
        });
        assert_eq!(options.max_depth, 10);
        assert!(options.allow_unresolved);
        assert_eq!(options.max_nodes, DEFAULT_MAX_NODES);
        assert_eq!(
            options.parse_limits(),
            ParseLimits {
                max_length: DEFAULT_MAX_EXPRESSION_LENGTH,
                max_depth: 10,
                max_nodes: DEFAULT_MAX_NODES,
            }
        );
    }

    #[test]
    fn run_options_override() {
        let mut options = RunOptions::default();
        options.override_with(&RunOptionsOverride::default());
        assert_eq!(options.max_pooled_values, DEFAULT_MAX_POOLED_VALUES);
        options.override_with(&RunOptionsOverride {
            max_pooled_values: Some(16),
        });
        assert_eq!(options.max_pooled_values, 16);
    }
}
