//! Public error types for the fieldexpr API.
//!
//! Compile-time failures (`Syntax`, `TooComplex`, `UnresolvedReferences`,
//! `CyclicDependency`) carry the expression text so callers can render them
//! against the source. Evaluation failures are [`EvalError`] values, which are
//! cheap to clone so that a constant fold that failed can replay the same
//! error for every respondent.

use core::fmt;

use thiserror::Error;

use crate::parser::{ComplexityLimit, ParseError, ParseErrorKind, Span};

/// Public error type for compilation and evaluation.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed grammar, unsupported construct or a badly shaped builtin call.
    #[error("{} (line {line}, column {column})", .diagnostic.message)]
    Syntax {
        diagnostic: Diagnostic,
        expression: String,
        line: usize,
        column: usize,
    },

    /// Expression exceeded a length, nesting or node-count limit.
    #[error("Expression is too complex (exceeds {limit})")]
    TooComplex {
        limit: ComplexityLimit,
        expression: String,
    },

    /// Every distinct identifier that could not be resolved, reported together.
    #[error("Errors in {context}:\n  {}", join_messages(.references))]
    UnresolvedReferences {
        context: String,
        expression: String,
        references: Vec<Diagnostic>,
    },

    /// Declaring the variable would make it depend on itself.
    #[error("Variable '{identifier}' cannot depend on itself ({})", .cycle.join(" -> "))]
    CyclicDependency {
        identifier: String,
        cycle: Vec<String>,
    },

    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

fn join_messages(references: &[Diagnostic]) -> String {
    references
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join("\n  ")
}

impl Error {
    pub(crate) fn syntax(diagnostic: Diagnostic, expression: &str) -> Self {
        let (line, column) = diagnostic.span.line_col(expression);
        Error::Syntax {
            diagnostic,
            expression: expression.to_string(),
            line,
            column,
        }
    }

    /// Source text of the failing expression, when the error has one.
    pub fn expression(&self) -> Option<&str> {
        match self {
            Error::Syntax { expression, .. }
            | Error::TooComplex { expression, .. }
            | Error::UnresolvedReferences { expression, .. } => Some(expression),
            Error::CyclicDependency { .. } | Error::Evaluation(_) => None,
        }
    }

    /// Diagnostics with source spans, for renderers.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Error::Syntax { diagnostic, .. } => vec![diagnostic.clone()],
            Error::TooComplex { expression, .. } => vec![Diagnostic {
                severity: Severity::Error,
                message: self.to_string(),
                span: Span::new(0, expression.len()),
                related: Vec::new(),
                help: vec!["Split the expression into smaller declared variables".to_string()],
                code: Some("L001".to_string()),
            }],
            Error::UnresolvedReferences { references, .. } => references.clone(),
            Error::CyclicDependency { .. } | Error::Evaluation(_) => Vec::new(),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        match err.kind {
            ParseErrorKind::TooComplex(limit) => Error::TooComplex {
                limit,
                expression: err.source,
            },
            ParseErrorKind::Syntax => Error::syntax(err.to_diagnostic(), &err.source),
        }
    }
}

/// Failure while specializing or evaluating a compiled variable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("The context does not provide a value for '{entity_type}' (context: {context})")]
    DimensionMismatch {
        entity_type: String,
        context: String,
    },

    #[error("{function}() arg is an empty sequence; pass default= to handle this case")]
    EmptyAggregate { function: &'static str },

    #[error("{message}")]
    Domain { message: String },

    #[error("{message}")]
    Unresolved { message: String },

    #[error("'{expression}' does not output over exactly one entity type")]
    NotSingleDimension { expression: String },

    #[error("Evaluation needs more than {limit} pooled values")]
    ResourceExceeded { limit: usize },

    #[error("Entity type '{entity_type}' appears more than once in the context")]
    DuplicateDimension { entity_type: String },
}

impl EvalError {
    pub fn domain(message: impl Into<String>) -> Self {
        EvalError::Domain {
            message: message.into(),
        }
    }
}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level (error, warning, info).
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Help messages suggesting how to fix the issue.
    pub help: Vec<String>,

    /// Optional error code (e.g., "C001") for documentation lookup.
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span, code: &str) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            span,
            related: Vec::new(),
            help: Vec::new(),
            code: Some(code.to_string()),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - compilation cannot succeed.
    Error,
    /// Warning - suspicious code that might be wrong.
    Warning,
    /// Info - informational message.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic (e.g., "declared here").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    /// Source location of the related information.
    pub span: Span,

    /// Message explaining the relevance.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    #[test]
    fn syntax_error_reports_line_and_column() {
        let arena = Bump::new();
        let err: Error = parse(&arena, "1 +\n  )").unwrap_err().into();
        let Error::Syntax { line, column, .. } = &err else {
            panic!("expected syntax error, got {err:?}");
        };
        assert_eq!((*line, *column), (2, 3));
        assert_eq!(err.to_string(), "unexpected token ')' (line 2, column 3)");
    }

    #[test]
    fn unresolved_references_are_listed_together() {
        let err = Error::UnresolvedReferences {
            context: "metric variable expression".to_string(),
            expression: "a + b".to_string(),
            references: vec![
                Diagnostic::error("Unknown identifier 'a'", Span::new(0, 1), "E002"),
                Diagnostic::error("Unknown identifier 'b'", Span::new(4, 5), "E002"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Errors in metric variable expression:\n  Unknown identifier 'a'\n  Unknown identifier 'b'"
        );
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn evaluation_errors_are_transparent() {
        let err: Error = EvalError::domain("unsupported operand None for +").into();
        assert_eq!(err.to_string(), "unsupported operand None for +");
        assert_eq!(err.expression(), None);
    }
}
