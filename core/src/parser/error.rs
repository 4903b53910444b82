use crate::api::{Diagnostic, Severity};
use crate::parser::limits::ComplexityLimit;
use crate::parser::parser::Rule;
use crate::parser::syntax::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    Syntax,
    TooComplex(ComplexityLimit),
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
    pub source: String,
}

impl ParseError {
    pub fn too_complex(limit: ComplexityLimit, source: &str) -> Self {
        ParseError {
            kind: ParseErrorKind::TooComplex(limit),
            message: format!("Expression is too complex (exceeds {})", limit),
            span: Span::new(0, source.len()),
            source: source.to_string(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            message: self.message.clone(),
            span: self.span.clone(),
            related: Vec::new(),
            help: Vec::new(),
            code: Some("P001".to_string()),
        }
    }
}

pub fn convert_pest_error(error: pest::error::Error<Rule>, source: &str) -> ParseError {
    let (start, end) = match error.location {
        pest::error::InputLocation::Pos(pos) => (pos, pos),
        pest::error::InputLocation::Span((start, end)) => (start, end),
    };

    let (message, span) = match error.variant {
        pest::error::ErrorVariant::CustomError { message } => (message, Span::new(start, end)),
        pest::error::ErrorVariant::ParsingError { .. } => describe_unexpected(source, start),
    };

    ParseError {
        kind: ParseErrorKind::Syntax,
        message,
        span,
        source: source.to_string(),
    }
}

// Names the token found where the grammar gave up.
fn describe_unexpected(source: &str, pos: usize) -> (String, Span) {
    let rest = source.get(pos..).unwrap_or("");
    let trimmed = rest.trim_start();
    let start = pos + (rest.len() - trimmed.len());

    let Some(first) = trimmed.chars().next() else {
        let end = source.len();
        return (
            "unexpected end of expression".to_string(),
            Span::new(end, end),
        );
    };

    let token_len = if first.is_alphanumeric() || first == '_' {
        trimmed
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len())
    } else {
        first.len_utf8()
    };

    let token = &trimmed[..token_len];
    (
        format!("unexpected token '{}'", token),
        Span::new(start, start + token_len),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_identifier_tokens() {
        let (message, span) = describe_unexpected("1 if 2 else", 7);
        assert_eq!(message, "unexpected token 'else'");
        assert_eq!(span, Span::new(7, 11));
    }

    #[test]
    fn skips_whitespace_before_token() {
        let (message, span) = describe_unexpected("1   )", 1);
        assert_eq!(message, "unexpected token ')'");
        assert_eq!(span, Span::new(4, 5));
    }

    #[test]
    fn reports_end_of_input() {
        let (message, span) = describe_unexpected("1 +  ", 3);
        assert_eq!(message, "unexpected end of expression");
        assert_eq!(span, Span::new(5, 5));
    }
}
