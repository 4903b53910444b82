//! Error rendering using ariadne
//!
//! Compile errors carry the expression text and spanned diagnostics, which
//! are rendered as annotated source snippets. Errors without a source
//! location (cycles, evaluation failures) render as a single line.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

/// Character set for rendering error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSet {
    /// Use Unicode characters for rich visual output.
    #[default]
    Unicode,
    /// Use ASCII-only characters for compatibility.
    Ascii,
}

/// Configuration for error rendering.
#[derive(Debug, Clone)]
pub struct RenderConfig<'a> {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
    /// The name shown in the snippet header, e.g. the variable being declared.
    /// Defaults to "<expression>" if not provided.
    pub filename: Option<&'a str>,
    /// The character set to use for rendering.
    pub charset: CharSet,
}

impl Default for RenderConfig<'_> {
    fn default() -> Self {
        RenderConfig::default()
    }
}

impl RenderConfig<'_> {
    const fn default() -> Self {
        Self {
            color: true,
            filename: None,
            charset: CharSet::Unicode,
        }
    }
}

/// Render an error to stderr using the default config.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use fieldexpr::{Engine, EngineOptions, InMemoryEntityRepository, render_error};
///
/// let engine = Engine::new(EngineOptions::default(), Arc::new(InMemoryEntityRepository::new()));
/// if let Err(e) = engine.parse_numeric_or_null("Age +") {
///     render_error(&e);
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to(error, &mut std::io::stderr(), &RenderConfig::default()).ok();
}

/// Render an error to a writer with the given configuration.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use fieldexpr::{Engine, EngineOptions, InMemoryEntityRepository, RenderConfig, render_error_to};
///
/// let engine = Engine::new(EngineOptions::default(), Arc::new(InMemoryEntityRepository::new()));
/// let err = engine.parse_numeric_or_null("Age + 1").unwrap_err();
///
/// let mut buf = Vec::new();
/// let config = RenderConfig { color: false, ..Default::default() };
/// render_error_to(&err, &mut buf, &config).unwrap();
/// assert!(String::from_utf8_lossy(&buf).contains("Unknown identifier 'Age'"));
/// ```
pub fn render_error_to(
    error: &Error,
    writer: &mut dyn Write,
    config: &RenderConfig,
) -> std::io::Result<()> {
    let filename = config.filename.unwrap_or("<expression>");

    match (error.expression(), error.diagnostics()) {
        (Some(source), diagnostics) if !diagnostics.is_empty() => {
            if let Error::UnresolvedReferences { context, .. } = error {
                writeln!(writer, "Errors in {}:", context)?;
            }
            render_diagnostics(source, &diagnostics, writer, config, filename)
        }
        _ => writeln!(writer, "Error: {}", error),
    }
}

fn render_diagnostics(
    source: &str,
    diagnostics: &[Diagnostic],
    writer: &mut dyn Write,
    config: &RenderConfig,
    filename: &str,
) -> std::io::Result<()> {
    let ariadne_charset = match config.charset {
        CharSet::Unicode => ariadne::CharSet::Unicode,
        CharSet::Ascii => ariadne::CharSet::Ascii,
    };

    for diag in diagnostics {
        let mut colors = ColorGenerator::new();
        colors.next(); // Skip the first color.

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };

        let ariadne_config = ariadne::Config::default()
            .with_color(config.color)
            .with_char_set(ariadne_charset);

        let mut report = Report::build(kind, (filename, diag.span.0.clone()))
            .with_message(&diag.message)
            .with_config(ariadne_config);

        if let Some(code) = &diag.code {
            report = report.with_code(code);
        }

        let color = colors.next();
        report = report.with_label(
            Label::new((filename, diag.span.0.clone()))
                .with_message(&diag.message)
                .with_color(color),
        );

        for related in &diag.related {
            let color = colors.next();
            report = report.with_label(
                Label::new((filename, related.span.0.clone()))
                    .with_message(&related.message)
                    .with_color(color),
            );
        }

        for help_msg in &diag.help {
            report = report.with_help(help_msg);
        }

        report
            .finish()
            .write((filename, Source::from(source)), &mut *writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompileOptions, Engine, EngineOptions, InMemoryEntityRepository};
    use expect_test::{Expect, expect};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const UNICODE_CONFIG: RenderConfig = RenderConfig {
        color: false,
        filename: Some("test.fx"),
        charset: CharSet::Unicode,
    };

    const ASCII_CONFIG: RenderConfig = RenderConfig {
        color: false,
        filename: Some("test.fx"),
        charset: CharSet::Ascii,
    };

    fn engine() -> Engine {
        Engine::new(
            EngineOptions::default(),
            Arc::new(InMemoryEntityRepository::new()),
        )
    }

    fn render(error: &Error, config: &RenderConfig) -> String {
        let mut buf = Vec::new();
        render_error_to(error, &mut buf, config).unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn check_error(source: &str, config: &RenderConfig, expected: Expect) {
        match engine().parse_numeric_or_null(source) {
            Err(e) => expected.assert_eq(&render(&e, config)),
            Ok(_) => panic!("Expected compilation error for source: {source}"),
        }
    }

    #[test]
    fn test_parse_error_unicode() {
        check_error(
            "1 + ) 2",
            &UNICODE_CONFIG,
            expect![[r#"
                [P001] Error: unexpected token ')'
                   ╭─[ test.fx:1:5 ]
                   │
                 1 │ 1 + ) 2
                   │     │ 
                   │     ╰─ unexpected token ')'
                ───╯
            "#]],
        );
    }

    #[test]
    fn test_parse_error_ascii() {
        check_error(
            "1 + ) 2",
            &ASCII_CONFIG,
            expect![[r#"
                [P001] Error: unexpected token ')'
                   ,-[ test.fx:1:5 ]
                   |
                 1 | 1 + ) 2
                   |     | 
                   |     `- unexpected token ')'
                ---'
            "#]],
        );
    }

    #[test]
    fn test_unknown_identifier_unicode() {
        check_error(
            "foo + 1",
            &UNICODE_CONFIG,
            expect![[r#"
                Errors in metric variable expression:
                [E002] Error: Unknown identifier 'foo'
                   ╭─[ test.fx:1:1 ]
                   │
                 1 │ foo + 1
                   │ ─┬─  
                   │  ╰─── Unknown identifier 'foo'
                   │ 
                   │ Help: Check the spelling, or declare it before using it
                ───╯
            "#]],
        );
    }

    #[test]
    fn test_unknown_identifier_ascii() {
        check_error(
            "foo + 1",
            &ASCII_CONFIG,
            expect![[r#"
                Errors in metric variable expression:
                [E002] Error: Unknown identifier 'foo'
                   ,-[ test.fx:1:1 ]
                   |
                 1 | foo + 1
                   | ^|^  
                   |  `--- Unknown identifier 'foo'
                   | 
                   | Help: Check the spelling, or declare it before using it
                ---'
            "#]],
        );
    }

    #[test]
    fn test_every_unresolved_name_is_rendered() {
        let err = engine().parse_numeric_or_null("foo + bar").unwrap_err();
        let output = render(&err, &UNICODE_CONFIG);
        assert_eq!(output.matches("[E002] Error:").count(), 2);
        assert!(output.contains("Unknown identifier 'bar'"));
    }

    #[test]
    fn test_too_complex_spans_the_expression() {
        let engine = Engine::new(
            EngineOptions {
                default_compile_options: CompileOptions {
                    max_nodes: 2,
                    ..CompileOptions::default()
                },
                ..EngineOptions::default()
            },
            Arc::new(InMemoryEntityRepository::new()),
        );
        let err = engine.parse_numeric_or_null("1 + 2 + 3").unwrap_err();
        let output = render(&err, &UNICODE_CONFIG);
        assert!(output.starts_with("[L001] Error: Expression is too complex"));
        assert!(output.contains("Help: Split the expression into smaller declared variables"));
    }

    #[test]
    fn test_errors_without_source_render_one_line() {
        let mut engine = engine();
        engine.declare_or_update("A", "1").unwrap();
        let err = engine.declare_or_update("A", "A + 1").unwrap_err();
        expect![[r#"
            Error: Variable 'A' cannot depend on itself (A -> A)
        "#]]
        .assert_eq(&render(&err, &UNICODE_CONFIG));
    }

    #[test]
    fn test_render_config_default_charset() {
        let config = RenderConfig::default();
        assert_eq!(config.charset, CharSet::Unicode);
        assert!(config.color);
    }
}
