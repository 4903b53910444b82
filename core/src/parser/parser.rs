use bumpalo::Bump;
use core::cell::Cell;
use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;
use smallvec::SmallVec;

use crate::parser::error::{ParseError, ParseErrorKind, convert_pest_error};
use crate::parser::limits::{self, ComplexityLimit, ParseLimits};
use crate::parser::syntax::AnnotatedSource;
use crate::parser::{
    Argument, BinaryOp, BoolOp, ComparisonOp, ComprehensionKind, Expr, Literal, ParsedExpr,
    UnaryOp, syntax::Span,
};

lazy_static! {
    // Note: precedence is defined lowest to highest, following Python.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        // (lowest precedence)
        .op(Op::infix(Rule::if_op, Assoc::Right))        // `a if c else b`
        .op(Op::infix(Rule::or, Assoc::Left))            // `or`
        .op(Op::infix(Rule::and, Assoc::Left))           // `and`
        .op(Op::prefix(Rule::not))                       // `not`

        // Comparison operators. Chains are folded into one node.
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::neq, Assoc::Left) |
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left) |
            Op::infix(Rule::le, Assoc::Left) |
            Op::infix(Rule::ge, Assoc::Left) |
            Op::infix(Rule::in_op, Assoc::Left) |
            Op::infix(Rule::not_in, Assoc::Left) |
            Op::infix(Rule::is_op, Assoc::Left) |
            Op::infix(Rule::is_not, Assoc::Left)
        )

        // Bitwise operators.
        .op(Op::infix(Rule::bit_or, Assoc::Left))        // `|`
        .op(Op::infix(Rule::bit_xor, Assoc::Left))       // `^`
        .op(Op::infix(Rule::bit_and, Assoc::Left))       // `&`
        .op(
            Op::infix(Rule::shl, Assoc::Left) |
            Op::infix(Rule::shr, Assoc::Left)
        )                                                // `<<`, `>>`

        // Arithmetic operators.
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                                // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left) |
            Op::infix(Rule::floor_div, Assoc::Left) |
            Op::infix(Rule::modulo, Assoc::Left)
        )                                                // `*`, `/`, `//`, `%`
        .op(Op::prefix(Rule::neg) |
            Op::prefix(Rule::pos) |
            Op::prefix(Rule::invert))                    // `-`, `+`, `~`
        .op(Op::infix(Rule::pow, Assoc::Right))          // `**` (right-assoc)

        // Postfix operators.
        .op(Op::postfix(Rule::call_op) |
            Op::postfix(Rule::attr_op))                  // `()`, `.`
        // (highest precedence)
        ;
}

#[derive(Parser)]
#[grammar = "parser/expression.pest"]
pub struct ExpressionParser;

type PestError = pest::error::Error<Rule>;

fn custom_error(message: impl Into<String>, span: pest::Span<'_>) -> PestError {
    pest::error::Error::new_from_span(
        pest::error::ErrorVariant::CustomError {
            message: message.into(),
        },
        span,
    )
}

struct ParseContext<'a, 'input> {
    arena: &'a Bump,
    original_source: &'input str, // To "transfer" slices to the arena allocated string.
    ann: &'a AnnotatedSource<'a, Expr<'a>>,
    depth: Cell<usize>,
    max_depth: usize,
    limit_hit: Cell<Option<ComplexityLimit>>,
}

impl<'a, 'input> ParseContext<'a, 'input> {
    // Returns a slice into `self.source` covering the same byte range that `s`
    // occupies within `self.original_source`.
    fn reslice(&self, s: &str) -> &'a str {
        let start = s.as_ptr() as usize - self.original_source.as_ptr() as usize;
        let end = start + s.len();
        &self.ann.source[start..end]
    }

    fn check_depth(&self, pair: &Pair<Rule>) -> Result<(), PestError> {
        let current_depth = self.depth.get();
        if current_depth >= self.max_depth {
            self.limit_hit.set(Some(ComplexityLimit::NestingDepth {
                max: self.max_depth,
            }));
            return Err(custom_error(
                format!(
                    "Expression nesting depth exceeds maximum of {} levels",
                    self.max_depth
                ),
                pair.as_span(),
            ));
        }
        self.depth.set(current_depth + 1);
        Ok(())
    }

    fn parse_expr(&self, pair: Pair<Rule>) -> Result<&'a Expr<'a>, PestError> {
        // Only nested expressions count towards depth; operators within one
        // expression are measured afterwards by `limits::check_tree`.
        let nested = pair.as_rule() == Rule::expression;
        if nested {
            self.check_depth(&pair)?;
        }
        let result = match pair.as_rule() {
            Rule::main => self.parse_main(pair),
            Rule::expression => self.parse_expression(pair),
            Rule::list => self.parse_list(pair),
            Rule::paren => self.parse_paren(pair),
            Rule::dict => self.parse_dict(pair),
            Rule::integer => self.parse_integer(pair),
            Rule::none => {
                Ok(self.alloc_with_span(Expr::Literal(Literal::None), pair.as_span().into()))
            }
            Rule::boolean => {
                let value = pair.as_str() == "True";
                Ok(self.alloc_with_span(Expr::Literal(Literal::Bool(value)), pair.as_span().into()))
            }
            Rule::ident => self.parse_ident(pair),
            _ => Err(custom_error(
                format!("Unhandled rule: {:?}", pair.as_rule()),
                pair.as_span(),
            )),
        };
        if nested {
            self.depth.set(self.depth.get() - 1);
        }
        result
    }

    fn parse_main(&self, pair: Pair<Rule>) -> Result<&'a Expr<'a>, PestError> {
        let span = pair.as_span();
        let inner = pair
            .into_inner()
            .find(|p| p.as_rule() == Rule::expression)
            .ok_or_else(|| custom_error("missing expected pair in rule", span))?;
        self.parse_expr(inner)
    }

    fn parse_expression(&self, pair: Pair<Rule>) -> Result<&'a Expr<'a>, PestError> {
        PRATT_PARSER
            .map_primary(|primary| self.parse_expr(primary))
            .map_prefix(|op, rhs| {
                let rhs_value = rhs?;
                let span = Span::combine(&op.as_span().into(), &self.span_of(rhs_value));
                let op_enum = match op.as_rule() {
                    Rule::not => UnaryOp::Not,
                    Rule::neg => UnaryOp::Neg,
                    Rule::pos => UnaryOp::Pos,
                    Rule::invert => UnaryOp::Invert,
                    _ => unreachable!("Unknown prefix operator: {:?}", op.as_rule()),
                };
                Ok(self.alloc_with_span(
                    Expr::Unary {
                        op: op_enum,
                        expr: rhs_value,
                    },
                    span,
                ))
            })
            .map_infix(|lhs, op, rhs| {
                let lhs_expr = lhs?;
                let rhs_expr = rhs?;
                let span = Span::combine(&self.span_of(lhs_expr), &self.span_of(rhs_expr));
                match op.as_rule() {
                    Rule::if_op => self.parse_if_expr(op, lhs_expr, rhs_expr, span),
                    Rule::and | Rule::or => self.parse_boolean_op(op, lhs_expr, rhs_expr, span),
                    Rule::eq
                    | Rule::neq
                    | Rule::lt
                    | Rule::gt
                    | Rule::le
                    | Rule::ge
                    | Rule::in_op
                    | Rule::not_in
                    | Rule::is_op
                    | Rule::is_not => self.parse_comparison_op(op, lhs_expr, rhs_expr, span),
                    _ => self.parse_binary_op(op, lhs_expr, rhs_expr, span),
                }
            })
            .map_postfix(|lhs, op| {
                let lhs_expr = lhs?;
                let span = Span::combine(&self.span_of(lhs_expr), &op.as_span().into());
                match op.as_rule() {
                    Rule::call_op => self.parse_call_expr(lhs_expr, op, span),
                    Rule::attr_op => self.parse_attr_expr(lhs_expr, op, span),
                    _ => unreachable!("Unknown postfix operator: {:?}", op.as_rule()),
                }
            })
            .parse(pair.into_inner())
    }

    // Helper to allocate an expression with its span
    fn alloc_with_span(&self, expr: Expr<'a>, span: Span) -> &'a Expr<'a> {
        let node = self.arena.alloc(expr);
        self.ann.add_span(node, span);
        node
    }

    fn span_of(&self, expr: &Expr<'a>) -> Span {
        self.ann.span_of(expr).unwrap_or_default()
    }

    // `then_branch if cond else else_branch`
    fn parse_if_expr(
        &self,
        op: Pair<Rule>,
        then_branch: &'a Expr<'a>,
        else_branch: &'a Expr<'a>,
        span: Span,
    ) -> Result<&'a Expr<'a>, PestError> {
        let op_span = op.as_span();
        let cond_pair = op
            .into_inner()
            .find(|p| p.as_rule() == Rule::expression)
            .ok_or_else(|| custom_error("missing condition", op_span))?;
        let cond = self.parse_expr(cond_pair)?;
        Ok(self.alloc_with_span(
            Expr::If {
                cond,
                then_branch,
                else_branch,
            },
            span,
        ))
    }

    fn parse_boolean_op(
        &self,
        op: Pair<Rule>,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        span: Span,
    ) -> Result<&'a Expr<'a>, PestError> {
        let op = match op.as_rule() {
            Rule::and => BoolOp::And,
            _ => BoolOp::Or,
        };
        Ok(self.alloc_with_span(Expr::Boolean { op, left, right }, span))
    }

    fn parse_binary_op(
        &self,
        op: Pair<Rule>,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        span: Span,
    ) -> Result<&'a Expr<'a>, PestError> {
        let op_enum = match op.as_rule() {
            Rule::add => BinaryOp::Add,
            Rule::sub => BinaryOp::Sub,
            Rule::mul => BinaryOp::Mul,
            Rule::div => BinaryOp::Div,
            Rule::floor_div => BinaryOp::FloorDiv,
            Rule::modulo => BinaryOp::Mod,
            Rule::pow => BinaryOp::Pow,
            Rule::bit_and => BinaryOp::BitAnd,
            Rule::bit_or => BinaryOp::BitOr,
            Rule::bit_xor => BinaryOp::BitXor,
            Rule::shl => BinaryOp::Shl,
            Rule::shr => BinaryOp::Shr,
            _ => unreachable!("Unknown binary operator: {:?}", op.as_rule()),
        };
        Ok(self.alloc_with_span(
            Expr::Binary {
                op: op_enum,
                left,
                right,
            },
            span,
        ))
    }

    // `a < b < c` arrives as `(a < b) < c`; fold it into one chain. A
    // parenthesized comparison is a `Grouped` node and is left alone.
    fn parse_comparison_op(
        &self,
        op: Pair<Rule>,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        span: Span,
    ) -> Result<&'a Expr<'a>, PestError> {
        let op_enum = match op.as_rule() {
            Rule::eq => ComparisonOp::Eq,
            Rule::neq => ComparisonOp::Neq,
            Rule::lt => ComparisonOp::Lt,
            Rule::gt => ComparisonOp::Gt,
            Rule::le => ComparisonOp::Le,
            Rule::ge => ComparisonOp::Ge,
            Rule::in_op => ComparisonOp::In,
            Rule::not_in => ComparisonOp::NotIn,
            Rule::is_op => ComparisonOp::Is,
            Rule::is_not => ComparisonOp::IsNot,
            _ => unreachable!("Unknown comparison operator: {:?}", op.as_rule()),
        };
        let expr = match *left {
            Expr::Comparison { left: first, rest } => {
                let mut chained: SmallVec<[(ComparisonOp, &'a Expr<'a>); 4]> =
                    rest.iter().copied().collect();
                chained.push((op_enum, right));
                let rest = self.arena.alloc_slice_copy(&chained);
                Expr::Comparison { left: first, rest }
            }
            _ => Expr::Comparison {
                left,
                rest: self.arena.alloc_slice_copy(&[(op_enum, right)]),
            },
        };
        Ok(self.alloc_with_span(expr, span))
    }

    fn parse_call_expr(
        &self,
        callable: &'a Expr<'a>,
        op: Pair<Rule>,
        span: Span,
    ) -> Result<&'a Expr<'a>, PestError> {
        let op_span = op.as_span();
        let mut arguments = Vec::new();
        let mut comprehension = None;
        for pair in op.into_inner() {
            match pair.as_rule() {
                Rule::argument => arguments.push(self.parse_argument(pair)?),
                Rule::comp_clause => comprehension = Some(pair),
                _ => unreachable!("Unexpected call argument: {:?}", pair.as_rule()),
            }
        }

        // `f(x for x in y)`: the single argument is a generator.
        if let Some(clause) = comprehension {
            let element = match arguments.as_slice() {
                [Argument { name: None, value }] => *value,
                _ => {
                    return Err(custom_error(
                        "Generator expression must be the only argument",
                        op_span,
                    ));
                }
            };
            let generator_span = Span::combine(&self.span_of(element), &clause.as_span().into());
            let generator = self.parse_comprehension(
                ComprehensionKind::Generator,
                element,
                clause,
                generator_span,
            )?;
            arguments = vec![Argument {
                name: None,
                value: generator,
            }];
        }

        Ok(self.alloc_with_span(
            Expr::Call {
                callable,
                args: self.arena.alloc_slice_fill_iter(arguments),
            },
            span,
        ))
    }

    fn parse_argument(&self, pair: Pair<Rule>) -> Result<Argument<'a>, PestError> {
        let span = pair.as_span();
        let mut name = None;
        let mut value = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::ident => name = Some(self.reslice(inner.as_str())),
                _ => value = Some(self.parse_expr(inner)?),
            }
        }
        let value = value.ok_or_else(|| custom_error("missing argument value", span))?;
        Ok(Argument { name, value })
    }

    fn parse_attr_expr(
        &self,
        value: &'a Expr<'a>,
        op: Pair<Rule>,
        span: Span,
    ) -> Result<&'a Expr<'a>, PestError> {
        let op_span = op.as_span();
        let attr = op
            .into_inner()
            .next()
            .ok_or_else(|| custom_error("missing attribute ident", op_span))?
            .as_str();
        Ok(self.alloc_with_span(
            Expr::Attribute {
                value,
                attr: self.reslice(attr),
            },
            span,
        ))
    }

    fn parse_comprehension(
        &self,
        kind: ComprehensionKind,
        element: &'a Expr<'a>,
        clause: Pair<Rule>,
        span: Span,
    ) -> Result<&'a Expr<'a>, PestError> {
        let clause_span = clause.as_span();
        let mut binding: Option<(&'a str, &'a Expr<'a>)> = None;
        let mut filter = None;
        for part in clause.into_inner() {
            let part_span = part.as_span();
            match part.as_rule() {
                Rule::comp_for => {
                    if binding.is_some() {
                        return Err(custom_error(
                            "Comprehensions support a single 'for' clause",
                            part_span,
                        ));
                    }
                    let mut var = None;
                    let mut iter = None;
                    for inner in part.into_inner() {
                        match inner.as_rule() {
                            Rule::ident => var = Some(self.reslice(inner.as_str())),
                            Rule::expression => iter = Some(self.parse_expr(inner)?),
                            _ => {}
                        }
                    }
                    match (var, iter) {
                        (Some(var), Some(iter)) => binding = Some((var, iter)),
                        _ => return Err(custom_error("incomplete 'for' clause", part_span)),
                    }
                }
                Rule::comp_if => {
                    if filter.is_some() {
                        return Err(custom_error(
                            "Comprehensions support at most one 'if' clause",
                            part_span,
                        ));
                    }
                    let condition = part
                        .into_inner()
                        .find(|p| p.as_rule() == Rule::expression)
                        .ok_or_else(|| custom_error("missing 'if' condition", part_span))?;
                    filter = Some(self.parse_expr(condition)?);
                }
                _ => unreachable!("Unexpected comprehension part: {:?}", part.as_rule()),
            }
        }
        let (var, iter) = binding
            .ok_or_else(|| custom_error("Comprehension is missing its 'for' clause", clause_span))?;
        Ok(self.alloc_with_span(
            Expr::Comprehension {
                kind,
                element,
                var,
                iter,
                filter,
            },
            span,
        ))
    }

    fn parse_list(&self, pair: Pair<Rule>) -> Result<&'a Expr<'a>, PestError> {
        let pest_span = pair.as_span();
        let span: Span = pest_span.into();
        let mut items = Vec::new();
        let mut comprehension = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::comp_clause => comprehension = Some(inner),
                _ => items.push(self.parse_expr(inner)?),
            }
        }
        if let Some(clause) = comprehension {
            let element = items
                .first()
                .copied()
                .ok_or_else(|| custom_error("missing comprehension element", pest_span))?;
            return self.parse_comprehension(ComprehensionKind::List, element, clause, span);
        }
        Ok(self.alloc_with_span(Expr::List(self.arena.alloc_slice_copy(&items)), span))
    }

    fn parse_paren(&self, pair: Pair<Rule>) -> Result<&'a Expr<'a>, PestError> {
        let pest_span = pair.as_span();
        let span: Span = pest_span.into();
        let mut inner = pair.into_inner();
        let first = inner
            .next()
            .ok_or_else(|| custom_error("empty parentheses", pest_span))?;
        let expr = self.parse_expr(first)?;
        match inner.next() {
            Some(clause) => {
                self.parse_comprehension(ComprehensionKind::Generator, expr, clause, span)
            }
            None => Ok(self.alloc_with_span(Expr::Grouped(expr), span)),
        }
    }

    fn parse_dict(&self, pair: Pair<Rule>) -> Result<&'a Expr<'a>, PestError> {
        let span = pair.as_span();
        let entries_iter = pair.into_inner().map(|p| self.parse_dict_entry(p));
        let entries = self.arena.alloc_slice_try_fill_iter(entries_iter)?;
        Ok(self.alloc_with_span(Expr::Dict(entries), span.into()))
    }

    fn parse_dict_entry(
        &self,
        pair: Pair<Rule>,
    ) -> Result<(&'a Expr<'a>, &'a Expr<'a>), PestError> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let key = self.parse_expr(
            inner
                .next()
                .ok_or_else(|| custom_error("missing dictionary key", span))?,
        )?;
        let value = self.parse_expr(
            inner
                .next()
                .ok_or_else(|| custom_error("missing dictionary value", span))?,
        )?;
        Ok((key, value))
    }

    fn parse_integer(&self, pair: Pair<Rule>) -> Result<&'a Expr<'a>, PestError> {
        let span = pair.as_span();
        let value: i32 = pair.as_str().parse().map_err(|_| {
            custom_error(
                format!("Integer literal {} is out of range", pair.as_str()),
                span,
            )
        })?;
        Ok(self.alloc_with_span(Expr::Literal(Literal::Int(value)), span.into()))
    }

    fn parse_ident(&self, pair: Pair<Rule>) -> Result<&'a Expr<'a>, PestError> {
        let span = Span::from(pair.as_span());
        Ok(self.alloc_with_span(Expr::Ident(self.reslice(pair.as_str())), span))
    }
}

/// Parses an expression with the default [`ParseLimits`].
pub fn parse<'a, 'i>(arena: &'a Bump, source: &'i str) -> Result<&'a ParsedExpr<'a>, ParseError>
where
    'i: 'a,
{
    parse_with_limits(arena, source, &ParseLimits::default())
}

/// Parses an expression, enforcing the given length, depth and node limits.
///
/// Limits are checked in three places: a textual pre-scan before pest runs,
/// the recursion depth while building the AST, and a final walk over the
/// finished tree.
pub fn parse_with_limits<'a, 'i>(
    arena: &'a Bump,
    source: &'i str,
    limits: &ParseLimits,
) -> Result<&'a ParsedExpr<'a>, ParseError>
where
    'i: 'a,
{
    limits::pre_scan(source, limits).map_err(|limit| ParseError::too_complex(limit, source))?;

    let mut pairs = ExpressionParser::parse(Rule::main, source).map_err(|e| {
        tracing::debug!("Pest parser failed with: {:?}", e);
        convert_pest_error(e, source)
    })?;
    let pair = pairs.next().ok_or_else(|| ParseError {
        kind: ParseErrorKind::Syntax,
        message: "unexpected end of expression".to_string(),
        span: Span::new(0, source.len()),
        source: source.to_string(),
    })?;
    let context = ParseContext {
        arena,
        original_source: source, // To "transfer" slices to the arena allocated string.
        ann: arena.alloc(AnnotatedSource::new(arena, source)),
        depth: Cell::new(0),
        max_depth: limits.max_depth,
        limit_hit: Cell::new(None),
    };
    let expr = context.parse_expr(pair).map_err(|e| match context.limit_hit.get() {
        Some(limit) => ParseError::too_complex(limit, source),
        None => convert_pest_error(e, source),
    })?;

    limits::check_tree(expr, limits).map_err(|limit| ParseError::too_complex(limit, source))?;

    Ok(arena.alloc(ParsedExpr {
        expr,
        ann: context.ann,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int<'a>(arena: &'a Bump, value: i32) -> &'a Expr<'a> {
        arena.alloc(Expr::Literal(Literal::Int(value)))
    }

    fn syntax_error(source: &str) -> String {
        let arena = Bump::new();
        let err = parse(&arena, source).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax, "for {source}");
        err.message
    }

    #[test]
    fn test_simple_binary_expr() {
        let arena = Bump::new();
        let parsed = parse(&arena, "1 + 2").unwrap();

        assert_eq!(
            *parsed.expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: int(&arena, 1),
                right: int(&arena, 2),
            }
        );
        assert_eq!(parsed.ann.span_of(parsed.expr), Some(Span::new(0, 5)));
        let Expr::Binary { left, right, .. } = parsed.expr else {
            panic!("Expected binary expression, got {:?}", parsed.expr);
        };
        assert_eq!(parsed.ann.span_of(left), Some(Span::new(0, 1)));
        assert_eq!(parsed.ann.span_of(right), Some(Span::new(4, 5)));
    }

    #[test]
    fn test_precedence_follows_python() {
        let arena = Bump::new();
        // -2 ** 2 is -(2 ** 2)
        let parsed = parse(&arena, "-2 ** 2").unwrap();
        assert_eq!(
            *parsed.expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                expr: arena.alloc(Expr::Binary {
                    op: BinaryOp::Pow,
                    left: int(&arena, 2),
                    right: int(&arena, 2),
                }),
            }
        );

        // 1 | 2 & 3 is 1 | (2 & 3)
        let parsed = parse(&arena, "1 | 2 & 3").unwrap();
        assert_eq!(
            *parsed.expr,
            Expr::Binary {
                op: BinaryOp::BitOr,
                left: int(&arena, 1),
                right: arena.alloc(Expr::Binary {
                    op: BinaryOp::BitAnd,
                    left: int(&arena, 2),
                    right: int(&arena, 3),
                }),
            }
        );
    }

    #[test]
    fn test_pow_is_right_associative() {
        let arena = Bump::new();
        let parsed = parse(&arena, "2 ** 3 ** 2").unwrap();
        assert_eq!(
            *parsed.expr,
            Expr::Binary {
                op: BinaryOp::Pow,
                left: int(&arena, 2),
                right: arena.alloc(Expr::Binary {
                    op: BinaryOp::Pow,
                    left: int(&arena, 3),
                    right: int(&arena, 2),
                }),
            }
        );
    }

    #[test]
    fn test_comparison_chain_is_flat() {
        let arena = Bump::new();
        let parsed = parse(&arena, "1 < x <= 3").unwrap();
        let Expr::Comparison { left, rest } = parsed.expr else {
            panic!("Expected comparison, got {:?}", parsed.expr);
        };
        assert_eq!(**left, Expr::Literal(Literal::Int(1)));
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].0, ComparisonOp::Lt);
        assert_eq!(*rest[0].1, Expr::Ident("x"));
        assert_eq!(rest[1].0, ComparisonOp::Le);
    }

    #[test]
    fn test_grouped_comparison_is_not_chained() {
        let arena = Bump::new();
        let parsed = parse(&arena, "(1 < 2) < 3").unwrap();
        let Expr::Comparison { left, rest } = parsed.expr else {
            panic!("Expected comparison, got {:?}", parsed.expr);
        };
        assert!(matches!(left, Expr::Grouped(_)));
        assert_eq!(rest.len(), 1);
        assert_eq!(parsed.ann.span_of(left), Some(Span::new(0, 7)));
    }

    #[test]
    fn test_membership_operators() {
        let arena = Bump::new();
        for (source, op) in [
            ("x in [1]", ComparisonOp::In),
            ("x not in [1]", ComparisonOp::NotIn),
            ("x is None", ComparisonOp::Is),
            ("x is not None", ComparisonOp::IsNot),
        ] {
            let parsed = parse(&arena, source).unwrap();
            let Expr::Comparison { rest, .. } = parsed.expr else {
                panic!("Expected comparison for {source}");
            };
            assert_eq!(rest[0].0, op, "for {source}");
        }
    }

    #[test]
    fn test_ternary_is_lowest_precedence() {
        let arena = Bump::new();
        let parsed = parse(&arena, "1 + 2 if x or y else 3").unwrap();
        let Expr::If {
            cond,
            then_branch,
            else_branch,
        } = parsed.expr
        else {
            panic!("Expected if, got {:?}", parsed.expr);
        };
        assert!(matches!(cond, Expr::Boolean { op: BoolOp::Or, .. }));
        assert!(matches!(then_branch, Expr::Binary { op: BinaryOp::Add, .. }));
        assert_eq!(**else_branch, Expr::Literal(Literal::Int(3)));
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        let arena = Bump::new();
        let parsed = parse(&arena, "not x == 1").unwrap();
        assert!(matches!(
            parsed.expr,
            Expr::Unary {
                op: UnaryOp::Not,
                expr: Expr::Comparison { .. }
            }
        ));
    }

    #[test]
    fn test_response_call_with_keywords() {
        let arena = Bump::new();
        let parsed =
            parse(&arena, "response.Consider(brand=result.brand, product=[1, 2])").unwrap();
        let Expr::Call { callable, args } = parsed.expr else {
            panic!("Expected call, got {:?}", parsed.expr);
        };
        assert_eq!(
            **callable,
            Expr::Attribute {
                value: arena.alloc(Expr::Ident("response")),
                attr: "Consider",
            }
        );
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].name, Some("brand"));
        assert!(matches!(args[0].value, Expr::Attribute { attr: "brand", .. }));
        assert_eq!(args[1].name, Some("product"));
        assert!(matches!(args[1].value, Expr::List(items) if items.len() == 2));
    }

    #[test]
    fn test_keyword_argument_is_not_equality() {
        let arena = Bump::new();
        let parsed = parse(&arena, "f(x == 1)").unwrap();
        let Expr::Call { args, .. } = parsed.expr else {
            panic!("Expected call");
        };
        assert_eq!(args[0].name, None);
        assert!(matches!(args[0].value, Expr::Comparison { .. }));
    }

    #[test]
    fn test_bare_generator_argument() {
        let arena = Bump::new();
        let parsed = parse(&arena, "sum(1 for r in response.X() if r == 1)").unwrap();
        let Expr::Call { args, .. } = parsed.expr else {
            panic!("Expected call");
        };
        assert_eq!(args.len(), 1);
        let Expr::Comprehension {
            kind,
            element,
            var,
            filter,
            ..
        } = args[0].value
        else {
            panic!("Expected generator, got {:?}", args[0].value);
        };
        assert_eq!(*kind, ComprehensionKind::Generator);
        assert_eq!(**element, Expr::Literal(Literal::Int(1)));
        assert_eq!(*var, "r");
        assert!(filter.is_some());
    }

    #[test]
    fn test_list_comprehension_and_literal() {
        let arena = Bump::new();
        let parsed = parse(&arena, "[x for x in [1, 2, 3] if x > 1]").unwrap();
        assert!(matches!(
            parsed.expr,
            Expr::Comprehension {
                kind: ComprehensionKind::List,
                var: "x",
                filter: Some(_),
                ..
            }
        ));

        let parsed = parse(&arena, "[1, 2, 3,]").unwrap();
        assert!(matches!(parsed.expr, Expr::List(items) if items.len() == 3));

        let parsed = parse(&arena, "[]").unwrap();
        assert!(matches!(parsed.expr, Expr::List(items) if items.is_empty()));
    }

    #[test]
    fn test_parenthesized_generator() {
        let arena = Bump::new();
        let parsed = parse(&arena, "(x for x in y)").unwrap();
        assert!(matches!(
            parsed.expr,
            Expr::Comprehension {
                kind: ComprehensionKind::Generator,
                filter: None,
                ..
            }
        ));
    }

    #[test]
    fn test_dict_get() {
        let arena = Bump::new();
        let parsed = parse(&arena, "{1: [1, 2], 2: [3]}.get(result.Region, [])").unwrap();
        let Expr::Call { callable, args } = parsed.expr else {
            panic!("Expected call");
        };
        let Expr::Attribute { value, attr } = callable else {
            panic!("Expected attribute");
        };
        assert_eq!(*attr, "get");
        assert!(matches!(value, Expr::Dict(entries) if entries.len() == 2));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_literals() {
        let arena = Bump::new();
        assert_eq!(*parse(&arena, "None").unwrap().expr, Expr::Literal(Literal::None));
        assert_eq!(
            *parse(&arena, "True").unwrap().expr,
            Expr::Literal(Literal::Bool(true))
        );
        assert_eq!(
            *parse(&arena, "2147483647").unwrap().expr,
            Expr::Literal(Literal::Int(i32::MAX))
        );
        assert_eq!(*parse(&arena, "Nonesuch").unwrap().expr, Expr::Ident("Nonesuch"));
    }

    #[test]
    fn test_comments_are_ignored() {
        let arena = Bump::new();
        let parsed = parse(&arena, "1 # one\n+ 2 # two").unwrap();
        assert!(matches!(parsed.expr, Expr::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn test_keyword_boundaries() {
        let arena = Bump::new();
        assert_eq!(*parse(&arena, "notdefined").unwrap().expr, Expr::Ident("notdefined"));
        assert_eq!(*parse(&arena, "android").unwrap().expr, Expr::Ident("android"));
        assert_eq!(*parse(&arena, "order").unwrap().expr, Expr::Ident("order"));
        assert_eq!(*parse(&arena, "index").unwrap().expr, Expr::Ident("index"));
        assert_eq!(*parse(&arena, "iffy").unwrap().expr, Expr::Ident("iffy"));
        assert!(parse(&arena, "x andy").is_err());
        assert!(parse(&arena, "x inside").is_err());
    }

    #[test]
    fn test_syntax_errors_name_the_token() {
        assert_eq!(syntax_error("1 2"), "unexpected token '2'");
        assert_eq!(syntax_error("1 +"), "unexpected end of expression");
        assert_eq!(syntax_error("'text'"), "unexpected token '''");
        assert_eq!(syntax_error("x[0]"), "unexpected token '['");
    }

    #[test]
    fn test_out_of_range_literal() {
        assert_eq!(
            syntax_error("2147483648"),
            "Integer literal 2147483648 is out of range"
        );
    }

    #[test]
    fn test_comprehension_clause_limits() {
        assert_eq!(
            syntax_error("[x for x in a for y in b]"),
            "Comprehensions support a single 'for' clause"
        );
        assert_eq!(
            syntax_error("[x for x in a if x if x]"),
            "Comprehensions support at most one 'if' clause"
        );
    }

    #[test]
    fn test_nesting_limit() {
        let arena = Bump::new();
        let limits = ParseLimits {
            max_depth: 10,
            ..ParseLimits::default()
        };

        let ok = format!("{}1{}", "(".repeat(8), ")".repeat(8));
        assert!(parse_with_limits(&arena, &ok, &limits).is_ok());

        let too_deep = format!("{}1{}", "(".repeat(11), ")".repeat(11));
        let err = parse_with_limits(&arena, &too_deep, &limits).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::TooComplex(ComplexityLimit::NestingDepth { max: 10 })
        );
        assert_eq!(
            err.message,
            "Expression is too complex (exceeds the maximum nesting depth of 10 levels)"
        );
    }

    #[test]
    fn test_node_limit() {
        let arena = Bump::new();
        let limits = ParseLimits {
            max_nodes: 10,
            ..ParseLimits::default()
        };
        let source = format!("[{}]", vec!["1"; 20].join(", "));
        let err = parse_with_limits(&arena, &source, &limits).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::TooComplex(ComplexityLimit::NodeCount { max: 10 })
        );
    }
}
