//! Complexity limits applied to user-supplied expression text.
//!
//! `pre_scan` runs before pest so that pathological nesting never reaches the
//! recursive parser; `check_tree` walks the finished AST without recursion.

use core::fmt;

use crate::parser::Expr;

/// Which complexity limit an expression exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityLimit {
    ExpressionLength { max: usize },
    NestingDepth { max: usize },
    NodeCount { max: usize },
    NumericDepth { max: usize },
}

impl fmt::Display for ComplexityLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityLimit::ExpressionLength { max } => {
                write!(f, "the maximum expression length of {} bytes", max)
            }
            ComplexityLimit::NestingDepth { max } => {
                write!(f, "the maximum nesting depth of {} levels", max)
            }
            ComplexityLimit::NodeCount { max } => {
                write!(f, "the maximum of {} syntax nodes", max)
            }
            ComplexityLimit::NumericDepth { max } => {
                write!(f, "the maximum numeric sub-expression depth of {} levels", max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_length: usize,
    pub max_depth: usize,
    pub max_nodes: usize,
}

pub const DEFAULT_MAX_EXPRESSION_LENGTH: usize = 10_000;
/// Sized so that input at the default limits parses and compiles on a 2 MiB
/// thread stack in unoptimized builds.
pub const DEFAULT_MAX_DEPTH: usize = 200;
pub const DEFAULT_MAX_NODES: usize = 5_000;

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_EXPRESSION_LENGTH,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

/// Conservative estimate of how deep the parser will recurse.
///
/// Counts bracket nesting, runs of prefix operators and right-associative
/// operators (`**`, ternary `if`), each of which adds a recursion level in
/// the Pratt parser.
pub fn pre_scan(source: &str, limits: &ParseLimits) -> Result<(), ComplexityLimit> {
    if source.len() > limits.max_length {
        return Err(ComplexityLimit::ExpressionLength {
            max: limits.max_length,
        });
    }

    let bytes = source.as_bytes();
    let mut i = 0;
    let mut depth = 0usize;
    let mut max_bracket_depth = 0usize;
    let mut unary_run = 0usize;
    let mut max_unary_run = 0usize;
    let mut right_assoc = 0usize;
    let mut after_operand = false;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                max_bracket_depth = max_bracket_depth.max(depth);
                unary_run = 0;
                after_operand = false;
            }
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                unary_run = 0;
                after_operand = true;
            }
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                right_assoc += 1;
                unary_run = 0;
                after_operand = false;
                i += 2;
                continue;
            }
            b'-' | b'+' | b'~' => {
                if after_operand {
                    unary_run = 0;
                } else {
                    unary_run += 1;
                    max_unary_run = max_unary_run.max(unary_run);
                }
                after_operand = false;
            }
            b if b.is_ascii_alphanumeric() || b == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                match &source[start..i] {
                    "not" => {
                        if !after_operand {
                            unary_run += 1;
                            max_unary_run = max_unary_run.max(unary_run);
                        }
                        after_operand = false;
                    }
                    "if" => {
                        right_assoc += 1;
                        unary_run = 0;
                        after_operand = false;
                    }
                    "and" | "or" | "in" | "is" | "else" | "for" => {
                        unary_run = 0;
                        after_operand = false;
                    }
                    _ => {
                        unary_run = 0;
                        after_operand = true;
                    }
                }
                continue;
            }
            _ => {
                unary_run = 0;
                after_operand = false;
            }
        }
        i += 1;
    }

    if max_bracket_depth + max_unary_run + right_assoc > limits.max_depth {
        return Err(ComplexityLimit::NestingDepth {
            max: limits.max_depth,
        });
    }
    Ok(())
}

/// Checks AST depth and node count. A lone literal has depth 1.
pub fn check_tree(expr: &Expr<'_>, limits: &ParseLimits) -> Result<(), ComplexityLimit> {
    let mut stack: Vec<(&Expr<'_>, usize)> = vec![(expr, 1)];
    let mut nodes = 0usize;
    while let Some((node, depth)) = stack.pop() {
        nodes += 1;
        if nodes > limits.max_nodes {
            return Err(ComplexityLimit::NodeCount {
                max: limits.max_nodes,
            });
        }
        if depth > limits.max_depth {
            return Err(ComplexityLimit::NestingDepth {
                max: limits.max_depth,
            });
        }
        node.for_each_child(|child| stack.push((child, depth + 1)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    fn limits(max_depth: usize, max_nodes: usize) -> ParseLimits {
        ParseLimits {
            max_length: 1_000,
            max_depth,
            max_nodes,
        }
    }

    #[test]
    fn pre_scan_counts_bracket_nesting() {
        let source = format!("{}1{}", "(".repeat(12), ")".repeat(12));
        assert_eq!(
            pre_scan(&source, &limits(10, 100)),
            Err(ComplexityLimit::NestingDepth { max: 10 })
        );
        let source = format!("{}1{}", "[".repeat(8), "]".repeat(8));
        assert_eq!(pre_scan(&source, &limits(10, 100)), Ok(()));
    }

    #[test]
    fn pre_scan_counts_prefix_runs_but_not_binary_operators() {
        assert!(pre_scan(&format!("{}1", "-".repeat(11)), &limits(10, 100)).is_err());
        assert!(pre_scan(&format!("{}1", "not ".repeat(11)), &limits(10, 100)).is_err());
        let flat = vec!["1"; 40].join(" - ");
        assert_eq!(pre_scan(&flat, &limits(10, 100)), Ok(()));
    }

    #[test]
    fn pre_scan_rejects_long_input() {
        let source = "1".repeat(1_001);
        assert_eq!(
            pre_scan(&source, &limits(10, 100)),
            Err(ComplexityLimit::ExpressionLength { max: 1_000 })
        );
    }

    #[test]
    fn pre_scan_ignores_comments() {
        let source = format!("1 # {}", "(".repeat(50));
        assert_eq!(pre_scan(&source, &limits(10, 100)), Ok(()));
    }

    #[test]
    fn check_tree_counts_nodes() {
        let arena = Bump::new();
        let parsed = parse(&arena, "[1, 2, 3, 4, 5]").unwrap();
        assert_eq!(check_tree(parsed.expr, &limits(10, 6)), Ok(()));
        assert_eq!(
            check_tree(parsed.expr, &limits(10, 5)),
            Err(ComplexityLimit::NodeCount { max: 5 })
        );
    }

    #[test]
    fn check_tree_measures_operator_chains() {
        let arena = Bump::new();
        let parsed = parse(&arena, "1 + 1 + 1 + 1").unwrap();
        // ((1 + 1) + 1) + 1 is four levels deep.
        assert_eq!(check_tree(parsed.expr, &limits(4, 100)), Ok(()));
        assert_eq!(
            check_tree(parsed.expr, &limits(3, 100)),
            Err(ComplexityLimit::NestingDepth { max: 3 })
        );
    }
}
